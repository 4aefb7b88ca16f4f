//! PostgreSQL implementation of OrganizationRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

use crate::domain::billing::{Organization, PlanTier, OWNER_ROLE};
use crate::domain::foundation::{DomainError, ErrorCode, OrganizationId, Timestamp, UserId};
use crate::ports::OrganizationRepository;

pub struct PostgresOrganizationRepository {
    pool: PgPool,
}

impl PostgresOrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an organization's billing view.
#[derive(Debug, sqlx::FromRow)]
struct OrganizationRow {
    id: String,
    name: String,
    slug: String,
    plan: String,
    billing_customer_id: Option<String>,
    external_subscription_id: Option<String>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrganizationRow> for Organization {
    type Error = DomainError;

    fn try_from(row: OrganizationRow) -> Result<Self, Self::Error> {
        let plan = PlanTier::parse(&row.plan).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid plan value: {}", row.plan),
            )
        })?;

        Ok(Organization {
            id: OrganizationId::new(row.id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid organization id: {}", e))
            })?,
            name: row.name,
            slug: row.slug,
            plan,
            billing_customer_id: row.billing_customer_id,
            external_subscription_id: row.external_subscription_id,
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Writes the billing columns of an organization through any executor.
///
/// Shared with the subscription repository so both rows can be written
/// inside one transaction.
pub(super) async fn write_organization_billing<'e, E>(
    executor: E,
    organization: &Organization,
) -> Result<(), DomainError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE organizations SET
            plan = $2,
            external_subscription_id = $3,
            updated_at = $4
        WHERE id = $1
        "#,
    )
    .bind(organization.id.as_str())
    .bind(organization.plan.as_str())
    .bind(&organization.external_subscription_id)
    .bind(organization.updated_at.as_datetime())
    .execute(executor)
    .await
    .map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Failed to update organization: {}", e))
    })?;

    if result.rows_affected() == 0 {
        return Err(DomainError::new(
            ErrorCode::OrganizationNotFound,
            "Organization not found",
        )
        .with_detail("organization_id", organization.id.as_str()));
    }

    Ok(())
}

#[async_trait]
impl OrganizationRepository for PostgresOrganizationRepository {
    async fn find_by_billing_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Organization>, DomainError> {
        let row: Option<OrganizationRow> = sqlx::query_as(
            r#"
            SELECT id, name, slug, plan, billing_customer_id, external_subscription_id, updated_at
            FROM organizations
            WHERE billing_customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find organization: {}", e))
        })?;

        row.map(Organization::try_from).transpose()
    }

    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>, DomainError> {
        let row: Option<OrganizationRow> = sqlx::query_as(
            r#"
            SELECT id, name, slug, plan, billing_customer_id, external_subscription_id, updated_at
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find organization: {}", e))
        })?;

        row.map(Organization::try_from).transpose()
    }

    async fn find_owner_user_id(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<UserId>, DomainError> {
        // Oldest owner wins if an organization somehow has several.
        let owner: Option<String> = sqlx::query_scalar(
            r#"
            SELECT user_id
            FROM organization_members
            WHERE organization_id = $1 AND role = $2
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(organization_id.as_str())
        .bind(OWNER_ROLE)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find organization owner: {}", e))
        })?;

        owner
            .map(|id| {
                UserId::new(id).map_err(|e| {
                    DomainError::new(ErrorCode::DatabaseError, format!("Invalid owner id: {}", e))
                })
            })
            .transpose()
    }

    async fn update_billing(&self, organization: &Organization) -> Result<(), DomainError> {
        write_organization_billing(&self.pool, organization).await
    }
}
