//! PostgreSQL implementation of SubscriptionRepository.
//!
//! The unique constraint on `external_subscription_id` is what serializes
//! concurrent deliveries of the same creation event: the loser gets
//! `DuplicateSubscription` and no second row exists.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::domain::billing::{Organization, Subscription, SubscriptionStatus};
use crate::domain::foundation::{
    DomainError, ErrorCode, OrganizationId, SubscriptionId, Timestamp, UserId,
};
use crate::ports::SubscriptionRepository;

use super::organization_repository::write_organization_billing;

const EXTERNAL_ID_CONSTRAINT: &str = "subscriptions_external_subscription_id_key";

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    organization_id: Option<String>,
    external_subscription_id: String,
    price_id: String,
    status: String,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
    canceled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let organization_id = row
            .organization_id
            .map(|id| {
                OrganizationId::new(id).map_err(|e| {
                    DomainError::new(ErrorCode::DatabaseError, format!("Invalid organization_id: {}", e))
                })
            })
            .transpose()?;

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            organization_id,
            external_subscription_id: row.external_subscription_id,
            price_id: row.price_id,
            status: SubscriptionStatus::parse(&row.status),
            current_period_start: row.current_period_start.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            cancel_at_period_end: row.cancel_at_period_end,
            canceled_at: row.canceled_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn to_datetime(ts: &Option<Timestamp>) -> Option<DateTime<Utc>> {
    ts.as_ref().map(|t| *t.as_datetime())
}

fn map_insert_error(e: sqlx::Error, subscription: &Subscription) -> DomainError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.constraint() == Some(EXTERNAL_ID_CONSTRAINT) {
            return DomainError::new(
                ErrorCode::DuplicateSubscription,
                "Subscription already exists",
            )
            .with_detail(
                "external_subscription_id",
                subscription.external_subscription_id.as_str(),
            );
        }
    }
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to save subscription: {}", e))
}

async fn insert_subscription<'e, E>(executor: E, subscription: &Subscription) -> Result<(), DomainError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO subscriptions (
            id, user_id, organization_id, external_subscription_id, price_id, status,
            current_period_start, current_period_end, cancel_at_period_end, canceled_at,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(subscription.id.as_uuid())
    .bind(subscription.user_id.as_str())
    .bind(subscription.organization_id.as_ref().map(|id| id.as_str()))
    .bind(&subscription.external_subscription_id)
    .bind(&subscription.price_id)
    .bind(subscription.status.as_str())
    .bind(to_datetime(&subscription.current_period_start))
    .bind(to_datetime(&subscription.current_period_end))
    .bind(subscription.cancel_at_period_end)
    .bind(to_datetime(&subscription.canceled_at))
    .bind(subscription.created_at.as_datetime())
    .bind(subscription.updated_at.as_datetime())
    .execute(executor)
    .await
    .map_err(|e| map_insert_error(e, subscription))?;

    Ok(())
}

async fn update_subscription<'e, E>(executor: E, subscription: &Subscription) -> Result<(), DomainError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE subscriptions SET
            price_id = $2,
            status = $3,
            current_period_start = $4,
            current_period_end = $5,
            cancel_at_period_end = $6,
            canceled_at = $7,
            updated_at = $8
        WHERE external_subscription_id = $1
        "#,
    )
    .bind(&subscription.external_subscription_id)
    .bind(&subscription.price_id)
    .bind(subscription.status.as_str())
    .bind(to_datetime(&subscription.current_period_start))
    .bind(to_datetime(&subscription.current_period_end))
    .bind(subscription.cancel_at_period_end)
    .bind(to_datetime(&subscription.canceled_at))
    .bind(subscription.updated_at.as_datetime())
    .execute(executor)
    .await
    .map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Failed to update subscription: {}", e))
    })?;

    if result.rows_affected() == 0 {
        return Err(DomainError::new(
            ErrorCode::SubscriptionNotFound,
            "Subscription not found",
        )
        .with_detail(
            "external_subscription_id",
            subscription.external_subscription_id.as_str(),
        ));
    }

    Ok(())
}

impl PostgresSubscriptionRepository {
    async fn begin(&self) -> Result<sqlx::Transaction<'_, sqlx::Postgres>, DomainError> {
        self.pool.begin().await.map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to begin transaction: {}", e))
        })
    }
}

async fn commit(tx: sqlx::Transaction<'_, sqlx::Postgres>) -> Result<(), DomainError> {
    tx.commit().await.map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Failed to commit transaction: {}", e))
    })
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, organization_id, external_subscription_id, price_id, status,
                   current_period_start, current_period_end, cancel_at_period_end, canceled_at,
                   created_at, updated_at
            FROM subscriptions
            WHERE external_subscription_id = $1
            "#,
        )
        .bind(external_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find subscription: {}", e))
        })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn create(&self, subscription: &Subscription) -> Result<(), DomainError> {
        insert_subscription(&self.pool, subscription).await
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        update_subscription(&self.pool, subscription).await
    }

    async fn create_with_organization(
        &self,
        subscription: &Subscription,
        organization: &Organization,
    ) -> Result<(), DomainError> {
        let mut tx = self.begin().await?;

        // Dropping the transaction on error rolls both writes back.
        insert_subscription(&mut *tx, subscription).await?;
        write_organization_billing(&mut *tx, organization).await?;

        commit(tx).await
    }

    async fn update_with_organization(
        &self,
        subscription: &Subscription,
        organization: &Organization,
    ) -> Result<(), DomainError> {
        let mut tx = self.begin().await?;

        update_subscription(&mut *tx, subscription).await?;
        write_organization_billing(&mut *tx, organization).await?;

        commit(tx).await
    }
}
