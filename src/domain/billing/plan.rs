//! Plan tier definitions and price-id mapping.

use serde::{Deserialize, Serialize};

/// Internal plan tier used to gate organization features and usage quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
    Enterprise,
}

impl PlanTier {
    /// Returns the stored string form of this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
            PlanTier::Enterprise => "enterprise",
        }
    }

    /// Parses the stored string form. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "free" => Some(PlanTier::Free),
            "pro" => Some(PlanTier::Pro),
            "enterprise" => Some(PlanTier::Enterprise),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Translates provider price identifiers into plan tiers.
///
/// Rules, in order:
/// 1. empty price id -> `Free`
/// 2. configured enterprise price id -> `Enterprise`
/// 3. configured pro price id -> `Pro`
/// 4. any other price id -> `Pro`
///
/// Unrecognized paid prices fall back to `Pro` so a catalog change never
/// silently grants free access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanMapper {
    pro_price_id: String,
    enterprise_price_id: String,
}

impl PlanMapper {
    pub fn new(pro_price_id: impl Into<String>, enterprise_price_id: impl Into<String>) -> Self {
        Self {
            pro_price_id: pro_price_id.into(),
            enterprise_price_id: enterprise_price_id.into(),
        }
    }

    pub fn map_plan(&self, price_id: &str) -> PlanTier {
        if price_id.is_empty() {
            return PlanTier::Free;
        }
        if !self.enterprise_price_id.is_empty() && price_id == self.enterprise_price_id {
            return PlanTier::Enterprise;
        }
        if !self.pro_price_id.is_empty() && price_id == self.pro_price_id {
            return PlanTier::Pro;
        }
        PlanTier::Pro
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mapper() -> PlanMapper {
        PlanMapper::new("price_pro", "price_enterprise")
    }

    #[test]
    fn empty_price_maps_to_free() {
        assert_eq!(mapper().map_plan(""), PlanTier::Free);
    }

    #[test]
    fn enterprise_price_maps_to_enterprise() {
        assert_eq!(mapper().map_plan("price_enterprise"), PlanTier::Enterprise);
    }

    #[test]
    fn pro_price_maps_to_pro() {
        assert_eq!(mapper().map_plan("price_pro"), PlanTier::Pro);
    }

    #[test]
    fn unknown_price_falls_back_to_pro() {
        assert_eq!(mapper().map_plan("price_legacy_2019"), PlanTier::Pro);
    }

    #[test]
    fn unset_enterprise_id_never_matches_empty_string() {
        let mapper = PlanMapper::new("price_pro", "");
        assert_eq!(mapper.map_plan(""), PlanTier::Free);
        assert_eq!(mapper.map_plan("price_anything"), PlanTier::Pro);
    }

    #[test]
    fn tier_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PlanTier::Enterprise).unwrap(), "\"enterprise\"");
    }

    #[test]
    fn parse_accepts_stored_values() {
        for tier in [PlanTier::Free, PlanTier::Pro, PlanTier::Enterprise] {
            assert_eq!(PlanTier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(PlanTier::parse("platinum"), None);
    }

    proptest! {
        #[test]
        fn any_unmapped_non_empty_price_is_pro(price in "[a-z_0-9]{1,32}") {
            prop_assume!(price != "price_enterprise");
            prop_assert_eq!(mapper().map_plan(&price), PlanTier::Pro);
        }
    }
}
