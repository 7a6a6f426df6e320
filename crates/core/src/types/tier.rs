//! Package tiers and lesson package requirements.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Errors for tier parsing and requirement sets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TierError {
    /// The identifier is not a known package tier.
    #[error("unknown package tier: {0}")]
    Unknown(String),
    /// A lesson must require at least one tier.
    #[error("required packages cannot be empty")]
    EmptyRequirement,
}

/// Purchased package tier of an account.
///
/// `None` is the tier of an account that has not bought anything; the other
/// variants are the packages offered at checkout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "package_tier", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum PackageTier {
    #[default]
    None,
    Small,
    Medium,
    Large,
    Enterprise,
}

impl PackageTier {
    /// Tiers that can be selected at checkout.
    pub const PURCHASABLE: [Self; 4] = [Self::Small, Self::Medium, Self::Large, Self::Enterprise];

    /// Whether this tier can be bought.
    #[must_use]
    pub const fn is_purchasable(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Wire identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Enterprise => "enterprise",
        }
    }
}

impl std::fmt::Display for PackageTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PackageTier {
    type Err = TierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(TierError::Unknown(s.to_owned())),
        }
    }
}

/// Non-empty set of tiers allowed to open a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PackageTier>", into = "Vec<PackageTier>")]
pub struct RequiredPackages(BTreeSet<PackageTier>);

impl RequiredPackages {
    /// Build a requirement set.
    ///
    /// # Errors
    ///
    /// Returns `TierError::EmptyRequirement` if `tiers` yields nothing.
    pub fn new(tiers: impl IntoIterator<Item = PackageTier>) -> Result<Self, TierError> {
        let set: BTreeSet<_> = tiers.into_iter().collect();
        if set.is_empty() {
            return Err(TierError::EmptyRequirement);
        }
        Ok(Self(set))
    }

    /// Whether `tier` is in the set.
    #[must_use]
    pub fn contains(&self, tier: PackageTier) -> bool {
        self.0.contains(&tier)
    }

    /// Iterate the tiers in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = PackageTier> + '_ {
        self.0.iter().copied()
    }

    /// Copy the tiers into a vector (ascending order).
    #[must_use]
    pub fn to_vec(&self) -> Vec<PackageTier> {
        self.iter().collect()
    }
}

impl TryFrom<Vec<PackageTier>> for RequiredPackages {
    type Error = TierError;

    fn try_from(value: Vec<PackageTier>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RequiredPackages> for Vec<PackageTier> {
    fn from(value: RequiredPackages) -> Self {
        value.0.into_iter().collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parse_and_display() {
        for tier in PackageTier::PURCHASABLE {
            assert_eq!(tier.to_string().parse::<PackageTier>().unwrap(), tier);
        }
        assert_eq!("none".parse::<PackageTier>().unwrap(), PackageTier::None);
        assert_eq!(
            "admin".parse::<PackageTier>(),
            Err(TierError::Unknown("admin".to_owned()))
        );
    }

    #[test]
    fn test_none_is_not_purchasable() {
        assert!(!PackageTier::None.is_purchasable());
        assert!(PackageTier::PURCHASABLE.iter().all(|t| t.is_purchasable()));
    }

    #[test]
    fn test_required_packages_rejects_empty() {
        assert_eq!(
            RequiredPackages::new([]),
            Err(TierError::EmptyRequirement)
        );
        let parsed: Result<RequiredPackages, _> = serde_json::from_str("[]");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_required_packages_dedups_and_orders() {
        let set: RequiredPackages = serde_json::from_str(r#"["large","small","large"]"#).unwrap();
        assert_eq!(set.to_vec(), vec![PackageTier::Small, PackageTier::Large]);
        assert!(set.contains(PackageTier::Large));
        assert!(!set.contains(PackageTier::Medium));
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["small","large"]"#);
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn test_tier_binds_as_postgres_array() {
        fn binds_as_array<T: sqlx::postgres::PgHasArrayType>() {}
        binds_as_array::<PackageTier>();
    }
}
