//! Strongly-typed identifiers for domain entities
//!
//! Newtype wrappers around UUIDs keep an estimate id from being passed where
//! a zone or line item id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Time-ordered identifier for records created by the application
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Name-based identifier: the same namespace and name always
            /// produce the same id
            pub fn derived(namespace: &Uuid, name: &str) -> Self {
                Self(Uuid::new_v5(namespace, name.as_bytes()))
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bare = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Uuid::parse_str(bare).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Estimate identifiers
define_id!(EstimateId, "EST");
define_id!(ZoneId, "ZONE");
define_id!(LineItemId, "LI");

// Carrier and jurisdiction identifiers
define_id!(CarrierId, "CAR");
define_id!(JurisdictionId, "JUR");
define_id!(RuleId, "RULE");

// Compliance trail
define_id!(AuditEntryId, "AUD");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_id_display() {
        let id = EstimateId::new();
        assert!(id.to_string().starts_with("EST-"));
    }

    #[test]
    fn test_id_parsing_with_and_without_prefix() {
        let original = ZoneId::new();
        let parsed: ZoneId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);

        let bare: ZoneId = original.as_uuid().to_string().parse().unwrap();
        assert_eq!(original, bare);
    }

    #[test]
    fn test_derived_ids_are_stable() {
        let estimate = EstimateId::new();
        let first = AuditEntryId::derived(estimate.as_uuid(), "0:line:rule");
        let again = AuditEntryId::derived(estimate.as_uuid(), "0:line:rule");
        let other = AuditEntryId::derived(estimate.as_uuid(), "1:line:rule");

        assert_eq!(first, again);
        assert_ne!(first, other);
    }

    #[test]
    fn test_v7_ids_are_ordered() {
        let first = AuditEntryId::new_v7();
        let second = AuditEntryId::new_v7();
        assert!(first <= second);
    }
}
