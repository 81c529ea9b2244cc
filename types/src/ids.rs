//! Numeric record identifiers.
//!
//! Every persisted record is keyed by a `u64` allocated from a single
//! store-wide counter. Each record family gets its own newtype so a
//! membership id can never be passed where a group id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }

            /// Big-endian encoding, used for ordered storage keys.
            pub fn to_be_bytes(self) -> [u8; 8] {
                self.0.to_be_bytes()
            }

            pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
                Self(u64::from_be_bytes(bytes))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $prefix, self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s.strip_prefix(concat!($prefix, "#")).unwrap_or(s);
                digits.parse().map(Self)
            }
        }
    };
}

record_id!(
    /// Identifies a registered user.
    UserId,
    "user"
);
record_id!(
    /// Identifies a group (including clusters and schools).
    GroupId,
    "group"
);
record_id!(
    /// Identifies one (user, group) membership row.
    MembershipId,
    "membership"
);
record_id!(InvitationId, "invitation");
record_id!(AcknowledgmentId, "ack");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_family_prefix() {
        assert_eq!(GroupId::new(7).to_string(), "group#7");
        assert_eq!(MembershipId::new(12).to_string(), "membership#12");
    }

    #[test]
    fn parses_with_or_without_prefix() {
        assert_eq!("group#7".parse::<GroupId>().unwrap(), GroupId::new(7));
        assert_eq!("42".parse::<UserId>().unwrap(), UserId::new(42));
        assert!("user#x".parse::<UserId>().is_err());
    }

    #[test]
    fn big_endian_keys_sort_numerically() {
        let a = GroupId::new(2).to_be_bytes();
        let b = GroupId::new(256).to_be_bytes();
        assert!(a < b);
        assert_eq!(GroupId::from_be_bytes(b), GroupId::new(256));
    }

    #[test]
    fn serializes_as_bare_integer() {
        let json = serde_json::to_string(&UserId::new(5)).unwrap();
        assert_eq!(json, "5");
    }
}
