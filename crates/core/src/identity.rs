use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator used by the canonical string form of an [`Identity`].
pub const KEY_SEPARATOR: char = '_';

/// A person, keyed by (name, id). Equality, hashing and ordering use both fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub id: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self { name: name.into(), id: id.into() }
    }

    /// `name_id`, the form shown in reports and logs.
    pub fn canonical_key(&self) -> String {
        self.to_string()
    }

    /// Parse a canonical key back into its parts.
    ///
    /// Returns `None` unless the key contains exactly one separator: a name or id that
    /// itself contains `_` cannot be split unambiguously.
    pub fn parse_key(key: &str) -> Option<Self> {
        let mut parts = key.split(KEY_SEPARATOR);
        let name = parts.next()?;
        let id = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(name, id))
    }

    /// True when the canonical key would not parse back to this identity.
    pub fn is_key_ambiguous(&self) -> bool {
        self.name.contains(KEY_SEPARATOR) || self.id.contains(KEY_SEPARATOR)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, KEY_SEPARATOR, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_round_trip() {
        let p = Identity::new("张三", "110101");
        assert_eq!(p.canonical_key(), "张三_110101");
        assert_eq!(Identity::parse_key(&p.canonical_key()), Some(p));
    }

    #[test]
    fn key_with_separator_in_name_is_rejected() {
        let p = Identity::new("A_B", "1");
        assert!(p.is_key_ambiguous());
        assert_eq!(Identity::parse_key(&p.canonical_key()), None);
    }

    #[test]
    fn key_without_separator_is_rejected() {
        assert_eq!(Identity::parse_key("张三110101"), None);
    }

    #[test]
    fn structured_key_keeps_separator_collisions_apart() {
        // Both render as "A_B_C", but remain distinct identities.
        let a = Identity::new("A_B", "C");
        let b = Identity::new("A", "B_C");
        assert_eq!(a.canonical_key(), b.canonical_key());
        assert_ne!(a, b);
    }

    #[test]
    fn empty_parts_round_trip() {
        assert_eq!(Identity::parse_key("_110101"), Some(Identity::new("", "110101")));
    }
}
