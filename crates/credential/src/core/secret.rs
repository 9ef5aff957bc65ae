//! In-memory secret value
//!
//! The cleartext lives in a zeroize-on-drop buffer and never appears in
//! `Debug` or `Display` output.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// A secret string (service account password)
#[derive(Clone)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    /// Wrap a cleartext value
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Borrow the cleartext
    ///
    /// Only adapters that hand the value to a platform call should need this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    /// Whether the secret is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Masked rendering for operator output: first character, then `*`
    pub fn masked(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => std::iter::once(first)
                .chain(chars.map(|_| '*'))
                .collect(),
            None => String::new(),
        }
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl Eq for Secret {}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

// Inventories persist the platform's own view of stored secrets, so the
// serialized form is the cleartext.
impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_are_redacted() {
        let secret = Secret::new("hunter2-Very-Secret");
        assert_eq!(format!("{secret:?}"), "Secret(***)");
        assert_eq!(format!("{secret}"), "***");
    }

    #[test]
    fn test_equality() {
        assert_eq!(Secret::new("abc"), Secret::new("abc"));
        assert_ne!(Secret::new("abc"), Secret::new("abd"));
        assert_ne!(Secret::new("abc"), Secret::new("abcd"));
    }

    #[test]
    fn test_masked() {
        assert_eq!(Secret::new("Pa55").masked(), "P***");
        assert_eq!(Secret::new("").masked(), "");
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&Secret::new("x1")).unwrap();
        assert_eq!(json, "\"x1\"");
        let back: Secret = serde_json::from_str(&json).unwrap();
        assert_eq!(back.expose(), "x1");
    }
}
