//! Short opaque identifiers for alert rules
//!
//! A rule uid is the only handle notification routes and dashboards have on
//! an alert rule, so it has to survive as a URL path segment and as a label
//! value. Generated ids are 9 lowercase hex characters. They are not
//! guaranteed unique; a duplicate is rejected by the remote and the caller
//! registers again with a fresh rule.

use std::sync::OnceLock;

use rand::Rng;

use crate::error::ValidationError;

/// Length of every generated identifier
pub const UID_LENGTH: usize = 9;

/// Longest identifier the remote accepts
pub const MAX_UID_LENGTH: usize = 40;

/// Characters generated identifiers are drawn from
pub const UID_ALPHABET: &[u8] = b"0123456789abcdef";

/// Generate a fresh random identifier
pub fn generate_uid() -> String {
    let mut rng = rand::thread_rng();
    (0..UID_LENGTH)
        .map(|_| UID_ALPHABET[rng.gen_range(0..UID_ALPHABET.len())] as char)
        .collect()
}

/// Check that an explicitly supplied identifier is usable in paths and labels
pub fn validate_uid(uid: &str) -> Result<(), ValidationError> {
    let unsafe_char = |c: char| c == '/' || c == '"' || c == '?' || c == '#' || c.is_whitespace();
    if uid.is_empty() || uid.chars().count() > MAX_UID_LENGTH || uid.chars().any(unsafe_char) {
        return Err(ValidationError::InvalidUid(uid.to_string()));
    }
    Ok(())
}

/// Lazily assigned, memoized identifier
///
/// Once a value is stored it never changes for the lifetime of the owner.
/// Cloning assigns the identifier first, so the clone carries the same value.
#[derive(Debug, Default)]
pub struct RuleUid(OnceLock<String>);

impl Clone for RuleUid {
    fn clone(&self) -> Self {
        Self(OnceLock::from(self.get_or_assign().to_string()))
    }
}

impl RuleUid {
    /// An identifier that will be generated on first access
    pub fn unassigned() -> Self {
        Self(OnceLock::new())
    }

    /// An identifier fixed up front
    pub fn explicit(uid: impl Into<String>) -> Result<Self, ValidationError> {
        let uid = uid.into();
        validate_uid(&uid)?;
        Ok(Self(OnceLock::from(uid)))
    }

    /// The stored identifier, without assigning one
    pub fn get(&self) -> Option<&str> {
        self.0.get().map(String::as_str)
    }

    /// Return the stored identifier, generating and storing one if absent
    pub fn get_or_assign(&self) -> &str {
        self.0.get_or_init(generate_uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_uid_shape() {
        let uid = generate_uid();
        assert_eq!(uid.len(), UID_LENGTH);
        assert!(uid.bytes().all(|b| UID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_get_or_assign_is_memoized() {
        let uid = RuleUid::unassigned();
        assert_eq!(uid.get(), None);

        let first = uid.get_or_assign().to_string();
        let second = uid.get_or_assign().to_string();

        assert_eq!(first, second);
        assert_eq!(uid.get(), Some(first.as_str()));
    }

    #[test]
    fn test_explicit_uid_is_kept() {
        let uid = RuleUid::explicit("cpu-high").unwrap();
        assert_eq!(uid.get_or_assign(), "cpu-high");
    }

    #[test]
    fn test_explicit_uid_rejects_separators() {
        assert!(RuleUid::explicit("").is_err());
        assert!(RuleUid::explicit("a/b").is_err());
        assert!(RuleUid::explicit("a b").is_err());
    }

    #[test]
    fn test_explicit_uid_length_is_capped() {
        assert!(RuleUid::explicit("a".repeat(MAX_UID_LENGTH)).is_ok());
        assert_eq!(
            RuleUid::explicit("a".repeat(MAX_UID_LENGTH + 1)).unwrap_err(),
            ValidationError::InvalidUid("a".repeat(MAX_UID_LENGTH + 1))
        );
    }

    #[test]
    fn test_clone_keeps_assigned_value() {
        let uid = RuleUid::unassigned();
        let assigned = uid.get_or_assign().to_string();
        let cloned = uid.clone();
        assert_eq!(cloned.get(), Some(assigned.as_str()));
    }

    #[test]
    fn test_clone_before_assignment_shares_value() {
        let uid = RuleUid::unassigned();
        let cloned = uid.clone();

        assert!(uid.get().is_some());
        assert_eq!(cloned.get(), uid.get());
        assert_eq!(cloned.get_or_assign(), uid.get_or_assign());
    }
}
