//! CRM deal identifier validation
//!
//! `crm_id` is the primary key of `properties` and arrives from chat input,
//! so it is validated before it ever reaches a query.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationError;

/// Maximum length for CRM ids
const MAX_CRM_ID_LEN: usize = 64;

/// CRM ids as the upstream issues them: digits, latin letters, hyphens.
static CRM_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]*$").expect("invalid crm id regex"));

/// Validated CRM deal identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrmId(String);

impl CrmId {
    /// Create a CRM id, validating format.
    ///
    /// # Rules
    /// - Max 64 characters
    /// - Digits, latin letters, hyphens
    /// - Must start with an alphanumeric
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "crm id" });
        }

        if s.len() > MAX_CRM_ID_LEN {
            return Err(ValidationError::TooLong {
                field: "crm id",
                max: MAX_CRM_ID_LEN,
            });
        }

        if !CRM_ID_RE.is_match(s) {
            return Err(ValidationError::InvalidFormat {
                field: "crm id",
                reason: "must be digits, latin letters or hyphens, starting with an alphanumeric",
            });
        }

        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for CrmId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CrmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_ids() {
        assert!(CrmId::new("12345").is_ok());
        assert!(CrmId::new("DEAL-2024-001").is_ok());
        assert!(CrmId::new("  12345  ").is_ok()); // trimmed
    }

    #[test]
    fn rejects_empty() {
        let err = CrmId::new("   ").unwrap_err();
        assert!(matches!(err, ValidationError::Empty { .. }));
    }

    #[test]
    fn rejects_injection_shapes() {
        assert!(CrmId::new("1; DROP TABLE properties").is_err());
        assert!(CrmId::new("-leading-dash").is_err());
        assert!(CrmId::new("id with spaces").is_err());
    }

    #[test]
    fn max_length() {
        let id_64 = "a".repeat(64);
        assert!(CrmId::new(&id_64).is_ok());

        let id_65 = "a".repeat(65);
        let err = CrmId::new(&id_65).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 64, .. }));
    }
}
