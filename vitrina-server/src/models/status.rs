//! Listing workflow status labels.
//!
//! `stats_object_status` is deliberately free text - agents type the label
//! they work with - but two labels carry schema-level meaning: the recall
//! index predicate keys on `Перезвонить` and the archival sweep keys on
//! `Архив`.

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// "call back" - the one status eligible for recall notifications
pub const STATUS_RECALL: &str = "Перезвонить";

/// "archived" - terminal soft-state, excluded from the archival sweep
pub const STATUS_ARCHIVED: &str = "Архив";

/// Maximum length for status labels
const MAX_STATUS_LEN: usize = 128;

/// Validated free-text status label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectStatus(String);

impl ObjectStatus {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Empty {
                field: "object status",
            });
        }
        if s.len() > MAX_STATUS_LEN {
            return Err(ValidationError::TooLong {
                field: "object status",
                max: MAX_STATUS_LEN,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// The "call back" label
    pub fn recall() -> Self {
        Self(STATUS_RECALL.to_owned())
    }

    /// The "archived" label
    pub fn archived() -> Self {
        Self(STATUS_ARCHIVED.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_recall(&self) -> bool {
        self.0 == STATUS_RECALL
    }

    pub fn is_archived(&self) -> bool {
        self.0 == STATUS_ARCHIVED
    }
}

impl std::fmt::Display for ObjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_labels() {
        assert!(ObjectStatus::recall().is_recall());
        assert!(ObjectStatus::archived().is_archived());
        assert_eq!(ObjectStatus::recall().as_str(), "Перезвонить");
    }

    #[test]
    fn free_text_allowed() {
        let status = ObjectStatus::new("Думает до пятницы").unwrap();
        assert!(!status.is_recall());
        assert!(!status.is_archived());
    }

    #[test]
    fn rejects_empty_and_overlong() {
        assert!(matches!(
            ObjectStatus::new("  ").unwrap_err(),
            ValidationError::Empty { .. }
        ));
        assert!(matches!(
            ObjectStatus::new(&"с".repeat(200)).unwrap_err(),
            ValidationError::TooLong { .. }
        ));
    }
}
