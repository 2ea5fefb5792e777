//! Agent display name (FIO) used for contract scoping.
//!
//! Contract queries are scoped to the requesting agent by matching surname
//! and given name against the `mop`/`rop`/`dd` columns case-insensitively.
//! The patronymic, if present, is ignored for matching.

use super::ValidationError;

/// Maximum length for agent names
const MAX_AGENT_NAME_LEN: usize = 128;

/// Validated agent display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentName(String);

impl AgentName {
    /// Create an agent name. Whitespace is collapsed; the name must contain
    /// at least a surname.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return Err(ValidationError::Empty { field: "agent name" });
        }
        if collapsed.len() > MAX_AGENT_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "agent name",
                max: MAX_AGENT_NAME_LEN,
            });
        }
        Ok(Self(collapsed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Surname (first word), lowercased for matching.
    pub fn surname_lower(&self) -> String {
        self.0
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }

    /// Given name (second word), lowercased. Empty when the roster carries
    /// only a surname - the resulting LIKE pattern then matches anything.
    pub fn given_name_lower(&self) -> String {
        self.0
            .split_whitespace()
            .nth(1)
            .unwrap_or_default()
            .to_lowercase()
    }

    /// `%surname%` / `%name%` LIKE patterns for FIO-scoped queries.
    pub fn like_patterns(&self) -> (String, String) {
        (
            format!("%{}%", self.surname_lower()),
            format!("%{}%", self.given_name_lower()),
        )
    }
}

impl std::fmt::Display for AgentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace() {
        let name = AgentName::new("  Иванов   Иван  ").unwrap();
        assert_eq!(name.as_str(), "Иванов Иван");
    }

    #[test]
    fn fio_split() {
        let name = AgentName::new("Иванов Иван Петрович").unwrap();
        assert_eq!(name.surname_lower(), "иванов");
        assert_eq!(name.given_name_lower(), "иван");
    }

    #[test]
    fn surname_only() {
        let name = AgentName::new("Иванов").unwrap();
        let (surname, given) = name.like_patterns();
        assert_eq!(surname, "%иванов%");
        // Degenerate pattern matches any non-null value
        assert_eq!(given, "%%");
    }

    #[test]
    fn rejects_empty() {
        let err = AgentName::new("   ").unwrap_err();
        assert!(matches!(err, ValidationError::Empty { .. }));
    }

    #[test]
    fn rejects_overlong() {
        let err = AgentName::new(&"а".repeat(200)).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { .. }));
    }
}
