//! Write-provenance marker for `properties` rows.
//!
//! Every row records which side touched it last: the bot (progress-field
//! edits from chat) or the sheet reconciler (deal-field refreshes). Conflict
//! attribution, not access control - both sides may write.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Last writer of a `properties` row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Source {
    Bot,
    Sheet,
}

impl Source {
    /// Database/text representation (`BOT` / `SHEET`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bot => "BOT",
            Self::Sheet => "SHEET",
        }
    }
}

impl FromStr for Source {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOT" => Ok(Self::Bot),
            "SHEET" => Ok(Self::Sheet),
            other => Err(ValidationError::InvalidVariant {
                field: "source",
                value: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        assert_eq!("BOT".parse::<Source>().unwrap(), Source::Bot);
        assert_eq!("SHEET".parse::<Source>().unwrap(), Source::Sheet);
        assert_eq!(Source::Bot.as_str(), "BOT");
    }

    #[test]
    fn rejects_unknown() {
        let err = "API".parse::<Source>().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidVariant { .. }));
    }

    #[test]
    fn serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Source::Sheet).unwrap(), "\"SHEET\"");
    }
}
