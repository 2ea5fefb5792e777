//! Agent directory entries (`vitrina_agents`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ValidationError;

/// Agent role codes used as CRM assignment fields:
/// sales manager / sales lead / developer-relations contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentRole {
    Mop,
    Rop,
    Dd,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mop => "MOP",
            Self::Rop => "ROP",
            Self::Dd => "DD",
        }
    }
}

impl FromStr for AgentRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MOP" => Ok(Self::Mop),
            "ROP" => Ok(Self::Rop),
            "DD" => Ok(Self::Dd),
            other => Err(ValidationError::InvalidVariant {
                field: "agent role",
                value: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent directory row.
///
/// `chat_ids` and `property_classes` are unordered string sets; the
/// repository queries them with array containment and appends with set
/// semantics, so duplicates never enter.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Agent {
    /// Normalized phone, primary key
    pub agent_phone: String,
    pub display_name: String,
    /// Chat identifiers for notification delivery
    pub chat_ids: Vec<String>,
    pub role: String,
    /// Listing classes this agent is scoped to
    pub property_classes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    pub fn role(&self) -> Result<AgentRole, ValidationError> {
        self.role.parse()
    }

    pub fn has_chat(&self, chat_id: &str) -> bool {
        self.chat_ids.iter().any(|c| c == chat_id)
    }

    pub fn covers_class(&self, property_class: &str) -> bool {
        self.property_classes.iter().any(|c| c == property_class)
    }
}

/// New or updated directory entry for upsert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAgent {
    pub agent_phone: String,
    pub display_name: String,
    #[serde(default)]
    pub chat_ids: Vec<String>,
    pub role: AgentRole,
    #[serde(default)]
    pub property_classes: Vec<String>,
}
