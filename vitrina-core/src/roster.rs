//! Agent roster file (`data/agents.csv`).
//!
//! Two headerless columns: display name, phone. The file is mounted
//! read-only into the container and is the source the `vitrina_agents`
//! table is imported from.

use std::path::Path;

use crate::error::{Result, VitrinaError};
use crate::phone::{is_valid_phone, normalize_phone, phones_match};

/// One roster row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub name: String,
    /// Phone as written in the file
    pub phone_raw: String,
    /// Canonical `7XXXXXXXXXX` form
    pub phone: String,
}

/// In-memory agent roster
#[derive(Debug, Clone, Default)]
pub struct AgentRoster {
    entries: Vec<RosterEntry>,
}

impl AgentRoster {
    /// Load the roster from a headerless `name,phone` CSV file.
    ///
    /// Rows with an empty name or a phone that normalizes to nothing are
    /// skipped with a warning rather than failing the whole load: the file
    /// is hand-edited.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VitrinaError::path_not_found(path));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| VitrinaError::csv(path, e))?;

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| VitrinaError::csv(path, e))?;
            let name = record.get(0).unwrap_or("").trim().to_string();
            let phone_raw = record.get(1).unwrap_or("").trim().to_string();
            let phone = normalize_phone(&phone_raw);

            // Validate the normalized form: short-form numbers are fine,
            // garbage is not
            if name.is_empty() || !is_valid_phone(&phone) {
                tracing::warn!(row = ?record, "skipping malformed roster row");
                continue;
            }

            entries.push(RosterEntry {
                name,
                phone_raw,
                phone,
            });
        }

        tracing::info!(count = entries.len(), path = %path.display(), "agent roster loaded");
        Ok(Self { entries })
    }

    /// Find an agent by phone: exact normalized match first, then the
    /// last-10-digit suffix fallback.
    pub fn find_by_phone(&self, phone: &str) -> Option<&RosterEntry> {
        let normalized = normalize_phone(phone);
        if normalized.is_empty() {
            return None;
        }

        self.entries
            .iter()
            .find(|e| e.phone == normalized)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|e| phones_match(&e.phone, &normalized))
            })
    }

    /// Reverse lookup: display name (exact, trimmed) to phone.
    pub fn phone_by_name(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.phone.as_str())
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
