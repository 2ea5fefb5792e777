//! CRM deal row and its two write surfaces.
//!
//! A `properties` row merges two field classes with different owners:
//! deal fields arrive from the upstream sheet/CRM and are read-only for the
//! bot; progress fields are edited from chat and are never touched by the
//! reconciler. `PropertyPatch` can only express the latter, so a bot write
//! cannot clobber deal data by construction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full CRM deal record from the database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Property {
    pub crm_id: String,

    // Deal fields (SHEET-owned)
    pub date_signed: Option<NaiveDate>,
    pub contract_number: Option<String>,
    pub mop: Option<String>,
    pub rop: Option<String>,
    pub dd: Option<String>,
    pub client_name: Option<String>,
    pub address: Option<String>,
    pub complex: Option<String>,
    pub contract_price: Option<f64>,
    pub expires: Option<NaiveDate>,

    // Progress fields (BOT-owned)
    pub category: Option<String>,
    pub collage: bool,
    pub prof_collage: bool,
    pub krisha: Option<String>,
    pub instagram: Option<String>,
    pub tiktok: Option<String>,
    pub mailing: Option<String>,
    pub stream: Option<String>,
    pub shows: i32,
    pub analytics: bool,
    pub price_update: Option<String>,
    pub provide_analytics: bool,
    pub push_for_price: bool,
    pub status: String,

    // Provenance
    pub last_modified_by: String,
    pub last_modified_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Deal fields as delivered by the upstream source of truth.
///
/// The reconciler writes exactly these columns; everything else on an
/// existing row is left alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealRecord {
    pub crm_id: String,
    pub date_signed: Option<NaiveDate>,
    pub contract_number: Option<String>,
    pub mop: Option<String>,
    pub rop: Option<String>,
    pub dd: Option<String>,
    pub client_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub complex: Option<String>,
    #[serde(default)]
    pub contract_price: Option<f64>,
    #[serde(default)]
    pub expires: Option<NaiveDate>,
}

/// Contract lifetime when the snapshot doesn't carry an expiry.
const DEFAULT_CONTRACT_DAYS: i64 = 90;

impl DealRecord {
    /// Fill a missing `expires` from the signing date.
    pub fn with_default_expiry(mut self) -> Self {
        if self.expires.is_none() {
            self.expires = self
                .date_signed
                .map(|d| d + chrono::Duration::days(DEFAULT_CONTRACT_DAYS));
        }
        self
    }
}

/// Bot-side update to a deal's progress fields.
///
/// `None` means "leave unchanged". The patch deliberately has no way to
/// express deal fields or provenance columns.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyPatch {
    pub category: Option<String>,
    pub collage: Option<bool>,
    pub prof_collage: Option<bool>,
    pub krisha: Option<String>,
    pub instagram: Option<String>,
    pub tiktok: Option<String>,
    pub mailing: Option<String>,
    pub stream: Option<String>,
    pub shows: Option<i32>,
    pub analytics: Option<bool>,
    pub price_update: Option<String>,
    pub provide_analytics: Option<bool>,
    pub push_for_price: Option<bool>,
    pub status: Option<String>,
}

/// A single bind value for dynamic SET building
#[derive(Debug, Clone)]
pub enum PatchValue {
    Text(String),
    Bool(bool),
    Int(i32),
}

impl PropertyPatch {
    /// Columns to update, in declaration order. Column names are static
    /// strings, never user input.
    pub fn fields(&self) -> Vec<(&'static str, PatchValue)> {
        let mut out = Vec::new();

        macro_rules! push_text {
            ($field:ident) => {
                if let Some(v) = &self.$field {
                    out.push((stringify!($field), PatchValue::Text(v.clone())));
                }
            };
        }
        macro_rules! push_bool {
            ($field:ident) => {
                if let Some(v) = self.$field {
                    out.push((stringify!($field), PatchValue::Bool(v)));
                }
            };
        }

        push_text!(category);
        push_bool!(collage);
        push_bool!(prof_collage);
        push_text!(krisha);
        push_text!(instagram);
        push_text!(tiktok);
        push_text!(mailing);
        push_text!(stream);
        if let Some(v) = self.shows {
            out.push(("shows", PatchValue::Int(v)));
        }
        push_bool!(analytics);
        push_text!(price_update);
        push_bool!(provide_analytics);
        push_bool!(push_for_price);
        push_text!(status);

        out
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }
}
