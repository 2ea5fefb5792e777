//! Scraped listing rows (`parsed_properties`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Scraped listing record from the database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ParsedProperty {
    pub vitrina_id: i64,
    pub rbd_id: i64,
    pub krisha_id: Option<String>,
    pub krisha_date: Option<DateTime<Utc>>,
    pub object_type: Option<String>,
    pub address: Option<String>,
    pub complex: Option<String>,
    pub builder: Option<String>,
    pub flat_type: Option<String>,
    pub property_class: Option<String>,
    pub condition: Option<String>,
    pub sell_price: Option<f64>,
    pub sell_price_per_m2: Option<f64>,
    pub address_type: Option<String>,
    pub house_num: Option<String>,
    pub floor_num: Option<i32>,
    pub floor_count: Option<i32>,
    pub room_count: Option<i32>,
    pub phones: Option<String>,
    pub description: Option<String>,
    pub ceiling_height: Option<f64>,
    pub area: Option<f64>,
    pub year_built: Option<i32>,
    pub wall_type: Option<String>,

    // Agent workflow state
    pub stats_agent_given: Option<String>,
    pub stats_time_given: Option<DateTime<Utc>>,
    pub stats_object_status: Option<String>,
    pub stats_recall_time: Option<DateTime<Utc>>,
    pub stats_description: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl ParsedProperty {
    /// Non-empty external listing id, if this row has one.
    pub fn external_id(&self) -> Option<&str> {
        self.krisha_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn is_claimed(&self) -> bool {
        self.stats_agent_given.is_some()
    }
}

/// Listing as produced by the ingest feed, before it has a surrogate key.
///
/// Deserialized straight from the NDJSON ingest format; only `rbd_id` is
/// required, everything else is whatever the source happened to publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewParsedProperty {
    pub rbd_id: i64,
    #[serde(default)]
    pub krisha_id: Option<String>,
    #[serde(default)]
    pub krisha_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub complex: Option<String>,
    #[serde(default)]
    pub builder: Option<String>,
    #[serde(default)]
    pub flat_type: Option<String>,
    #[serde(default)]
    pub property_class: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub sell_price: Option<f64>,
    #[serde(default)]
    pub sell_price_per_m2: Option<f64>,
    #[serde(default)]
    pub address_type: Option<String>,
    #[serde(default)]
    pub house_num: Option<String>,
    #[serde(default)]
    pub floor_num: Option<i32>,
    #[serde(default)]
    pub floor_count: Option<i32>,
    #[serde(default)]
    pub room_count: Option<i32>,
    #[serde(default)]
    pub phones: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ceiling_height: Option<f64>,
    #[serde(default)]
    pub area: Option<f64>,
    #[serde(default)]
    pub year_built: Option<i32>,
    #[serde(default)]
    pub wall_type: Option<String>,
    #[serde(default)]
    pub stats_agent_given: Option<String>,
    #[serde(default)]
    pub stats_time_given: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stats_object_status: Option<String>,
    #[serde(default)]
    pub stats_recall_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stats_description: Option<String>,
}

impl NewParsedProperty {
    /// Normalize an empty `krisha_id` to NULL so the partial indexes and
    /// the uniqueness convention ("unique when non-empty") see one shape.
    pub fn normalized(mut self) -> Self {
        if matches!(self.krisha_id.as_deref(), Some("")) {
            self.krisha_id = None;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_ndjson_line_parses() {
        let row: NewParsedProperty = serde_json::from_str(r#"{"rbd_id": 421337}"#).unwrap();
        assert_eq!(row.rbd_id, 421337);
        assert!(row.krisha_id.is_none());
    }

    #[test]
    fn full_line_parses() {
        let row: NewParsedProperty = serde_json::from_str(
            r#"{
                "rbd_id": 1,
                "krisha_id": "685123456",
                "krisha_date": "2024-05-01T10:00:00Z",
                "address": "Алматы, Бостандыкский р-н",
                "room_count": 2,
                "sell_price": 42000000.0
            }"#,
        )
        .unwrap();
        assert_eq!(row.krisha_id.as_deref(), Some("685123456"));
        assert_eq!(row.room_count, Some(2));
    }

    #[test]
    fn missing_rbd_id_is_an_error() {
        assert!(serde_json::from_str::<NewParsedProperty>(r#"{"krisha_id": "1"}"#).is_err());
    }

    #[test]
    fn empty_krisha_id_normalized_to_null() {
        let row: NewParsedProperty =
            serde_json::from_str(r#"{"rbd_id": 1, "krisha_id": ""}"#).unwrap();
        assert!(row.normalized().krisha_id.is_none());
    }
}
