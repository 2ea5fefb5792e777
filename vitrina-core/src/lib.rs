//! vitrina-core: shared foundations for the vitrina CRM data service
//!
//! Configuration, error types, phone-number normalization, the agent roster
//! file and the contract-page file cache. Everything database- or
//! HTTP-shaped lives in `vitrina-server`.

pub mod cache;
pub mod config;
pub mod error;
pub mod phone;
pub mod roster;

pub use cache::ContractCache;
pub use config::VitrinaConfig;
pub use error::{Result, VitrinaError};
pub use phone::{is_valid_phone, normalize_phone, phones_match};
pub use roster::{AgentRoster, RosterEntry};
