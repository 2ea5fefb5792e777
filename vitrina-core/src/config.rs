//! Environment-driven configuration.
//!
//! The deployment contract is env vars (optionally via a `.env` file), not a
//! config file: the container images set `BOT_TOKEN`, `WEBHOOK_URL`,
//! `USE_WEBHOOK`, `TZ` and friends, and mount `data/agents.csv` (read-only)
//! and `data/cache.json` (read-write).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::{Result, VitrinaError};

/// Default webhook/web-app port exposed by the container.
const DEFAULT_WEBAPP_PORT: u16 = 8080;

/// Default health-check port exposed by the container.
const DEFAULT_HEALTH_PORT: u16 = 8081;

/// Centralized configuration for the vitrina service
#[derive(Debug, Clone)]
pub struct VitrinaConfig {
    /// PostgreSQL connection string (required)
    pub database_url: String,

    /// Telegram bot credentials. Optional: data-layer commands (ingest,
    /// reconcile, sweeps) run without a bot attached.
    pub bot_token: Option<String>,
    pub bot_username: Option<String>,

    /// Webhook mode vs long polling
    pub use_webhook: bool,
    pub webhook_url: String,
    pub webapp_host: String,
    pub webapp_port: u16,

    /// Health/status HTTP server port
    pub health_check_port: u16,

    /// Agent roster CSV (mounted read-only in the container)
    pub agents_file: PathBuf,
    /// Contract-page cache file (mounted read-write in the container)
    pub cache_file: PathBuf,

    /// Page size for contract listings
    pub contracts_per_page: u32,

    /// Recall scanner poll interval
    pub recall_poll_interval: Duration,

    /// Archival sweep: max concurrent liveness probes
    pub archive_concurrency: usize,
    /// Archival sweep: per-probe timeout
    pub archive_timeout: Duration,
    /// Listing page URL template, `{krisha_id}` substituted
    pub archive_url_template: String,

    /// Outbound request timeout
    pub request_timeout: Duration,
    /// Retry attempts for outbound requests
    pub max_retries: u32,

    /// Local timezone for recall scheduling (container `TZ`)
    pub timezone: Tz,
}

impl VitrinaConfig {
    /// Load configuration from the environment (and `.env` if present).
    ///
    /// `DATABASE_URL` is required; everything else has a default.
    pub fn from_env() -> Result<Self> {
        // A missing .env is fine; a malformed one is not silently ignored.
        let _ = dotenvy::dotenv();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| VitrinaError::config("DATABASE_URL is not set"))?;

        let timezone = match env::var("TZ") {
            Ok(name) => name.parse::<Tz>().map_err(|_| {
                VitrinaError::config(format!("TZ '{name}' is not a valid IANA timezone"))
            })?,
            Err(_) => chrono_tz::Asia::Almaty,
        };

        Ok(Self {
            database_url,
            bot_token: env::var("BOT_TOKEN").ok().filter(|s| !s.is_empty()),
            bot_username: env::var("BOT_USERNAME").ok().filter(|s| !s.is_empty()),
            use_webhook: env_bool("USE_WEBHOOK", false),
            webhook_url: env::var("WEBHOOK_URL").unwrap_or_default(),
            webapp_host: env::var("WEBAPP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            webapp_port: env_parsed("WEBAPP_PORT", DEFAULT_WEBAPP_PORT)?,
            health_check_port: env_parsed("HEALTH_CHECK_PORT", DEFAULT_HEALTH_PORT)?,
            agents_file: env::var("AGENTS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/agents.csv")),
            cache_file: env::var("CACHE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/cache.json")),
            contracts_per_page: env_parsed("CONTRACTS_PER_PAGE", 10)?,
            recall_poll_interval: Duration::from_secs(env_parsed("RECALL_POLL_SECS", 60u64)?),
            archive_concurrency: env_parsed("ARCHIVE_CONCURRENCY", 5usize)?,
            archive_timeout: Duration::from_secs(env_parsed("ARCHIVE_TIMEOUT", 15u64)?),
            archive_url_template: env::var("ARCHIVE_URL_TEMPLATE")
                .unwrap_or_else(|_| "https://krisha.kz/a/show/{krisha_id}".to_string()),
            request_timeout: Duration::from_secs(env_parsed("REQUEST_TIMEOUT", 30u64)?),
            max_retries: env_parsed("MAX_RETRIES", 3)?,
            timezone,
        })
    }

    /// Bot credentials, or a config error naming the missing variable.
    /// Commands that talk to Telegram call this; data-layer commands don't.
    pub fn require_bot(&self) -> Result<(&str, &str)> {
        let token = self
            .bot_token
            .as_deref()
            .ok_or_else(|| VitrinaError::config("BOT_TOKEN is not set"))?;
        let username = self
            .bot_username
            .as_deref()
            .ok_or_else(|| VitrinaError::config("BOT_USERNAME is not set"))?;
        Ok((token, username))
    }
}

/// Parse an env var with a default, failing loudly on garbage values.
fn env_parsed<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(raw) if !raw.is_empty() => raw.parse::<T>().map_err(|_| {
            VitrinaError::config(format!("{name}='{raw}' is not a valid value"))
        }),
        _ => Ok(default),
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(raw) => matches!(raw.to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests mutate process state; keep them serialized on one lock.
    use std::sync::Mutex;
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn missing_database_url_is_config_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var("DATABASE_URL");
        let err = VitrinaConfig::from_env().unwrap_err();
        assert!(matches!(err, VitrinaError::Config { .. }));
    }

    #[test]
    fn defaults_applied() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("DATABASE_URL", "postgres://localhost/vitrina");
        env::remove_var("WEBAPP_PORT");
        env::remove_var("HEALTH_CHECK_PORT");
        env::remove_var("USE_WEBHOOK");
        env::remove_var("TZ");

        let cfg = VitrinaConfig::from_env().unwrap();
        assert_eq!(cfg.webapp_port, 8080);
        assert_eq!(cfg.health_check_port, 8081);
        assert!(!cfg.use_webhook);
        assert_eq!(cfg.contracts_per_page, 10);
        assert_eq!(cfg.timezone, chrono_tz::Asia::Almaty);

        env::remove_var("DATABASE_URL");
    }

    #[test]
    fn bad_port_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("DATABASE_URL", "postgres://localhost/vitrina");
        env::set_var("WEBAPP_PORT", "not-a-port");

        let err = VitrinaConfig::from_env().unwrap_err();
        assert!(matches!(err, VitrinaError::Config { .. }));

        env::remove_var("WEBAPP_PORT");
        env::remove_var("DATABASE_URL");
    }

    #[test]
    fn bot_credentials_optional_until_required() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("DATABASE_URL", "postgres://localhost/vitrina");
        env::remove_var("BOT_TOKEN");
        env::remove_var("BOT_USERNAME");

        let cfg = VitrinaConfig::from_env().unwrap();
        assert!(cfg.bot_token.is_none());
        assert!(cfg.require_bot().is_err());

        env::remove_var("DATABASE_URL");
    }
}
