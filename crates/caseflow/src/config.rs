//! Engine configuration from environment variables.

use std::time::Duration;

use anyhow::{Context, Result};

/// Default interval between per-session status checks (5 minutes).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

/// Default per-session check cap: 288 checks at 5 minutes is roughly 24 hours.
pub const DEFAULT_MAX_CHECKS: u32 = 288;

/// Default interval between global sweep ticks (5 minutes).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Default age after which an open case gets a manufacturer-side reminder.
pub const DEFAULT_REMINDER_AFTER_HOURS: u64 = 24;

/// Default SMTP port (STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Engine-wide configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the manufacturer portal.
    pub portal_base_url: String,
    /// Postgres connection string for the case store.
    pub database_url: String,
    /// Run the automation browser headless. Disable for local debugging.
    pub headless: bool,
    /// Sleep between per-session status checks.
    pub poll_interval: Duration,
    /// Per-session monitor check cap.
    pub max_checks: u32,
    /// Interval between global sweep ticks.
    pub sweep_interval: Duration,
    /// Open-case age threshold before a reminder is driven through the portal.
    pub reminder_after: Duration,
}

impl EngineConfig {
    /// Create configuration from environment variables.
    ///
    /// # Required Environment Variables
    /// - `PORTAL_BASE_URL`: manufacturer portal base URL
    /// - `DATABASE_URL`: Postgres connection string
    ///
    /// # Optional Environment Variables
    /// - `CASEFLOW_HEADLESS`: "false" to show the browser (default: true)
    /// - `CASEFLOW_POLL_INTERVAL_SECS` (default: 300)
    /// - `CASEFLOW_MAX_CHECKS` (default: 288)
    /// - `CASEFLOW_SWEEP_INTERVAL_SECS` (default: 300)
    /// - `CASEFLOW_REMINDER_AFTER_HOURS` (default: 24)
    pub fn from_env() -> Result<Self> {
        let portal_base_url = std::env::var("PORTAL_BASE_URL")
            .context("PORTAL_BASE_URL environment variable not set")?;

        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL environment variable not set")?;

        let headless = std::env::var("CASEFLOW_HEADLESS")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let poll_interval = env_secs("CASEFLOW_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS);

        let max_checks = std::env::var("CASEFLOW_MAX_CHECKS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_CHECKS);

        let sweep_interval = env_secs("CASEFLOW_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS);

        let reminder_after_hours = std::env::var("CASEFLOW_REMINDER_AFTER_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_REMINDER_AFTER_HOURS);

        Ok(Self {
            portal_base_url,
            database_url,
            headless,
            poll_interval,
            max_checks,
            sweep_interval,
            reminder_after: Duration::from_secs(reminder_after_hours * 3600),
        })
    }
}

/// SMTP transport configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender address (defaults to the username).
    pub from_email: String,
}

impl SmtpConfig {
    /// Create configuration from environment variables.
    ///
    /// # Required Environment Variables
    /// - `SMTP_HOST`: SMTP relay hostname
    /// - `SMTP_USERNAME`: SMTP login
    /// - `SMTP_PASSWORD`: SMTP password (app password for Gmail)
    ///
    /// # Optional Environment Variables
    /// - `SMTP_PORT` (default: 587)
    /// - `SMTP_FROM_EMAIL` (default: same as `SMTP_USERNAME`)
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("SMTP_HOST").context("SMTP_HOST environment variable not set")?;

        let username =
            std::env::var("SMTP_USERNAME").context("SMTP_USERNAME environment variable not set")?;

        let password =
            std::env::var("SMTP_PASSWORD").context("SMTP_PASSWORD environment variable not set")?;

        let port = std::env::var("SMTP_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SMTP_PORT);

        let from_email =
            std::env::var("SMTP_FROM_EMAIL").unwrap_or_else(|_| username.clone());

        Ok(Self {
            host,
            port,
            username,
            password,
            from_email,
        })
    }
}

fn env_secs(var: &str, default: u64) -> Duration {
    let secs = std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}
