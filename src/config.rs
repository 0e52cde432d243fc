// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact relay.
//!
//! All settings have defaults except the email provider credential. Values
//! are read through [`Config::from_lookup`], which takes an env-style lookup
//! so the process environment is only touched in `main`.

use crate::error::ConfigError;
use crate::validator::is_email_address;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the contact relay service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Per-sender rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Contact form field rules
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Email provider settings
    #[serde(default)]
    pub mail: MailConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Browser origins allowed to post the form
    #[serde(default)]
    pub cors: CorsConfig,
}

/// Fixed-window rate limit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum submissions per window per sender (default: 3)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 900)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Minimum time between sweeps of expired entries (default: 300)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// Field limits and spam heuristics for contact submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_name_min")]
    pub name_min_chars: usize,

    #[serde(default = "default_name_max")]
    pub name_max_chars: usize,

    /// RFC 5321 path limit (default: 254)
    #[serde(default = "default_email_max")]
    pub email_max_chars: usize,

    #[serde(default = "default_message_min")]
    pub message_min_chars: usize,

    #[serde(default = "default_message_max")]
    pub message_max_chars: usize,

    /// Words and phrases that mark a message as spam
    #[serde(default = "default_spam_keywords")]
    pub spam_keywords: Vec<String>,

    /// Reject messages containing `http`, `https` or `www.` (default: true)
    #[serde(default = "default_true")]
    pub reject_links: bool,

    /// Reject messages with this many consecutive digits (default: 4)
    #[serde(default = "default_digit_run")]
    pub digit_run_threshold: usize,
}

/// Transactional email provider settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Provider API key; dispatch is refused while unset
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Sender, either `addr@host` or `Display Name <addr@host>`
    #[serde(default = "default_from_address")]
    pub from_address: String,

    /// Recipient of contact submissions
    #[serde(default = "default_to_address")]
    pub to_address: String,

    /// Provider API root (default: https://api.resend.com)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Upper bound for one dispatch, in seconds (default: 10)
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_requests() -> u32 {
    3
}

fn default_window_secs() -> u64 {
    15 * 60
}

fn default_sweep_interval_secs() -> u64 {
    5 * 60
}

fn default_name_min() -> usize {
    2
}

fn default_name_max() -> usize {
    100
}

fn default_email_max() -> usize {
    254
}

fn default_message_min() -> usize {
    10
}

fn default_message_max() -> usize {
    2000
}

fn default_spam_keywords() -> Vec<String> {
    [
        "buy now",
        "click here",
        "free money",
        "make money",
        "urgent",
        "viagra",
        "casino",
        "poker",
        "loan",
        "debt",
        "credit",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_digit_run() -> usize {
    4
}

fn default_from_address() -> String {
    "Portfolio <onboarding@resend.dev>".to_string()
}

fn default_to_address() -> String {
    "your-email@example.com".to_string()
}

fn default_api_base_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_dispatch_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["https://erikbaer.dev".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rate_limit: RateLimitConfig::default(),
            validation: ValidationConfig::default(),
            mail: MailConfig::default(),
            metrics: MetricsConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            name_min_chars: default_name_min(),
            name_max_chars: default_name_max(),
            email_max_chars: default_email_max(),
            message_min_chars: default_message_min(),
            message_max_chars: default_message_max(),
            spam_keywords: default_spam_keywords(),
            reject_links: default_true(),
            digit_run_threshold: default_digit_run(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            from_address: default_from_address(),
            to_address: default_to_address(),
            api_base_url: default_api_base_url(),
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("from_address", &self.from_address)
            .field("to_address", &self.to_address)
            .field("api_base_url", &self.api_base_url)
            .field("dispatch_timeout_secs", &self.dispatch_timeout_secs)
            .finish()
    }
}

impl RateLimitConfig {
    /// Longest window accepted from configuration (one week).
    pub const MAX_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;

    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl MailConfig {
    /// The API key, if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }
}

impl Config {
    /// Build and validate a configuration from an env-style lookup.
    ///
    /// Blank values count as unset and fall back to the defaults.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `BIND_ADDR` | `bind_addr` |
    /// | `RESEND_API_KEY` | `mail.api_key` |
    /// | `RESEND_FROM_EMAIL` | `mail.from_address` |
    /// | `CONTACT_EMAIL` | `mail.to_address` |
    /// | `RESEND_API_URL` | `mail.api_base_url` |
    /// | `DISPATCH_TIMEOUT_SECS` | `mail.dispatch_timeout_secs` |
    /// | `CONTACT_RATE_LIMIT_MAX` | `rate_limit.max_requests` |
    /// | `CONTACT_RATE_LIMIT_WINDOW_SECS` | `rate_limit.window_secs` |
    /// | `METRICS_ENABLED` | `metrics.enabled` |
    /// | `ALLOWED_ORIGINS` | `cors.allowed_origins` (comma-separated) |
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Config::default();

        if let Some(addr) = var("BIND_ADDR") {
            config.bind_addr = addr;
        }

        config.mail.api_key = var("RESEND_API_KEY");
        if let Some(from) = var("RESEND_FROM_EMAIL") {
            config.mail.from_address = from;
        }
        if let Some(to) = var("CONTACT_EMAIL") {
            config.mail.to_address = to;
        }
        if let Some(url) = var("RESEND_API_URL") {
            config.mail.api_base_url = url;
        }
        if let Some(raw) = var("DISPATCH_TIMEOUT_SECS") {
            config.mail.dispatch_timeout_secs = parse_number("DISPATCH_TIMEOUT_SECS", &raw)?;
        }

        if let Some(raw) = var("CONTACT_RATE_LIMIT_MAX") {
            config.rate_limit.max_requests = parse_number("CONTACT_RATE_LIMIT_MAX", &raw)?;
        }
        if let Some(raw) = var("CONTACT_RATE_LIMIT_WINDOW_SECS") {
            config.rate_limit.window_secs = parse_number("CONTACT_RATE_LIMIT_WINDOW_SECS", &raw)?;
        }

        if let Some(raw) = var("METRICS_ENABLED") {
            config.metrics.enabled = parse_bool("METRICS_ENABLED", &raw)?;
        }

        if let Some(raw) = var("ALLOWED_ORIGINS") {
            config.cors.allowed_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints and value shapes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBindAddr(self.bind_addr.clone()))?;

        if !is_mailbox(&self.mail.from_address) {
            return Err(ConfigError::InvalidAddress {
                var: "RESEND_FROM_EMAIL",
                value: self.mail.from_address.clone(),
            });
        }
        if !is_email_address(&self.mail.to_address) {
            return Err(ConfigError::InvalidAddress {
                var: "CONTACT_EMAIL",
                value: self.mail.to_address.clone(),
            });
        }

        match url::Url::parse(&self.mail.api_base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {}
            _ => {
                return Err(ConfigError::InvalidUrl {
                    var: "RESEND_API_URL",
                    value: self.mail.api_base_url.clone(),
                })
            }
        }

        check_range(
            "DISPATCH_TIMEOUT_SECS",
            self.mail.dispatch_timeout_secs,
            1,
            300,
        )?;
        check_range(
            "CONTACT_RATE_LIMIT_MAX",
            u64::from(self.rate_limit.max_requests),
            1,
            u64::from(u32::MAX),
        )?;
        check_range(
            "CONTACT_RATE_LIMIT_WINDOW_SECS",
            self.rate_limit.window_secs,
            1,
            RateLimitConfig::MAX_WINDOW_SECS,
        )?;

        if !self.metrics.path.starts_with('/') {
            return Err(ConfigError::InvalidMetricsPath(self.metrics.path.clone()));
        }

        Ok(())
    }
}

/// Accepts `addr@host` or `Display Name <addr@host>`.
fn is_mailbox(value: &str) -> bool {
    if is_email_address(value) {
        return true;
    }
    match (value.rfind('<'), value.strip_suffix('>')) {
        (Some(open), Some(inner)) if open > 0 => {
            let display = value[..open].trim();
            let address = inner[open + 1..].trim();
            !display.is_empty() && is_email_address(address)
        }
        _ => false,
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.to_string(),
    })
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: raw.to_string(),
        }),
    }
}

fn check_range(var: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            var,
            value,
            min,
            max,
        })
    }
}
