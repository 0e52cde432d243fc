// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the contact relay.
//!
//! Validation and rate-limit refusals are ordinary values
//! ([`ValidationResult`](crate::validator::ValidationResult),
//! [`RateLimitDecision`](crate::limiter::RateLimitDecision)); the enums here
//! cover configuration problems and email dispatch failures.

use thiserror::Error;

/// Invalid configuration detected at start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid bind address: {0}")]
    InvalidBindAddr(String),

    #[error("Invalid email address in {var}: {value}")]
    InvalidAddress { var: &'static str, value: String },

    #[error("Invalid URL in {var}: {value}")]
    InvalidUrl { var: &'static str, value: String },

    #[error("Invalid number in {var}: {value}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("Invalid boolean in {var}: {value}")]
    InvalidBool { var: &'static str, value: String },

    #[error("{var} must be between {min} and {max}, got {value}")]
    OutOfRange {
        var: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("Metrics path must start with '/': {0}")]
    InvalidMetricsPath(String),
}

/// Failure reported by a [`MailTransport`](crate::mailer::MailTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The provider answered and refused the message.
    #[error("Provider rejected message ({status} {name}): {message}")]
    Rejected {
        status: u16,
        name: String,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Any other failure before the provider could answer.
    #[error("Transport failure: {0}")]
    Transport(String),
}

/// Dispatch failure taxonomy surfaced to the orchestrator.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No provider credential; nothing was sent.
    #[error("Email provider is not configured")]
    NotConfigured,

    /// The provider refused the message.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Network failure, timeout or anything else unexpected.
    #[error("Unexpected dispatch error: {0}")]
    Unexpected(String),
}

impl DispatchError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::Delivery(_) => "delivery_failed",
            Self::Unexpected(_) => "unexpected",
        }
    }
}

impl From<TransportError> for DispatchError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Rejected { .. } => DispatchError::Delivery(err.to_string()),
            other => DispatchError::Unexpected(other.to_string()),
        }
    }
}

/// Failure while assembling the service from its configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Invalid validation pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Metrics registration failed: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, DispatchError>;
