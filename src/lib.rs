// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Portfolio Contact Relay
//!
//! Receives contact form submissions for the portfolio site and forwards
//! them to a transactional email provider:
//!
//! - Server-side validation with spam heuristics
//! - Per-sender fixed-window rate limiting (3 per 15 minutes default)
//! - Email dispatch with distinct configuration, delivery and unexpected
//!   failure modes
//! - English and German response messages

pub mod clock;
pub mod config;
pub mod contact;
pub mod error;
pub mod handlers;
pub mod i18n;
pub mod limiter;
pub mod mailer;
pub mod metrics;
pub mod validator;

pub use config::Config;
pub use contact::{ContactService, OutcomeKind, SubmissionOutcome};
pub use limiter::{RateLimitDecision, RateLimiter};
pub use mailer::{EmailDispatcher, MailTransport, ResendTransport};
pub use validator::{ContactSubmission, ContactValidator, ValidationResult};
