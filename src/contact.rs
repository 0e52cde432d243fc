// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact submission pipeline.
//!
//! Validate, then rate-limit, then dispatch, stopping at the first gate
//! that refuses. Invalid input never reaches the limiter, so malformed
//! requests do not use up a sender's quota. There are no retries; a visitor
//! may resubmit and is rate limited as usual.

use crate::config::Config;
use crate::error::{DispatchError, SetupError};
use crate::i18n::{self, Lang};
use crate::limiter::{self, RateLimiter};
use crate::mailer::{EmailDispatcher, MailTransport};
use crate::metrics::ContactMetrics;
use crate::validator::{form_error, ContactSubmission, ContactValidator, FieldErrors, ValidationResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// How a submission ended, for transports that need more than the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Sent,
    Invalid,
    RateLimited { retry_after: Duration },
    Unavailable,
}

/// Result handed back to the visitor.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(skip)]
    pub kind: OutcomeKind,
}

impl SubmissionOutcome {
    fn sent(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            errors: None,
            kind: OutcomeKind::Sent,
        }
    }

    fn refused(errors: FieldErrors, kind: OutcomeKind) -> Self {
        Self {
            success: false,
            message: None,
            errors: Some(errors),
            kind,
        }
    }
}

/// Validator, rate limiter and dispatcher wired together.
pub struct ContactService {
    validator: ContactValidator,
    limiter: Arc<RateLimiter>,
    dispatcher: EmailDispatcher,
    metrics: ContactMetrics,
}

impl ContactService {
    pub fn new(
        validator: ContactValidator,
        limiter: Arc<RateLimiter>,
        dispatcher: EmailDispatcher,
        metrics: ContactMetrics,
    ) -> Self {
        Self {
            validator,
            limiter,
            dispatcher,
            metrics,
        }
    }

    /// Assemble the pipeline from configuration, with an in-memory limiter.
    pub fn from_config(
        config: &Config,
        transport: Arc<dyn MailTransport>,
    ) -> Result<Self, SetupError> {
        Ok(Self::new(
            ContactValidator::new(config.validation.clone())?,
            Arc::new(RateLimiter::in_memory(config.rate_limit.clone())),
            EmailDispatcher::new(config.mail.clone(), transport),
            ContactMetrics::new()?,
        ))
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn metrics(&self) -> &ContactMetrics {
        &self.metrics
    }

    /// Run one submission through the pipeline.
    pub async fn submit(&self, input: &ContactSubmission, lang: Lang) -> SubmissionOutcome {
        let submission = match self.validator.validate(input, lang) {
            ValidationResult::Valid(valid) => valid,
            ValidationResult::Invalid(errors) => {
                debug!(fields = errors.len(), "Contact submission rejected by validation");
                self.metrics.record("invalid");
                return SubmissionOutcome::refused(errors, OutcomeKind::Invalid);
            }
        };

        let id = limiter::identifier(submission.email());
        let decision = self.limiter.check(&id, lang).await;
        if !decision.allowed {
            self.metrics.record("rate_limited");
            return SubmissionOutcome::refused(
                form_error(decision.message.unwrap_or_default()),
                OutcomeKind::RateLimited {
                    retry_after: decision.retry_after.unwrap_or_default(),
                },
            );
        }

        let started = Instant::now();
        let result = match tokio::time::timeout(
            self.dispatcher.timeout(),
            self.dispatcher.send(&submission),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DispatchError::Unexpected(format!(
                "dispatch timed out after {:?}",
                self.dispatcher.timeout()
            ))),
        };
        self.metrics.observe_dispatch(started.elapsed().as_secs_f64());

        match result {
            Ok(receipt) => {
                info!(
                    message_id = ?receipt.message_id,
                    remaining = decision.remaining,
                    "Contact message sent"
                );
                self.metrics.record("sent");
                SubmissionOutcome::sent(i18n::t(lang, "contact.sent"))
            }
            Err(err) => {
                error!(error = %err, kind = err.kind(), "Contact message dispatch failed");
                self.metrics.record(err.kind());
                let key = match err {
                    DispatchError::NotConfigured => "contact.unavailable",
                    DispatchError::Delivery(_) => "contact.delivery_failed",
                    DispatchError::Unexpected(_) => "contact.unexpected",
                };
                SubmissionOutcome::refused(
                    form_error(i18n::t(lang, key)),
                    OutcomeKind::Unavailable,
                )
            }
        }
    }
}
