// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact form validator.
//!
//! Checks the three submitted fields independently and reports every
//! problem found, keyed by field:
//! - name: length bounds after trimming, letters/spaces/hyphens/apostrophes only
//! - email: trimmed and lowercased, length bound, address shape
//! - message: length bounds after trimming, spam heuristics
//!
//! A valid submission comes back normalized (trimmed, lowercased email).

use crate::config::ValidationConfig;
use crate::i18n::{self, Lang};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

/// Latin letters including Latin-1 accented letters, space, hyphen, apostrophe.
///
/// Only the ASCII space: the name ends up in the email subject, so control
/// characters such as CR and LF must never pass.
const NAME_PATTERN: &str = r"^[a-zA-ZÀ-ÖØ-öø-ÿ '-]+$";

/// `local@label.label.tld` on an already lowercased address.
const EMAIL_PATTERN: &str = r"^[a-z0-9_'+\-.]*[a-z0-9_+\-]@(?:[a-z0-9][a-z0-9\-]*\.)+[a-z]{2,}$";

const LINK_PATTERN: &str = r"(?:https?|www\.)";

/// Raw contact form input as submitted by the visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

impl ContactSubmission {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            message: message.into(),
        }
    }
}

/// Submission that passed validation, with normalized values.
///
/// Only [`ContactValidator::validate`] produces one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
    name: String,
    email: String,
    message: String,
}

impl ValidatedSubmission {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trimmed, lowercased address.
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&ValidatedSubmission> for ContactSubmission {
    fn from(valid: &ValidatedSubmission) -> Self {
        ContactSubmission::new(&valid.name, &valid.email, &valid.message)
    }
}

/// Form field an error message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "message")]
    Message,
    /// Errors not tied to a single field.
    #[serde(rename = "_form")]
    Form,
}

/// Error messages per field, in field order.
pub type FieldErrors = BTreeMap<Field, Vec<String>>;

/// Convenience for a single form-level error.
pub fn form_error(message: impl Into<String>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.insert(Field::Form, vec![message.into()]);
    errors
}

/// Result of validation.
#[derive(Debug, Clone)]
pub enum ValidationResult {
    /// Submission is valid
    Valid(ValidatedSubmission),
    /// Submission is invalid; never empty
    Invalid(FieldErrors),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    pub fn errors(&self) -> Option<&FieldErrors> {
        match self {
            ValidationResult::Valid(_) => None,
            ValidationResult::Invalid(errors) => Some(errors),
        }
    }

    pub fn into_valid(self) -> Option<ValidatedSubmission> {
        match self {
            ValidationResult::Valid(valid) => Some(valid),
            ValidationResult::Invalid(_) => None,
        }
    }
}

/// Whether `candidate` looks like a bare email address.
///
/// Case-insensitive; surrounding whitespace is not tolerated.
pub fn is_email_address(candidate: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    // EMAIL_PATTERN is a constant; test_constant_patterns_compile covers it.
    let re = EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is valid"));

    let lowered = candidate.to_lowercase();
    let Some((local, _)) = lowered.split_once('@') else {
        return false;
    };
    if local.starts_with('.') || lowered.contains("..") {
        return false;
    }
    re.is_match(&lowered)
}

/// Contact form validator.
pub struct ContactValidator {
    config: ValidationConfig,
    name_re: Regex,
    spam_patterns: Vec<Regex>,
}

impl ContactValidator {
    /// Create a validator, compiling the spam patterns from `config`.
    pub fn new(config: ValidationConfig) -> Result<Self, regex::Error> {
        let name_re = Regex::new(NAME_PATTERN)?;

        let mut spam_patterns = Vec::new();
        let keywords: Vec<String> = config
            .spam_keywords
            .iter()
            .map(|phrase| {
                phrase
                    .split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s+")
            })
            .filter(|p| !p.is_empty())
            .collect();
        if !keywords.is_empty() {
            spam_patterns.push(Regex::new(&format!(r"\b(?:{})\b", keywords.join("|")))?);
        }
        if config.reject_links {
            spam_patterns.push(Regex::new(LINK_PATTERN)?);
        }
        if config.digit_run_threshold > 0 {
            spam_patterns.push(Regex::new(&format!(
                "[0-9]{{{},}}",
                config.digit_run_threshold
            ))?);
        }

        Ok(Self {
            config,
            name_re,
            spam_patterns,
        })
    }

    /// Validate a complete submission, collecting every field error.
    pub fn validate(&self, input: &ContactSubmission, lang: Lang) -> ValidationResult {
        let name = input.name.trim();
        let email = input.email.trim().to_lowercase();
        let message = input.message.trim();

        let mut errors = FieldErrors::new();
        for (field, problems) in [
            (Field::Name, self.check_name(&input.name, name, lang)),
            (Field::Email, self.check_email(&email, lang)),
            (Field::Message, self.check_message(&input.message, message, lang)),
        ] {
            if !problems.is_empty() {
                errors.insert(field, problems);
            }
        }

        if errors.is_empty() {
            debug!("Contact submission valid");
            ValidationResult::Valid(ValidatedSubmission {
                name: name.to_string(),
                email,
                message: message.to_string(),
            })
        } else {
            debug!(fields = ?errors.keys().collect::<Vec<_>>(), "Contact submission invalid");
            ValidationResult::Invalid(errors)
        }
    }

    fn check_name(&self, raw: &str, name: &str, lang: Lang) -> Vec<String> {
        let mut problems = Vec::new();
        let len = name.chars().count();
        let (min, max) = (self.config.name_min_chars, self.config.name_max_chars);

        if name.is_empty() && !raw.is_empty() {
            problems.push(i18n::t(lang, "validation.name.whitespace").to_string());
        } else if len < min {
            problems.push(bound(lang, "validation.name.too_short", "min", min));
        }
        if len > max {
            problems.push(bound(lang, "validation.name.too_long", "max", max));
        }
        if !name.is_empty() && !self.name_re.is_match(name) {
            problems.push(i18n::t(lang, "validation.name.pattern").to_string());
        }
        problems
    }

    fn check_email(&self, email: &str, lang: Lang) -> Vec<String> {
        if email.is_empty() {
            return vec![i18n::t(lang, "validation.email.required").to_string()];
        }

        let mut problems = Vec::new();
        let max = self.config.email_max_chars;
        if email.chars().count() > max {
            problems.push(bound(lang, "validation.email.too_long", "max", max));
        }
        if !is_email_address(email) {
            problems.push(i18n::t(lang, "validation.email.invalid").to_string());
        }
        problems
    }

    fn check_message(&self, raw: &str, message: &str, lang: Lang) -> Vec<String> {
        let mut problems = Vec::new();
        let len = message.chars().count();
        let (min, max) = (self.config.message_min_chars, self.config.message_max_chars);

        if message.is_empty() && !raw.is_empty() {
            problems.push(i18n::t(lang, "validation.message.whitespace").to_string());
        } else if len < min {
            problems.push(bound(lang, "validation.message.too_short", "min", min));
        }
        if len > max {
            problems.push(bound(lang, "validation.message.too_long", "max", max));
        }
        if self.looks_like_spam(message) {
            problems.push(i18n::t(lang, "validation.message.spam").to_string());
        }
        problems
    }

    /// Whether the message trips any spam heuristic.
    pub fn looks_like_spam(&self, message: &str) -> bool {
        let lowered = message.to_lowercase();
        self.spam_patterns.iter().any(|re| re.is_match(&lowered))
    }
}

fn bound(lang: Lang, key: &'static str, placeholder: &str, value: usize) -> String {
    i18n::format(lang, key, &[(placeholder, &value.to_string())])
}
