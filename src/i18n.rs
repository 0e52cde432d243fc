// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! User-facing message catalog.
//!
//! The portfolio is bilingual (English and German), so every string the
//! service hands back to a visitor is looked up here. Internal log lines
//! stay in English.
//!
//! Keys use dotted namespaces (`"validation.name.too_short"`). Lookups fall
//! back to English when a key is missing in the requested language, and to
//! the key itself when English lacks it too.
//!
//! Some entries carry `{placeholder}` slots; use [`format`] to fill them.

use serde::{Deserialize, Serialize};

/// Languages the contact service can answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    De,
}

impl Lang {
    /// ISO 639-1 two-letter code for this language.
    pub fn code(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::De => "de",
        }
    }

    /// Parse an ISO 639-1 code. Case-insensitive, ignores a region suffix
    /// (`de-AT` resolves to German).
    pub fn from_code(code: &str) -> Option<Lang> {
        let primary = code.trim().split(['-', '_']).next().unwrap_or_default();
        match primary.to_ascii_lowercase().as_str() {
            "en" => Some(Lang::En),
            "de" => Some(Lang::De),
            _ => None,
        }
    }

    /// First supported language in an `Accept-Language` header value.
    ///
    /// Tags are taken in the order the client listed them; quality weights
    /// are ignored.
    pub fn from_accept_language(header: &str) -> Option<Lang> {
        header
            .split(',')
            .filter_map(|item| item.split(';').next())
            .find_map(Lang::from_code)
    }

    /// All supported languages.
    pub fn all() -> &'static [Lang] {
        &[Lang::En, Lang::De]
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Look up a message key in the given language.
pub fn t(lang: Lang, key: &'static str) -> &'static str {
    if let Some(value) = lookup(catalog_for(lang), key) {
        return value;
    }
    if lang != Lang::En {
        if let Some(value) = lookup(EN, key) {
            return value;
        }
    }
    key
}

/// Look up a message key and substitute `{name}` placeholders.
pub fn format(lang: Lang, key: &'static str, args: &[(&str, &str)]) -> String {
    let mut message = t(lang, key).to_string();
    for (name, value) in args {
        message = message.replace(&format!("{{{name}}}"), value);
    }
    message
}

fn lookup(catalog: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    catalog.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn catalog_for(lang: Lang) -> &'static [(&'static str, &'static str)] {
    match lang {
        Lang::En => EN,
        Lang::De => DE,
    }
}

const EN: &[(&str, &str)] = &[
    ("validation.name.whitespace", "Name cannot be only whitespace"),
    ("validation.name.too_short", "Name must be at least {min} characters long"),
    ("validation.name.too_long", "Name must not exceed {max} characters"),
    (
        "validation.name.pattern",
        "Name can only contain letters, spaces, hyphens, and apostrophes",
    ),
    ("validation.email.required", "Email is required"),
    ("validation.email.too_long", "Email must not exceed {max} characters"),
    ("validation.email.invalid", "Please enter a valid email address"),
    ("validation.message.whitespace", "Message cannot be only whitespace"),
    (
        "validation.message.too_short",
        "Message must be at least {min} characters long",
    ),
    ("validation.message.too_long", "Message must not exceed {max} characters"),
    (
        "validation.message.spam",
        "Message contains suspicious content. Please ensure your message is appropriate.",
    ),
    (
        "ratelimit.retry.one",
        "Too many requests. Please try again in 1 minute.",
    ),
    (
        "ratelimit.retry.many",
        "Too many requests. Please try again in {minutes} minutes.",
    ),
    ("contact.sent", "Message sent successfully!"),
    (
        "contact.unavailable",
        "The contact service is currently unavailable. Please try again later.",
    ),
    (
        "contact.delivery_failed",
        "Failed to send email. Please try again later.",
    ),
    (
        "contact.unexpected",
        "An unexpected error occurred. Please try again later.",
    ),
];

const DE: &[(&str, &str)] = &[
    (
        "validation.name.whitespace",
        "Der Name darf nicht nur aus Leerzeichen bestehen",
    ),
    (
        "validation.name.too_short",
        "Der Name muss mindestens {min} Zeichen lang sein",
    ),
    (
        "validation.name.too_long",
        "Der Name darf höchstens {max} Zeichen lang sein",
    ),
    (
        "validation.name.pattern",
        "Der Name darf nur Buchstaben, Leerzeichen, Bindestriche und Apostrophe enthalten",
    ),
    ("validation.email.required", "E-Mail-Adresse ist erforderlich"),
    (
        "validation.email.too_long",
        "Die E-Mail-Adresse darf höchstens {max} Zeichen lang sein",
    ),
    ("validation.email.invalid", "Ungültige E-Mail-Adresse"),
    (
        "validation.message.whitespace",
        "Die Nachricht darf nicht nur aus Leerzeichen bestehen",
    ),
    (
        "validation.message.too_short",
        "Die Nachricht muss mindestens {min} Zeichen lang sein",
    ),
    (
        "validation.message.too_long",
        "Die Nachricht darf höchstens {max} Zeichen lang sein",
    ),
    (
        "validation.message.spam",
        "Die Nachricht enthält verdächtige Inhalte. Bitte überprüfen Sie Ihre Nachricht.",
    ),
    (
        "ratelimit.retry.one",
        "Zu viele Anfragen. Bitte versuchen Sie es in 1 Minute erneut.",
    ),
    (
        "ratelimit.retry.many",
        "Zu viele Anfragen. Bitte versuchen Sie es in {minutes} Minuten erneut.",
    ),
    ("contact.sent", "Nachricht erfolgreich gesendet!"),
    (
        "contact.unavailable",
        "Der Kontaktdienst ist derzeit nicht verfügbar. Bitte versuchen Sie es später erneut.",
    ),
    (
        "contact.delivery_failed",
        "Fehler beim Senden der E-Mail. Bitte versuchen Sie es später erneut.",
    ),
    ("contact.unexpected", "Interner Serverfehler. Bitte versuchen Sie es später erneut."),
];
