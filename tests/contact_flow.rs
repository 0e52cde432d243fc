// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! End-to-end tests for the contact pipeline against a recording provider.

mod harness;

use harness::{configured, unconfigured, valid_submission, RecordingTransport};
use portfolio_contact::{
    clock::ManualClock,
    config::RateLimitConfig,
    contact::{ContactService, OutcomeKind},
    i18n::Lang,
    limiter::{MemoryStore, RateLimiter},
    mailer::EmailDispatcher,
    metrics::ContactMetrics,
    validator::{ContactSubmission, ContactValidator, Field},
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_valid_submission_is_sent() {
    let transport = RecordingTransport::accepting();
    let service = ContactService::from_config(&configured(), transport.clone()).unwrap();

    let outcome = service
        .submit(&valid_submission("visitor@example.com"), Lang::En)
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.kind, OutcomeKind::Sent);
    assert_eq!(outcome.message.as_deref(), Some("Message sent successfully!"));
    assert!(outcome.errors.is_none());

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "owner@example.com");
    assert_eq!(sent[0].reply_to, "visitor@example.com");
    assert_eq!(sent[0].subject, "Contact request from Erik Baer");
    assert_eq!(service.metrics().count("sent"), 1);
}

#[tokio::test]
async fn test_invalid_submission_never_dispatches() {
    let transport = RecordingTransport::accepting();
    let service = ContactService::from_config(&configured(), transport.clone()).unwrap();

    let outcome = service
        .submit(&ContactSubmission::new("a", "bad", "short"), Lang::En)
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.kind, OutcomeKind::Invalid);
    let errors = outcome.errors.unwrap();
    assert!(errors.contains_key(&Field::Name));
    assert!(errors.contains_key(&Field::Email));
    assert!(errors.contains_key(&Field::Message));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_invalid_submissions_do_not_use_quota() {
    let transport = RecordingTransport::accepting();
    let service = ContactService::from_config(&configured(), transport.clone()).unwrap();

    for _ in 0..5 {
        let outcome = service
            .submit(
                &ContactSubmission::new("Erik Baer", "visitor@example.com", "short"),
                Lang::En,
            )
            .await;
        assert_eq!(outcome.kind, OutcomeKind::Invalid);
    }

    let outcome = service
        .submit(&valid_submission("visitor@example.com"), Lang::En)
        .await;
    assert!(outcome.success);
}

#[tokio::test]
async fn test_fourth_submission_is_rate_limited() {
    let transport = RecordingTransport::accepting();
    let service = ContactService::from_config(&configured(), transport.clone()).unwrap();

    for i in 0..3 {
        let outcome = service
            .submit(&valid_submission("visitor@example.com"), Lang::En)
            .await;
        assert!(outcome.success, "Submission {} should be sent", i + 1);
    }

    // Same sender, different spelling
    let outcome = service
        .submit(&valid_submission("  Visitor@Example.COM "), Lang::En)
        .await;

    assert!(!outcome.success);
    assert!(matches!(outcome.kind, OutcomeKind::RateLimited { .. }));
    let errors = outcome.errors.unwrap();
    assert_eq!(
        errors[&Field::Form],
        vec!["Too many requests. Please try again in 15 minutes."]
    );
    assert_eq!(transport.calls(), 3);
    assert_eq!(service.metrics().count("rate_limited"), 1);

    // Another sender is unaffected
    let outcome = service
        .submit(&valid_submission("someone.else@example.com"), Lang::En)
        .await;
    assert!(outcome.success);
}

#[tokio::test]
async fn test_missing_api_key_is_reported_without_dispatch() {
    let transport = RecordingTransport::accepting();
    let service = ContactService::from_config(&unconfigured(), transport.clone()).unwrap();

    let outcome = service
        .submit(&valid_submission("visitor@example.com"), Lang::En)
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.kind, OutcomeKind::Unavailable);
    assert_eq!(
        outcome.errors.unwrap()[&Field::Form],
        vec!["The contact service is currently unavailable. Please try again later."]
    );
    assert_eq!(transport.calls(), 0);
    assert_eq!(service.metrics().count("not_configured"), 1);
}

#[tokio::test]
async fn test_provider_rejection_is_a_delivery_failure() {
    let transport = RecordingTransport::rejecting(422, "Invalid `to` field");
    let service = ContactService::from_config(&configured(), transport.clone()).unwrap();

    let outcome = service
        .submit(&valid_submission("visitor@example.com"), Lang::En)
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.kind, OutcomeKind::Unavailable);
    assert_eq!(
        outcome.errors.unwrap()[&Field::Form],
        vec!["Failed to send email. Please try again later."]
    );
    assert_eq!(transport.calls(), 1);
    assert_eq!(service.metrics().count("delivery_failed"), 1);
}

#[tokio::test]
async fn test_message_line_breaks_survive_into_html() {
    let transport = RecordingTransport::accepting();
    let service = ContactService::from_config(&configured(), transport.clone()).unwrap();

    let outcome = service
        .submit(
            &ContactSubmission::new("Erik Baer", "visitor@example.com", "Line 1\nLine 2\r\nLine 3"),
            Lang::En,
        )
        .await;
    assert!(outcome.success);

    let sent = transport.sent();
    assert!(sent[0].html.contains("Line 1<br>Line 2<br>Line 3"));
    assert!(sent[0].text.contains("Line 1\nLine 2\r\nLine 3"));
}

#[tokio::test]
async fn test_markup_in_submission_is_escaped() {
    let transport = RecordingTransport::accepting();
    let service = ContactService::from_config(&configured(), transport.clone()).unwrap();

    let outcome = service
        .submit(
            &ContactSubmission::new(
                "O'Brien",
                "visitor@example.com",
                "<script>alert('hi')</script> hello there",
            ),
            Lang::En,
        )
        .await;
    assert!(outcome.success);

    let sent = transport.sent();
    assert_eq!(sent[0].subject, "Contact request from O&#39;Brien");
    assert!(!sent[0].html.contains("<script>"));
    assert!(sent[0].html.contains("&lt;script&gt;"));
}

#[tokio::test]
async fn test_german_visitor_gets_german_messages() {
    let transport = RecordingTransport::accepting();
    let service = ContactService::from_config(&configured(), transport.clone()).unwrap();

    let outcome = service
        .submit(&valid_submission("besucher@example.de"), Lang::De)
        .await;
    assert_eq!(outcome.message.as_deref(), Some("Nachricht erfolgreich gesendet!"));

    let outcome = service
        .submit(&ContactSubmission::new("Erik Baer", "nope", "Hallo, ich habe eine Frage."), Lang::De)
        .await;
    assert_eq!(
        outcome.errors.unwrap()[&Field::Email],
        vec!["Ungültige E-Mail-Adresse"]
    );
}

#[tokio::test]
async fn test_window_reopens_after_it_expires() {
    let config = configured();
    let clock = ManualClock::default();
    let limiter = Arc::new(RateLimiter::new(
        RateLimitConfig {
            max_requests: 1,
            window_secs: 60,
            ..Default::default()
        },
        Arc::new(MemoryStore::new()),
        Arc::new(clock.clone()),
    ));
    let transport = RecordingTransport::accepting();
    let service = ContactService::new(
        ContactValidator::new(config.validation.clone()).unwrap(),
        limiter,
        EmailDispatcher::new(config.mail.clone(), transport.clone()),
        ContactMetrics::new().unwrap(),
    );
    let submission = valid_submission("visitor@example.com");

    assert!(service.submit(&submission, Lang::En).await.success);

    let outcome = service.submit(&submission, Lang::En).await;
    assert_eq!(
        outcome.kind,
        OutcomeKind::RateLimited {
            retry_after: Duration::from_secs(60)
        }
    );
    assert_eq!(
        outcome.errors.unwrap()[&Field::Form],
        vec!["Too many requests. Please try again in 1 minute."]
    );

    clock.advance(Duration::from_secs(60));
    assert!(service.submit(&submission, Lang::En).await.success);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_line_breaks_in_name_never_reach_the_subject() {
    let transport = RecordingTransport::accepting();
    let service = ContactService::from_config(&configured(), transport.clone()).unwrap();

    let outcome = service
        .submit(
            &ContactSubmission::new(
                "Erik\r\nBcc: evil@example.com",
                "visitor@example.com",
                "Hello, a normal message.",
            ),
            Lang::En,
        )
        .await;

    assert_eq!(outcome.kind, OutcomeKind::Invalid);
    assert!(outcome.errors.unwrap().contains_key(&Field::Name));
    assert_eq!(transport.calls(), 0);
}
