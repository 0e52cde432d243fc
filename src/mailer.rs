// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact email composition and dispatch.
//!
//! [`EmailDispatcher`] turns a validated submission into an [`Envelope`] and
//! hands it to a [`MailTransport`]. The production transport is
//! [`ResendTransport`]; tests substitute their own.

use crate::config::MailConfig;
use crate::error::{DispatchError, Result, TransportError};
use crate::validator::ValidatedSubmission;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One outgoing message, in the provider's field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    pub from: String,
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Provider acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub message_id: Option<String>,
}

/// Something that can deliver an [`Envelope`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(
        &self,
        api_key: &str,
        envelope: &Envelope,
    ) -> std::result::Result<DeliveryReceipt, TransportError>;
}

/// Resend-compatible HTTP transport (`POST {base}/emails`).
pub struct ResendTransport {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ResendTransport {
    /// Create a transport for the given API root.
    ///
    /// `timeout` bounds each request; the dispatcher's caller may impose a
    /// tighter overall deadline.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl MailTransport for ResendTransport {
    async fn send(
        &self,
        api_key: &str,
        envelope: &Envelope,
    ) -> std::result::Result<DeliveryReceipt, TransportError> {
        let endpoint = format!("{}/emails", self.base_url.trim_end_matches('/'));
        let url = reqwest::Url::parse(&endpoint).map_err(|err| {
            TransportError::Transport(format!("invalid endpoint {endpoint}: {err}"))
        })?;

        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(envelope)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            // Any 2xx is a delivery; the id is best effort
            let message_id = response
                .json::<SendResponse>()
                .await
                .ok()
                .and_then(|body| body.id);
            if message_id.is_none() {
                warn!(status = status.as_u16(), "Provider accepted message without an id");
            }
            Ok(DeliveryReceipt { message_id })
        } else {
            let body: ErrorResponse = response.json().await.unwrap_or_default();
            Err(TransportError::Rejected {
                status: status.as_u16(),
                name: body.name.unwrap_or_else(|| "unknown_error".to_string()),
                message: body
                    .message
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string()),
            })
        }
    }
}

/// Builds contact emails and sends them through a transport.
pub struct EmailDispatcher {
    config: MailConfig,
    transport: Arc<dyn MailTransport>,
}

impl EmailDispatcher {
    pub fn new(config: MailConfig, transport: Arc<dyn MailTransport>) -> Self {
        Self { config, transport }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Deadline the orchestrator applies to one [`send`](Self::send).
    pub fn timeout(&self) -> Duration {
        self.config.dispatch_timeout()
    }

    /// Build the outgoing message for a submission.
    ///
    /// Visitor text is HTML-escaped in the subject and HTML body; the
    /// plain-text body carries it verbatim.
    pub fn compose(&self, submission: &ValidatedSubmission) -> Envelope {
        let name = escape_html(submission.name());
        let email = escape_html(submission.email());
        let message = escape_html(&submission.message().replace("\r\n", "\n")).replace('\n', "<br>");

        Envelope {
            from: self.config.from_address.clone(),
            to: self.config.to_address.clone(),
            reply_to: submission.email().to_string(),
            subject: format!("Contact request from {name}"),
            html: format!(
                "<h2>New Contact Request</h2>\n\
                 <p><strong>Name:</strong> {name}</p>\n\
                 <p><strong>Email:</strong> {email}</p>\n\
                 <p><strong>Message:</strong></p>\n\
                 <p>{message}</p>\n"
            ),
            text: format!(
                "New Contact Request\nName: {}\nEmail: {}\nMessage:\n{}\n",
                submission.name(),
                submission.email(),
                submission.message()
            ),
        }
    }

    /// Send a submission to the configured recipient.
    ///
    /// Without an API key this fails with [`DispatchError::NotConfigured`]
    /// and never reaches the transport.
    pub async fn send(&self, submission: &ValidatedSubmission) -> Result<DeliveryReceipt> {
        let Some(api_key) = self.config.api_key() else {
            return Err(DispatchError::NotConfigured);
        };

        let envelope = self.compose(submission);
        debug!(to = %envelope.to, "Dispatching contact email");

        let receipt = self.transport.send(api_key, &envelope).await?;
        info!(message_id = ?receipt.message_id, "Contact email accepted by provider");
        Ok(receipt)
    }
}

/// Escape text for interpolation into HTML element content or attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use crate::i18n::Lang;
    use crate::validator::{ContactSubmission, ContactValidator};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    struct CountingTransport {
        calls: AtomicUsize,
        reply: fn() -> std::result::Result<DeliveryReceipt, TransportError>,
    }

    impl CountingTransport {
        fn new(reply: fn() -> std::result::Result<DeliveryReceipt, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reply,
            })
        }
    }

    #[async_trait]
    impl MailTransport for CountingTransport {
        async fn send(
            &self,
            _api_key: &str,
            _envelope: &Envelope,
        ) -> std::result::Result<DeliveryReceipt, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)()
        }
    }

    fn configured() -> MailConfig {
        MailConfig {
            api_key: Some("re_test".to_string()),
            ..Default::default()
        }
    }

    fn validated(name: &str, email: &str, message: &str) -> ValidatedSubmission {
        ContactValidator::new(ValidationConfig::default())
            .unwrap()
            .validate(&ContactSubmission::new(name, email, message), Lang::En)
            .into_valid()
            .expect("fixture must be valid")
    }

    #[test]
    fn test_compose_uses_config_and_reply_to() {
        let transport = CountingTransport::new(|| Ok(DeliveryReceipt::default()));
        let dispatcher = EmailDispatcher::new(configured(), transport);
        let envelope = dispatcher.compose(&validated(
            "Erik Baer",
            "Erik@Example.com",
            "This is a valid test message",
        ));

        assert_eq!(envelope.from, "Portfolio <onboarding@resend.dev>");
        assert_eq!(envelope.to, "your-email@example.com");
        assert_eq!(envelope.reply_to, "erik@example.com");
        assert_eq!(envelope.subject, "Contact request from Erik Baer");
        assert!(envelope.text.contains("Message:\nThis is a valid test message"));
    }

    #[test]
    fn test_newlines_become_line_breaks() {
        let dispatcher = EmailDispatcher::new(
            configured(),
            CountingTransport::new(|| Ok(DeliveryReceipt::default())),
        );
        let envelope =
            dispatcher.compose(&validated("Erik", "erik@example.com", "Line 1\nLine 2\nLine 3"));
        assert!(envelope.html.contains("Line 1<br>Line 2<br>Line 3"));
        assert!(envelope.text.contains("Line 1\nLine 2\nLine 3"));

        let envelope =
            dispatcher.compose(&validated("Erik", "erik@example.com", "Line 1\r\nLine 2 ok"));
        assert!(envelope.html.contains("Line 1<br>Line 2 ok"));
    }

    #[test]
    fn test_markup_is_escaped() {
        let dispatcher = EmailDispatcher::new(
            configured(),
            CountingTransport::new(|| Ok(DeliveryReceipt::default())),
        );
        let envelope = dispatcher.compose(&validated(
            "O'Neil",
            "o'neil@example.com",
            "<b>hello</b> & \"goodbye\" friend",
        ));
        assert_eq!(envelope.subject, "Contact request from O&#39;Neil");
        assert!(envelope
            .html
            .contains("&lt;b&gt;hello&lt;/b&gt; &amp; &quot;goodbye&quot; friend"));
        assert!(!envelope.html.contains("<b>hello"));
        assert!(envelope.text.contains("<b>hello</b>"));
    }

    #[tokio::test]
    async fn test_unconfigured_dispatch_never_calls_transport() {
        let transport = CountingTransport::new(|| Ok(DeliveryReceipt::default()));
        let dispatcher = EmailDispatcher::new(MailConfig::default(), transport.clone());

        let err = assert_err!(
            dispatcher
                .send(&validated("Erik", "erik@example.com", "This is a valid test message"))
                .await
        );
        assert!(matches!(err, DispatchError::NotConfigured));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dispatch_results_are_classified() {
        let submission = validated("Erik", "erik@example.com", "This is a valid test message");

        let ok = CountingTransport::new(|| {
            Ok(DeliveryReceipt {
                message_id: Some("123".to_string()),
            })
        });
        let receipt = assert_ok!(EmailDispatcher::new(configured(), ok).send(&submission).await);
        assert_eq!(receipt.message_id.as_deref(), Some("123"));

        let rejected = CountingTransport::new(|| {
            Err(TransportError::Rejected {
                status: 403,
                name: "validation_error".to_string(),
                message: "domain not verified".to_string(),
            })
        });
        let err = assert_err!(EmailDispatcher::new(configured(), rejected).send(&submission).await);
        assert!(matches!(err, DispatchError::Delivery(_)));

        let broken = CountingTransport::new(|| {
            Err(TransportError::Transport("connection refused".to_string()))
        });
        let err = assert_err!(EmailDispatcher::new(configured(), broken).send(&submission).await);
        assert!(matches!(err, DispatchError::Unexpected(_)));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a & b < c > d"), "a &amp; b &lt; c &gt; d");
        assert_eq!(escape_html("\"'"), "&quot;&#39;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_envelope_serializes_provider_fields() {
        let envelope = Envelope {
            from: "a@example.com".to_string(),
            to: "b@example.com".to_string(),
            reply_to: "c@example.com".to_string(),
            subject: "s".to_string(),
            html: "<p>h</p>".to_string(),
            text: "t".to_string(),
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["reply_to"], "c@example.com");
        assert_eq!(json["html"], "<p>h</p>");
    }
}
