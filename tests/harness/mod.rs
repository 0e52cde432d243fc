// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Shared fixtures for the contact relay integration tests.
//!
//! [`RecordingTransport`] stands in for the email provider: it keeps every
//! envelope it is handed and answers with a canned reply.

#![allow(dead_code)]

use async_trait::async_trait;
use portfolio_contact::{
    config::Config,
    error::TransportError,
    mailer::{DeliveryReceipt, Envelope, MailTransport},
    validator::ContactSubmission,
};
use std::sync::{Arc, Mutex};

/// Canned provider behaviour.
#[derive(Debug, Clone)]
pub enum Reply {
    Accept,
    Reject { status: u16, message: String },
}

/// Fake provider that records what it was asked to send.
#[derive(Debug)]
pub struct RecordingTransport {
    reply: Reply,
    sent: Mutex<Vec<Envelope>>,
}

impl RecordingTransport {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            reply: Reply::Accept,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn rejecting(status: u16, message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Reply::Reject {
                status,
                message: message.to_string(),
            },
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(
        &self,
        _api_key: &str,
        envelope: &Envelope,
    ) -> Result<DeliveryReceipt, TransportError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(envelope.clone());
        match &self.reply {
            Reply::Accept => Ok(DeliveryReceipt {
                message_id: Some(format!("msg_{}", sent.len())),
            }),
            Reply::Reject { status, message } => Err(TransportError::Rejected {
                status: *status,
                name: "validation_error".to_string(),
                message: message.clone(),
            }),
        }
    }
}

/// Default configuration with an API key present.
pub fn configured() -> Config {
    let mut config = Config::default();
    config.mail.api_key = Some("re_test_key".to_string());
    config.mail.to_address = "owner@example.com".to_string();
    config
}

/// Default configuration with no API key.
pub fn unconfigured() -> Config {
    let mut config = Config::default();
    config.mail.api_key = None;
    config
}

/// A submission that passes every validation rule.
pub fn valid_submission(email: &str) -> ContactSubmission {
    ContactSubmission::new(
        "Erik Baer",
        email,
        "Hello, I would like to talk about a project.",
    )
}
