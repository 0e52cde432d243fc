// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Portfolio Contact Relay Service
//!
//! Accepts contact form posts from the portfolio site, validates and
//! rate-limits them, and relays them through the email provider.
//!
//! ## Configuration
//!
//! Read from the environment (a `.env` file is honoured):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `RESEND_API_KEY`: Email provider key (required for delivery)
//! - `RESEND_FROM_EMAIL`: Sender (default: Portfolio <onboarding@resend.dev>)
//! - `CONTACT_EMAIL`: Recipient (default: your-email@example.com)
//! - `CONTACT_RATE_LIMIT_MAX`: Submissions per window per sender (default: 3)
//! - `CONTACT_RATE_LIMIT_WINDOW_SECS`: Window length (default: 900)
//!
//! See `Config::from_lookup` for the full list.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use portfolio_contact::{
    config::Config,
    contact::ContactService,
    handlers::{router, AppState},
    mailer::ResendTransport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before the subscriber, so RUST_LOG may come from .env
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_lookup(|key| std::env::var(key).ok())?;
    info!(
        bind_addr = %config.bind_addr,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        mail_configured = config.mail.is_configured(),
        "Starting contact relay"
    );
    if !config.mail.is_configured() {
        warn!("RESEND_API_KEY is not set; contact submissions will be refused");
    }

    let transport = Arc::new(ResendTransport::new(
        config.mail.api_base_url.clone(),
        config.mail.dispatch_timeout(),
    )?);
    let service = ContactService::from_config(&config, transport)?;

    // Sweep expired windows even when no submissions arrive
    let limiter = service.limiter().clone();
    let sweep_every = config.rate_limit.sweep_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            let removed = limiter.sweep_expired().await;
            if removed > 0 {
                info!(removed, "Swept expired rate limit windows");
            }
        }
    });

    let addr: SocketAddr = config.bind_addr.parse()?;
    let state = Arc::new(AppState { service, config });
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
