// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact relay.
//!
//! `POST /api/contact` takes JSON from the site's client-side form;
//! `POST /contact` takes the same fields form-encoded, for the server-rendered
//! form action. Both answer with the submission outcome as JSON.

use crate::config::Config;
use crate::contact::{ContactService, OutcomeKind, SubmissionOutcome};
use crate::i18n::Lang;
use crate::validator::ContactSubmission;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

/// Cookie the site uses to remember the visitor's language.
pub const LOCALE_COOKIE: &str = "NEXT_LOCALE";

/// Shared application state.
pub struct AppState {
    pub service: ContactService,
    pub config: Config,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub mail_configured: bool,
}

/// Optional `?locale=` override.
#[derive(Debug, Default, Deserialize)]
pub struct LocaleQuery {
    #[serde(default)]
    pub locale: Option<String>,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/api/contact", post(submit_json))
        .route("/contact", post(submit_form));

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    let origins: Vec<HeaderValue> = state
        .config
        .cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT_LANGUAGE]);

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        mail_configured: state.config.mail.is_configured(),
    })
}

/// Prometheus exposition endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.service.metrics().render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// JSON contact endpoint.
pub async fn submit_json(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LocaleQuery>,
    headers: HeaderMap,
    Json(input): Json<ContactSubmission>,
) -> Response {
    let lang = resolve_lang(query.locale.as_deref(), &headers);
    respond(state.service.submit(&input, lang).await)
}

/// Form-encoded contact endpoint.
pub async fn submit_form(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LocaleQuery>,
    headers: HeaderMap,
    Form(input): Form<ContactSubmission>,
) -> Response {
    let lang = resolve_lang(query.locale.as_deref(), &headers);
    respond(state.service.submit(&input, lang).await)
}

/// Map an outcome onto a status code and JSON body.
fn respond(outcome: SubmissionOutcome) -> Response {
    let kind = outcome.kind;
    match kind {
        OutcomeKind::Sent => (StatusCode::OK, Json(outcome)).into_response(),
        OutcomeKind::Invalid => (StatusCode::BAD_REQUEST, Json(outcome)).into_response(),
        OutcomeKind::RateLimited { retry_after } => {
            let retry_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_secs.to_string())],
                Json(outcome),
            )
                .into_response()
        }
        OutcomeKind::Unavailable => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(outcome)).into_response()
        }
    }
}

/// Pick the response language: `?locale=`, then the locale cookie, then
/// `Accept-Language`, then English.
pub fn resolve_lang(query: Option<&str>, headers: &HeaderMap) -> Lang {
    if let Some(lang) = query.and_then(Lang::from_code) {
        return lang;
    }

    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == LOCALE_COOKIE)
        .and_then(|(_, value)| Lang::from_code(value));
    if let Some(lang) = from_cookie {
        return lang;
    }

    let lang = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(Lang::from_accept_language)
        .unwrap_or_default();
    debug!(%lang, "Resolved response language");
    lang
}
