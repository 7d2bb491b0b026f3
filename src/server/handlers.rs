//! Request handlers: JSON API, browser pages, readiness probe.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{Form, Json};
use chrono::{SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::AppState;
use crate::clock;
use crate::engine::EngineError;

/// Header a test harness may use to pin the reference timestamp.
const TEST_NOW_HEADER: &str = "x-test-now-ms";

/// Reference timestamp for a request: wall clock, unless the server runs in
/// test mode and the request pins a time.
fn request_now_ms(state: &AppState, headers: &HeaderMap) -> i64 {
    if state.test_mode {
        if let Some(pinned) = headers
            .get(TEST_NOW_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i64>().ok())
        {
            return pinned;
        }
    }
    clock::system_now_ms()
}

/// Render an expiry timestamp as ISO-8601 with millisecond precision.
fn expires_at_iso(expires_at: Option<i64>) -> Option<String> {
    expires_at
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Shareable locator for a paste, derived from the request's Host header.
fn share_url(headers: &HeaderMap, id: &str) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}/p/{id}")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Map an engine error to a JSON response. `Unavailable` is deliberately
/// indistinguishable from `NotFound`: the same status and body, so a prober
/// cannot learn whether an id ever existed or how many views it had.
fn error_response(err: &EngineError) -> Response {
    match err {
        EngineError::Validation(msg) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
        }
        EngineError::NotFound | EngineError::Unavailable => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Not found" })),
        )
            .into_response(),
        EngineError::Storage(e) => {
            tracing::error!("storage failure: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}

// =============================================================================
// JSON API
// =============================================================================

/// Body of `POST /api/pastes`.
#[derive(Debug, Deserialize)]
pub struct CreatePasteRequest {
    /// The paste text.
    pub content: String,
    /// Optional time-to-live in seconds.
    pub ttl_seconds: Option<i64>,
    /// Optional view quota.
    pub max_views: Option<i64>,
}

/// Body of a successful `POST /api/pastes`.
#[derive(Debug, Serialize)]
pub struct CreatePasteResponse {
    /// The opaque paste id.
    pub id: String,
    /// Shareable locator.
    pub url: String,
}

/// Body of a successful `GET /api/pastes/:id`.
#[derive(Debug, Serialize)]
pub struct FetchPasteResponse {
    /// The paste text.
    pub content: String,
    /// Views left after this one; null when unlimited.
    pub remaining_views: Option<i64>,
    /// Expiry deadline as ISO-8601; null when the paste has no deadline.
    pub expires_at: Option<String>,
}

pub async fn create_paste(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreatePasteRequest>,
) -> Response {
    let now_ms = request_now_ms(&state, &headers);
    match state
        .engine
        .create(&req.content, req.ttl_seconds, req.max_views, now_ms)
        .await
    {
        Ok(paste) => {
            let url = share_url(&headers, &paste.id);
            (
                StatusCode::CREATED,
                Json(CreatePasteResponse { id: paste.id, url }),
            )
                .into_response()
        }
        Err(err) => error_response(&err),
    }
}

pub async fn fetch_paste(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let now_ms = request_now_ms(&state, &headers);
    match state.engine.read(&id, now_ms).await {
        Ok(receipt) => Json(FetchPasteResponse {
            content: receipt.content,
            remaining_views: receipt.remaining_views,
            expires_at: expires_at_iso(receipt.expires_at),
        })
        .into_response(),
        Err(err) => error_response(&err),
    }
}

pub async fn healthz(State(state): State<Arc<AppState>>) -> Response {
    match state.store.healthcheck().await {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(e) => {
            tracing::warn!("healthcheck failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false })),
            )
                .into_response()
        }
    }
}

// =============================================================================
// Browser pages
// =============================================================================

const HOME_PAGE: &str = r#"<html>
  <body>
    <h2>Create Paste</h2>
    <form method="POST" action="/create">
      <textarea name="content" rows="10" cols="60" required></textarea><br><br>
      TTL (seconds): <input type="number" name="ttl_seconds" min="1"><br><br>
      Max Views: <input type="number" name="max_views" min="1"><br><br>
      <button type="submit">Create Paste</button>
    </form>
  </body>
</html>
"#;

pub async fn home_page() -> Html<&'static str> {
    Html(HOME_PAGE)
}

/// Body of `POST /create` (browser form). Number fields arrive as strings,
/// empty when left blank.
#[derive(Debug, Deserialize)]
pub struct CreateFormRequest {
    /// The paste text.
    pub content: String,
    /// TTL field, raw.
    pub ttl_seconds: Option<String>,
    /// Quota field, raw.
    pub max_views: Option<String>,
}

/// Blank form fields mean "no limit"; non-numeric input becomes 0 so it
/// falls through to engine validation as an invalid value.
fn form_field_to_i64(value: Option<&str>) -> Option<i64> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    Some(value.parse().unwrap_or(0))
}

pub async fn create_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(req): Form<CreateFormRequest>,
) -> Response {
    let now_ms = request_now_ms(&state, &headers);
    let ttl_seconds = form_field_to_i64(req.ttl_seconds.as_deref());
    let max_views = form_field_to_i64(req.max_views.as_deref());

    match state
        .engine
        .create(&req.content, ttl_seconds, max_views, now_ms)
        .await
    {
        Ok(paste) => {
            let url = share_url(&headers, &paste.id);
            Html(format!(
                r#"<html>
  <body>
    <h3>Paste Created</h3>
    <p><b>Shareable URL:</b></p>
    <input type="text" value="{url}" size="70" readonly />
    <p><a href="{url}">Open Paste</a></p>
    <p><a href="/">Create Another Paste</a></p>
  </body>
</html>
"#
            ))
            .into_response()
        }
        Err(EngineError::Validation(msg)) => {
            (StatusCode::BAD_REQUEST, Html(format!("<html><body><p>{msg}</p></body></html>")))
                .into_response()
        }
        Err(err) => error_response(&err),
    }
}

pub async fn view_paste_html(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let now_ms = request_now_ms(&state, &headers);
    match state.engine.read(&id, now_ms).await {
        Ok(receipt) => Html(format!(
            "<html><body><pre>{}</pre></body></html>",
            escape_html(&receipt.content)
        ))
        .into_response(),
        Err(EngineError::Storage(e)) => {
            tracing::error!("storage failure: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
        Err(_) => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn state(test_mode: bool) -> AppState {
        AppState::new(Arc::new(MemoryBackend::new()), test_mode)
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<script>&x</script>"),
            "&lt;script&gt;&amp;x&lt;/script&gt;"
        );
    }

    #[test]
    fn test_expires_at_iso() {
        assert_eq!(
            expires_at_iso(Some(11_000)).as_deref(),
            Some("1970-01-01T00:00:11.000Z")
        );
        assert_eq!(expires_at_iso(None), None);
    }

    #[test]
    fn test_form_field_to_i64() {
        assert_eq!(form_field_to_i64(None), None);
        assert_eq!(form_field_to_i64(Some("")), None);
        assert_eq!(form_field_to_i64(Some("  ")), None);
        assert_eq!(form_field_to_i64(Some("10")), Some(10));
        // Garbage maps to an invalid value, rejected downstream.
        assert_eq!(form_field_to_i64(Some("abc")), Some(0));
    }

    #[test]
    fn test_now_header_ignored_outside_test_mode() {
        let mut headers = HeaderMap::new();
        headers.insert(TEST_NOW_HEADER, "1000".parse().unwrap());

        let pinned = request_now_ms(&state(true), &headers);
        let real = request_now_ms(&state(false), &headers);

        assert_eq!(pinned, 1000);
        assert!(real > 1_577_836_800_000);
    }

    #[test]
    fn test_share_url_uses_host_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "paste.example:8080".parse().unwrap());

        assert_eq!(
            share_url(&headers, "abc123"),
            "http://paste.example:8080/p/abc123"
        );
        assert_eq!(share_url(&HeaderMap::new(), "abc123"), "http://localhost/p/abc123");
    }
}
