//! Probe endpoints: banner, health check, vitals and the delayed-response
//! test route.

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::http::server::AppState;

/// Application banner returned from `/`.
#[derive(Serialize)]
pub struct AppBanner {
    pub app_name: String,
    pub version: &'static str,
    pub environment: String,
}

/// Process snapshot returned from `/vitals`.
#[derive(Serialize)]
pub struct SystemVitals {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime: String,
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub environment: String,
}

fn powered_by(state: &AppState, mut response: Response) -> Response {
    let value = state.config.app.name.to_uppercase();
    if let Ok(value) = HeaderValue::from_str(&value) {
        response.headers_mut().insert("x-powered-by", value);
    }
    response
}

/// `GET /` — application banner.
pub async fn root(State(state): State<AppState>) -> Response {
    let banner = AppBanner {
        app_name: state.config.app.name.to_uppercase(),
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.app.environment.to_uppercase(),
    };
    powered_by(&state, Json(banner).into_response())
}

/// `GET /health-check` — liveness probe.
pub async fn health_check(State(state): State<AppState>) -> Response {
    powered_by(&state, "OK".into_response())
}

/// `GET /long-response` — intentionally delayed response for client
/// timeout testing.
pub async fn long_response(State(state): State<AppState>) -> Response {
    let delay = Duration::from_secs(state.config.http.long_response_delay_secs);
    tokio::time::sleep(delay).await;
    powered_by(&state, "Finally! OK".into_response())
}

/// `GET /vitals` — process statistics.
pub async fn vitals(State(state): State<AppState>) -> Response {
    let uptime = state.started_at.elapsed();
    let vitals = SystemVitals {
        status: "operational",
        version: env!("CARGO_PKG_VERSION"),
        uptime: format_uptime(uptime.as_secs()),
        uptime_seconds: uptime.as_secs(),
        total_requests: state.request_count.load(Ordering::Relaxed),
        environment: state.config.app.environment.clone(),
    };
    powered_by(&state, Json(vitals).into_response())
}

/// Render seconds as `N days, N hours, N minutes, N seconds`, skipping
/// leading zero units.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / (3600 * 24);
    let hours = (seconds % (3600 * 24)) / 3600;
    let minutes = (seconds % 3600) / 60;
    let remainder = seconds % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days} day{}", if days > 1 { "s" } else { "" }));
    }
    if hours > 0 {
        parts.push(format!("{hours} hour{}", if hours > 1 { "s" } else { "" }));
    }
    if minutes > 0 {
        parts.push(format!("{minutes} minute{}", if minutes > 1 { "s" } else { "" }));
    }
    parts.push(format!(
        "{remainder} second{}",
        if remainder == 1 { "" } else { "s" }
    ));
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(0), "0 seconds");
        assert_eq!(format_uptime(1), "1 second");
        assert_eq!(format_uptime(61), "1 minute, 1 second");
        assert_eq!(format_uptime(3600), "1 hour, 0 seconds");
        assert_eq!(
            format_uptime(2 * 86_400 + 3 * 3600 + 4 * 60 + 5),
            "2 days, 3 hours, 4 minutes, 5 seconds"
        );
    }
}
