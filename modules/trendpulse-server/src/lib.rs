//! HTTP trigger surface for the snapshot pipeline.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use trendpulse_common::Config;
use trendpulse_pipeline::Pipeline;
use trendpulse_store::Store;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Store,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/pipeline/run", post(run_pipeline))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"ok": true}))
}

/// Run one snapshot synchronously. When `CRON_SECRET` is configured the
/// caller must present it as a bearer token.
async fn run_pipeline(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(secret) = &state.config.cron_secret {
        if !bearer_matches(&headers, secret) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "unauthorized"})),
            )
                .into_response();
        }
    }

    info!("pipeline trigger accepted");
    let pipeline = Pipeline::live(state.config.clone(), state.store.clone());
    match pipeline.run().await {
        Ok(stats) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "ok": true,
                "snapshotId": stats.snapshot_id,
                "keywordCount": stats.keyword_count,
                "reusedCount": stats.reused_count,
                "newCount": stats.new_count,
                "durationMs": stats.elapsed_ms,
            })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "pipeline run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "pipeline run failed",
                    "detail": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

fn bearer_matches(headers: &HeaderMap, secret: &str) -> bool {
    let Some(auth) = headers.get(header::AUTHORIZATION) else {
        return false;
    };
    let Ok(auth) = auth.to_str() else {
        return false;
    };
    auth.strip_prefix("Bearer ")
        .is_some_and(|token| token == secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_must_match_exactly() {
        assert!(bearer_matches(&headers_with("Bearer s3cret"), "s3cret"));
        assert!(!bearer_matches(&headers_with("Bearer wrong"), "s3cret"));
        assert!(!bearer_matches(&headers_with("Basic s3cret"), "s3cret"));
        assert!(!bearer_matches(&HeaderMap::new(), "s3cret"));
    }
}
