//! Inbound HTTP surface: one merge endpoint and a health probe.

use crate::domain::request::{parse_video_urls, ValidationError};
use crate::error::PipelineError;
use crate::ports::merge::{MergePort, MergeResult};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    /// `None` when storage credentials could not be loaded at startup.
    pub merger: Option<Arc<dyn MergePort>>,
    pub max_urls: usize,
    pub config_error: Option<String>,
}

impl AppState {
    pub fn ready(merger: Arc<dyn MergePort>, max_urls: usize) -> Self {
        Self {
            merger: Some(merger),
            max_urls,
            config_error: None,
        }
    }

    pub fn misconfigured(reason: impl Into<String>, max_urls: usize) -> Self {
        Self {
            merger: None,
            max_urls,
            config_error: Some(reason.into()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/merge-videos", post(merge_videos))
        .route("/health", get(health))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

#[derive(Serialize)]
struct MergeResponse {
    success: bool,
    #[serde(flatten)]
    result: MergeResult,
}

async fn merge_videos(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<MergeResponse>, ApiError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ValidationError::BodyTooLarge {
                max: MAX_BODY_BYTES,
            }
        } else {
            ValidationError::MalformedBody(rejection.body_text())
        }
    })?;
    let body: Value = serde_json::from_slice(&body)
        .map_err(|e| ValidationError::MalformedBody(e.to_string()))?;
    let urls = parse_video_urls(&body, state.max_urls)?;

    let merger = state.merger.as_ref().ok_or_else(|| {
        PipelineError::Configuration(
            state
                .config_error
                .clone()
                .unwrap_or_else(|| "storage is not configured".to_string()),
        )
    })?;

    let result = merger.merge(urls).await?;
    Ok(Json(MergeResponse {
        success: true,
        result,
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now() }))
}

/// Maps a pipeline failure to `{ error, message }` with a 4xx or 500 status.
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            warn!(error = %self.0, "Rejected merge request");
            match &self.0 {
                PipelineError::Validation(ValidationError::BodyTooLarge { .. }) => {
                    StatusCode::PAYLOAD_TOO_LARGE
                }
                _ => StatusCode::BAD_REQUEST,
            }
        } else {
            error!(error = %self.0, category = self.0.category(), "Merge request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = json!({
            "error": self.0.category(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::ProcessingReport;
    use crate::domain::tiers::DeliveryStrategy;
    use crate::error::FetchError;
    use crate::ports::merge::MockMergePort;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn result(count: usize) -> MergeResult {
        MergeResult {
            video_url: "https://cdn.test/merged_abc.mp4".into(),
            public_id: "merged-videos/merged_abc".into(),
            videos_processed: count,
            file_size: 2048,
            processing: ProcessingReport::untouched(2048),
            upload_type: DeliveryStrategy::Direct,
            timestamp: Utc::now(),
        }
    }

    fn app(merger: MockMergePort) -> Router {
        router(AppState::ready(Arc::new(merger), 10))
    }

    async fn post_json(app: Router, body: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::post("/api/merge-videos")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_merge_success_shape() {
        let mut merger = MockMergePort::new();
        merger
            .expect_merge()
            .withf(|urls| urls.len() == 2 && urls[0].ends_with("/1.mp4"))
            .times(1)
            .returning(|urls| Ok(result(urls.len())));

        let (status, body) = post_json(
            app(merger),
            r#"{"videoUrls":["https://a.test/1.mp4","https://a.test/2.mp4"]}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["videosProcessed"], 2);
        assert_eq!(body["uploadType"], "direct");
        assert_eq!(body["publicId"], "merged-videos/merged_abc");
        assert_eq!(body["processing"]["applied"], false);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_validation_errors_are_400_without_merging() {
        for payload in [
            r#"{"videoUrls":[]}"#,
            r#"{"videoUrls":"https://a.test/1.mp4"}"#,
            r#"{"other":1}"#,
            r#"not json"#,
        ] {
            let mut merger = MockMergePort::new();
            merger.expect_merge().never();

            let (status, body) = post_json(app(merger), payload).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "payload {}", payload);
            assert_eq!(body["error"], "Validation error");
        }
    }

    #[tokio::test]
    async fn test_more_than_ten_urls_rejected() {
        let urls: Vec<String> = (0..11).map(|i| format!("https://a.test/{}.mp4", i)).collect();
        let payload = json!({ "videoUrls": urls }).to_string();
        let mut merger = MockMergePort::new();
        merger.expect_merge().never();

        let (status, body) = post_json(app(merger), &payload).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("at most 10"));
    }

    #[tokio::test]
    async fn test_oversized_body_gets_structured_413() {
        let urls: Vec<String> = (0..40_000)
            .map(|i| format!("https://a.test/{}.mp4", i))
            .collect();
        let payload = json!({ "videoUrls": urls }).to_string();
        assert!(payload.len() > MAX_BODY_BYTES);
        let mut merger = MockMergePort::new();
        merger.expect_merge().never();

        let (status, body) = post_json(app(merger), &payload).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "Validation error");
        assert!(body["message"].as_str().unwrap().contains("exceeds"));
    }

    #[tokio::test]
    async fn test_pipeline_failure_is_500() {
        let mut merger = MockMergePort::new();
        merger.expect_merge().returning(|_| {
            Err(PipelineError::Fetch(FetchError::Status {
                url: "https://a.test/1.mp4".into(),
                status: 404,
            }))
        });

        let (status, body) =
            post_json(app(merger), r#"{"videoUrls":["https://a.test/1.mp4"]}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Download failed");
        assert!(body["message"].as_str().unwrap().contains("404"));
    }

    #[tokio::test]
    async fn test_missing_configuration_is_500() {
        let app = router(AppState::misconfigured(
            "missing storage credentials: CLOUD_NAME",
            10,
        ));

        let (status, body) = post_json(app, r#"{"videoUrls":["https://a.test/1.mp4"]}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Configuration error");
        assert!(body["message"].as_str().unwrap().contains("CLOUD_NAME"));
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(MockMergePort::new())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
    }
}
