use crate::AppState;
use crate::extractor::ExtractionError;
use axum::extract::Extension;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const ENDPOINTS: [&str; 3] = ["/", "/health", "/download/twitter"];

#[derive(Serialize, Deserialize)]
pub struct DownloadRequest {
    // missing and null both read as empty
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) status: String,
    pub(crate) version: String,
    pub(crate) extractor: String,
    pub(crate) endpoints: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: String,
    pub(crate) message: String,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct MessageResponse {
    pub(crate) message: String,
}

pub(crate) async fn root(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(RootResponse {
            message: "Video metadata API is running".into(),
            status: "running".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            extractor: state.extractor.source_name().into(),
            endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
        }),
    )
}

pub(crate) async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".into(),
            message: "API is running correctly".into(),
        }),
    )
}

pub(crate) async fn download_options() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(MessageResponse {
            message: "OK".into(),
        }),
    )
}

#[axum::debug_handler]
pub(crate) async fn download_twitter(
    Extension(state): Extension<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let reason = rejection.body_text();
            warn!(%reason, "Rejected download request body");
            return err_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid request body: {reason}"),
            );
        }
    };

    let url = request.url.unwrap_or_default();
    match state.extractor.extract(&url).await {
        Ok(metadata) => (StatusCode::OK, Json(metadata)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn not_found() -> Response {
    err_response(StatusCode::NOT_FOUND, "Not found")
}

pub(crate) async fn method_not_allowed() -> Response {
    err_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

impl IntoResponse for ExtractionError {
    fn into_response(self) -> Response {
        err_response(self.status_code(), self.to_string())
    }
}

pub(crate) fn err_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            status: "error".into(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_into_response() {
        let response = ExtractionError::InvalidInput.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "URL is required", "status": "error"})
        );

        let response = ExtractionError::ExtractionFailed("Unsupported URL".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["error"],
            "Failed to process video: Unsupported URL"
        );
    }

    #[test]
    fn test_download_request_accepts_missing_and_null_url() {
        let request: DownloadRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.url, None);

        let request: DownloadRequest = serde_json::from_str(r#"{"url": null}"#).unwrap();
        assert_eq!(request.url, None);

        assert!(serde_json::from_str::<DownloadRequest>(r#"{"url": 7}"#).is_err());
    }
}
