use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use tracing::{error, warn};

pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

pub async fn log_request_errors(req: Request<Body>, next: Next) -> Response {
    let uri = req.uri().clone();
    let method = req.method().clone();

    let response = next.run(req).await;
    let status = response.status();
    if status.is_client_error() {
        // 4xx error
        warn!(
            method = %method,
            uri = %uri,
            status = %status,
            "Client error"
        );
    } else if status.is_server_error() {
        // 5xx error
        error!(
            method = %method,
            uri = %uri,
            status = %status,
            "Server error"
        );
    }

    response
}

/// Which origins may read responses
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    // None means any origin
    origins: Option<Arc<[HeaderValue]>>,
}

impl CorsPolicy {
    pub fn any() -> Self {
        Self { origins: None }
    }

    pub fn allow_list(origins: &[String]) -> anyhow::Result<Self> {
        let origins = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin.trim_end_matches('/'))
                    .map_err(|_| anyhow::anyhow!("Invalid origin: {origin}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            origins: Some(origins.into()),
        })
    }

    fn allow_origin(&self, request_origin: Option<&HeaderValue>) -> Option<HeaderValue> {
        match &self.origins {
            None => Some(HeaderValue::from_static("*")),
            Some(origins) => request_origin
                .filter(|origin| origins.contains(origin))
                .cloned(),
        }
    }
}

/// Stamp CORS headers on every response, errors and fallbacks included.
pub async fn cors_headers(
    State(policy): State<CorsPolicy>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let request_origin = req.headers().get(header::ORIGIN).cloned();

    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    if let Some(origin) = policy.allow_origin(request_origin.as_ref()) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    if policy.origins.is_some() {
        headers.append(header::VARY, HeaderValue::from_static("origin"));
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_origin() {
        let policy = CorsPolicy::any();
        assert_eq!(
            policy.allow_origin(None),
            Some(HeaderValue::from_static("*"))
        );
        assert_eq!(
            policy.allow_origin(Some(&HeaderValue::from_static("https://a.example"))),
            Some(HeaderValue::from_static("*"))
        );
    }

    #[test]
    fn test_allow_list_echoes_known_origin() {
        let policy = CorsPolicy::allow_list(&[
            "https://a.example/".to_string(),
            "http://localhost:3000".to_string(),
        ])
        .unwrap();

        let known = HeaderValue::from_static("https://a.example");
        assert_eq!(policy.allow_origin(Some(&known)), Some(known.clone()));
        assert_eq!(
            policy.allow_origin(Some(&HeaderValue::from_static("https://evil.example"))),
            None
        );
        assert_eq!(policy.allow_origin(None), None);
    }

    #[test]
    fn test_allow_list_rejects_invalid_header() {
        assert!(CorsPolicy::allow_list(&["https://a.example\n".to_string()]).is_err());
    }
}
