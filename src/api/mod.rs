pub mod middleware;
pub mod routes;

// Re-export public types and functions
pub use middleware::{CorsPolicy, cors_headers, log_request_errors};
pub use routes::{DownloadRequest, ErrorResponse};
