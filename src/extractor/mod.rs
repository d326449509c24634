mod error;
mod ytdlp;

pub use error::{ExtractionError, SourceError};
pub use ytdlp::{Credentials, DEFAULT_BIN, DEFAULT_FORMAT, YtDlp, YtDlpOptions};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_TITLE: &str = "Unknown";

/// An opaque capability that turns a URL into a raw metadata record
/// without downloading the media itself.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` means the source ran but had nothing to report.
    async fn fetch(&self, url: &str) -> Result<Option<Value>, SourceError>;
}

/// Normalized metadata returned to clients.
///
/// Field names on the wire follow the raw extractor record (`url`,
/// `webpage_url`), everything else the extractor reports is dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    #[serde(rename = "url")]
    pub media_url: String,
    pub thumbnail: String,
    pub duration: Number,
    #[serde(rename = "webpage_url")]
    pub source_url: String,
}

impl VideoMetadata {
    /// Project the whitelisted fields of a raw record, defaulting anything
    /// missing, null or of the wrong type.
    pub fn from_record(record: &Map<String, Value>, requested_url: &str) -> Self {
        let text = |key: &str| record.get(key).and_then(Value::as_str);

        let duration = match record.get("duration") {
            Some(Value::Number(duration)) => duration.clone(),
            _ => Number::from(0),
        };

        Self {
            title: text("title").unwrap_or(DEFAULT_TITLE).to_string(),
            media_url: text("url").unwrap_or_default().to_string(),
            thumbnail: text("thumbnail").unwrap_or_default().to_string(),
            duration,
            source_url: text("webpage_url").unwrap_or(requested_url).to_string(),
        }
    }
}

/// Validates requests, bounds the call into the [`MetadataSource`] and
/// classifies its outcome.
#[derive(Clone)]
pub struct Extractor {
    source: Arc<dyn MetadataSource>,
    timeout: Duration,
}

impl Extractor {
    pub fn new(source: Arc<dyn MetadataSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub async fn extract(&self, url: &str) -> Result<VideoMetadata, ExtractionError> {
        let url = url.trim();
        if url.is_empty() {
            warn!("Rejected extraction without URL");
            return Err(ExtractionError::InvalidInput);
        }

        info!(%url, source = self.source.name(), "Extracting video metadata");

        let fetched = match tokio::time::timeout(self.timeout, self.source.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Failed(format!(
                "extraction timed out after {:?}",
                self.timeout
            ))),
        };

        let outcome = match fetched {
            Ok(Some(Value::Object(record))) if !record.is_empty() => {
                Ok(VideoMetadata::from_record(&record, url))
            }
            Ok(None) | Ok(Some(Value::Null)) | Ok(Some(Value::Object(_))) => {
                Err(ExtractionError::NotFound)
            }
            Ok(Some(other)) => Err(ExtractionError::ExtractionFailed(format!(
                "unexpected extractor output of type {}",
                json_type(&other)
            ))),
            Err(error) => Err(error.into()),
        };

        match &outcome {
            Ok(metadata) => info!(%url, title = %metadata.title, "Extracted video metadata"),
            Err(ExtractionError::ExtractionFailed(message)) => {
                error!(%url, %message, "Video metadata extraction failed")
            }
            Err(error) => warn!(%url, %error, "Video metadata extraction failed"),
        }

        outcome
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
