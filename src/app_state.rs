use crate::Config;
use crate::extractor::{Extractor, MetadataSource, YtDlp};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub extractor: Extractor,
}

impl AppState {
    pub fn new(source: Arc<dyn MetadataSource>, extract_timeout: Duration) -> Self {
        Self {
            extractor: Extractor::new(source, extract_timeout),
        }
    }

    /// Build state backed by `yt-dlp`, checking once that the binary runs.
    ///
    /// A missing binary does not stop the server; requests then answer
    /// "service unavailable".
    pub async fn from_config(config: &Config) -> Self {
        let ytdlp = YtDlp::new(config.ytdlp_options());

        match ytdlp.probe().await {
            Some(version) => info!(
                %version,
                timeout_secs = config.extract_timeout,
                authenticated = config.credentials().is_some(),
                "Extractor ready"
            ),
            None => warn!(
                bin = %config.extractor_bin,
                "Extractor unavailable, extraction requests will fail"
            ),
        }

        Self::new(Arc::new(ytdlp), config.extract_timeout())
    }
}
