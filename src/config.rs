use crate::extractor::{Credentials, DEFAULT_BIN, DEFAULT_FORMAT, YtDlpOptions};
use anyhow::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure that can be loaded from CLI, config file, or environment
///
/// Example configuration file content
/// # Server configuration
/// host = "0.0.0.0"
/// listen_on_port = 8000
///
/// # Extractor configuration
/// extractor_bin = "/usr/local/bin/yt-dlp"
/// extract_timeout = 30
/// format = "best[ext=mp4]/best"
/// username = "someone"  # Optional, needs password too
/// password = "secret"
///
/// # CORS, empty means any origin
/// allowed_origins = ["https://downloader.example.com", "http://localhost:3000"]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8000)]
    #[serde(default = "default_port")]
    pub listen_on_port: u16,

    /// Configuration file path
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Extractor executable
    #[arg(long, default_value = DEFAULT_BIN)]
    #[serde(default = "default_extractor_bin")]
    pub extractor_bin: String,

    /// Seconds a single extraction may take
    #[arg(short = 't', long, default_value_t = 30)]
    #[serde(default = "default_extract_timeout")]
    pub extract_timeout: u64,

    /// Format selector passed to the extractor
    #[arg(short, long, default_value = DEFAULT_FORMAT)]
    #[serde(default = "default_format")]
    pub format: String,

    /// Account name for sources that need a login
    #[arg(long, env = "EXTRACTOR_USERNAME")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Account password for sources that need a login
    #[arg(long, env = "EXTRACTOR_PASSWORD", hide_env_values = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Origins allowed to read responses (comma separated, empty = any)
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            listen_on_port: default_port(),
            config: None,
            extractor_bin: default_extractor_bin(),
            extract_timeout: default_extract_timeout(),
            format: default_format(),
            username: None,
            password: None,
            allowed_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from CLI args, optionally merging with a config file
    pub fn load() -> Result<Self> {
        let mut config = Config::parse();

        if let Some(config_path) = &config.config {
            let file_config = Self::from_file(Path::new(config_path))?;
            config = config.merge_with_file(file_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge with file config, CLI args take precedence
    fn merge_with_file(mut self, file_config: Config) -> Self {
        if self.host == default_host() {
            self.host = file_config.host;
        }
        if self.listen_on_port == default_port() {
            self.listen_on_port = file_config.listen_on_port;
        }
        if self.extractor_bin == default_extractor_bin() {
            self.extractor_bin = file_config.extractor_bin;
        }
        if self.extract_timeout == default_extract_timeout() {
            self.extract_timeout = file_config.extract_timeout;
        }
        if self.format == default_format() {
            self.format = file_config.format;
        }

        if self.username.is_none() {
            self.username = file_config.username;
        }
        if self.password.is_none() {
            self.password = file_config.password;
        }
        if self.allowed_origins.is_empty() {
            self.allowed_origins = file_config.allowed_origins;
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.extract_timeout == 0 {
            return Err(anyhow::anyhow!("Extract timeout must be at least 1 second"));
        }
        if self.extractor_bin.is_empty() {
            return Err(anyhow::anyhow!("Extractor executable cannot be empty"));
        }
        if self.format.is_empty() {
            return Err(anyhow::anyhow!("Format selector cannot be empty"));
        }

        match (non_empty(&self.username), non_empty(&self.password)) {
            (Some(_), None) => {
                return Err(anyhow::anyhow!("Password is required when username is set"));
            }
            (None, Some(_)) => {
                return Err(anyhow::anyhow!("Username is required when password is set"));
            }
            _ => {}
        }

        for origin in &self.allowed_origins {
            if origin != "*" && !origin.starts_with("http://") && !origin.starts_with("https://") {
                return Err(anyhow::anyhow!(
                    "Allowed origin must start with http:// or https://: {origin}"
                ));
            }
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.listen_on_port)
    }

    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout)
    }

    pub fn credentials(&self) -> Option<Credentials> {
        Some(Credentials {
            username: non_empty(&self.username)?.to_string(),
            password: non_empty(&self.password)?.to_string(),
        })
    }

    pub fn ytdlp_options(&self) -> YtDlpOptions {
        YtDlpOptions {
            bin: self.extractor_bin.clone(),
            format: self.format.clone(),
            credentials: self.credentials(),
        }
    }

    /// Whether any origin may read responses
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_extractor_bin() -> String {
    DEFAULT_BIN.to_string()
}

fn default_extract_timeout() -> u64 {
    30
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}
