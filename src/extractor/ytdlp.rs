use super::{MetadataSource, SourceError};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const DEFAULT_BIN: &str = "yt-dlp";
pub const DEFAULT_FORMAT: &str = "best[ext=mp4]/best";

/// Login for sources that need an account
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct YtDlpOptions {
    pub bin: String,
    pub format: String,
    pub credentials: Option<Credentials>,
}

impl Default for YtDlpOptions {
    fn default() -> Self {
        Self {
            bin: DEFAULT_BIN.to_string(),
            format: DEFAULT_FORMAT.to_string(),
            credentials: None,
        }
    }
}

/// Runs `yt-dlp` in metadata-only mode and reads its JSON dump.
#[derive(Debug, Clone)]
pub struct YtDlp {
    options: YtDlpOptions,
}

impl YtDlp {
    pub fn new(options: YtDlpOptions) -> Self {
        Self { options }
    }

    fn args(&self, url: &str, credentials_file: Option<&Path>) -> Vec<String> {
        let mut args: Vec<String> = [
            "--dump-single-json",
            "--skip-download",
            "--quiet",
            "--no-warnings",
            "--no-playlist",
            "--format",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        args.push(self.options.format.clone());

        // credentials stay off argv, where `ps` would show them
        if let Some(path) = credentials_file {
            args.push("--config-locations".into());
            args.push(path.to_string_lossy().into_owned());
        }

        // everything after `--` is positional, so a URL can't smuggle in options
        args.push("--".into());
        args.push(url.to_string());
        args
    }

    /// Write the login into an owner-only config file for `--config-locations`.
    ///
    /// The file is removed when the returned handle drops.
    fn credentials_file(&self) -> std::io::Result<Option<NamedTempFile>> {
        let Some(credentials) = &self.options.credentials else {
            return Ok(None);
        };

        let mut file = tempfile::Builder::new()
            .prefix("video-meta-login-")
            .suffix(".conf")
            .tempfile()?;
        writeln!(file, "--username {}", quote(&credentials.username))?;
        writeln!(file, "--password {}", quote(&credentials.password))?;
        file.flush()?;

        Ok(Some(file))
    }

    /// Check that the binary runs, returning its version.
    pub async fn probe(&self) -> Option<String> {
        match Command::new(&self.options.bin)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
        {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
                info!(bin = %self.options.bin, %version, "Extractor is available");
                Some(version)
            }
            Ok(output) => {
                warn!(bin = %self.options.bin, status = %output.status, "Extractor version check failed");
                None
            }
            Err(error) => {
                warn!(bin = %self.options.bin, %error, "Extractor not found");
                None
            }
        }
    }
}

#[async_trait]
impl MetadataSource for YtDlp {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch(&self, url: &str) -> Result<Option<Value>, SourceError> {
        debug!(bin = %self.options.bin, %url, "Running extractor");

        let credentials_file = self.credentials_file().map_err(|error| {
            SourceError::Failed(format!("failed to write extractor login: {error}"))
        })?;
        let args = self.args(url, credentials_file.as_ref().map(NamedTempFile::path));

        let output = Command::new(&self.options.bin)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| match error.kind() {
                IoErrorKind::NotFound | IoErrorKind::PermissionDenied => {
                    SourceError::Unavailable(format!("{}: {error}", self.options.bin))
                }
                _ => SourceError::Failed(format!("failed to run extractor: {error}")),
            })?;

        if !output.status.success() {
            return Err(SourceError::Failed(failure_message(
                &output.stderr,
                output.status,
            )));
        }

        parse_dump(&output.stdout)
    }
}

/// Single-quote a value for yt-dlp's shell-style config parser.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r#"'"'"'"#))
}

fn parse_dump(stdout: &[u8]) -> Result<Option<Value>, SourceError> {
    let stdout = String::from_utf8_lossy(stdout);
    let stdout = stdout.trim();
    if stdout.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str(stdout) {
        Ok(Value::Null) => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(error) => Err(SourceError::Failed(format!(
            "unparseable extractor output: {error}"
        ))),
    }
}

fn failure_message(stderr: &[u8], status: ExitStatus) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    stderr
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .map(|line| line.strip_prefix("ERROR: ").unwrap_or(line).to_string())
        .unwrap_or_else(|| format!("extractor exited with {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exit_status(code: i32) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(code << 8)
    }

    #[test]
    fn test_args_end_with_separated_url() {
        let ytdlp = YtDlp::new(YtDlpOptions::default());
        let args = ytdlp.args("--exec=rm -rf /", None);

        assert!(args.contains(&"--skip-download".to_string()));
        assert!(args.contains(&"--quiet".to_string()));
        assert!(args.contains(&"--no-warnings".to_string()));
        assert!(!args.contains(&"--config-locations".to_string()));
        assert_eq!(
            &args[args.len() - 2..],
            &["--".to_string(), "--exec=rm -rf /".to_string()]
        );

        let format_at = args.iter().position(|a| a == "--format").unwrap();
        assert_eq!(args[format_at + 1], DEFAULT_FORMAT);
    }

    #[test]
    fn test_credentials_never_reach_argv() {
        let ytdlp = YtDlp::new(YtDlpOptions {
            credentials: Some(Credentials {
                username: "alice".into(),
                password: "hunter2".into(),
            }),
            ..Default::default()
        });

        let file = ytdlp.credentials_file().unwrap().unwrap();
        let args = ytdlp.args("https://x.com/a/status/1", Some(file.path()));

        assert!(!args.iter().any(|a| a.contains("hunter2") || a.contains("alice")));
        assert!(!args.contains(&"--password".to_string()));
        let config_at = args.iter().position(|a| a == "--config-locations").unwrap();
        assert_eq!(args[config_at + 1], file.path().to_string_lossy());
        assert_eq!(args.last().unwrap(), "https://x.com/a/status/1");

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(content, "--username 'alice'\n--password 'hunter2'\n");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(file.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o077, 0, "login file readable by others: {mode:o}");
        }

        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_no_credentials_file_without_login() {
        let ytdlp = YtDlp::new(YtDlpOptions::default());
        assert!(ytdlp.credentials_file().unwrap().is_none());
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("plain"), "'plain'");
        assert_eq!(quote("it's #1"), r#"'it'"'"'s #1'"#);
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = Credentials {
            username: "alice".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{credentials:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_parse_dump() {
        assert_eq!(parse_dump(b""), Ok(None));
        assert_eq!(parse_dump(b"  \n"), Ok(None));
        assert_eq!(parse_dump(b"null\n"), Ok(None));
        assert_eq!(
            parse_dump(br#"{"title":"Clip","duration":42}"#),
            Ok(Some(json!({"title": "Clip", "duration": 42})))
        );
        assert!(matches!(
            parse_dump(b"WARNING: not json"),
            Err(SourceError::Failed(_))
        ));
    }

    #[test]
    fn test_failure_message() {
        let stderr = b"WARNING: something\nERROR: [twitter] 123: No video could be found in this tweet\n\n";
        assert_eq!(
            failure_message(stderr, exit_status(1)),
            "[twitter] 123: No video could be found in this tweet"
        );

        let message = failure_message(b"", exit_status(2));
        assert!(message.starts_with("extractor exited with"), "{message}");
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let ytdlp = YtDlp::new(YtDlpOptions {
            bin: "/nonexistent/bin/yt-dlp".into(),
            ..Default::default()
        });

        assert!(matches!(
            ytdlp.fetch("https://example.com/v").await,
            Err(SourceError::Unavailable(_))
        ));
        assert_eq!(ytdlp.probe().await, None);
    }
}
