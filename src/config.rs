use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use derive_setters::Setters;

use crate::domain::DeskError;

const DEFAULT_SESSION_FILE: &str = "~/.config/plantdesk/session.json";
const DEFAULT_DOWNLOAD_DIR: &str = "~/Downloads";
const DEFAULT_LOG_FILE: &str = "plantdesk.log";

#[derive(Debug, Parser)]
#[command(name = "plantdesk", version, about = "Terminal desk for the plant repair and store workflows")]
pub struct Args {
    /// Base URL of the backend API
    #[arg(long, env = "PLANTDESK_API_URL")]
    pub api_url: String,

    /// Where the bearer token and user are kept between runs
    #[arg(long, env = "PLANTDESK_SESSION_FILE", default_value = DEFAULT_SESSION_FILE)]
    pub session_file: String,

    /// Target directory for Excel exports
    #[arg(long, env = "PLANTDESK_DOWNLOAD_DIR", default_value = DEFAULT_DOWNLOAD_DIR)]
    pub download_dir: String,

    #[arg(long, env = "PLANTDESK_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    pub log_file: String,

    /// Request timeout in seconds, applied to every call
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Terminal event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    pub poll_ms: u64,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, PartialEq)]
pub enum Command {
    /// Print the user stored in the current session
    Whoami,
    /// Forget the stored session
    Logout,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, Setters)]
#[setters(into)]
pub struct DeskConfig {
    pub api_url: String,
    pub session_file: PathBuf,
    pub download_dir: PathBuf,
    pub log_file: PathBuf,
    pub request_timeout: Duration,
    pub event_poll_time: u64,
}

impl DeskConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: normalize_base_url(&api_url.into()),
            session_file: PathBuf::from("session.json"),
            download_dir: PathBuf::from("."),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            request_timeout: Duration::from_secs(30),
            event_poll_time: 100,
        }
    }
}

impl Args {
    pub fn into_config(self) -> Result<DeskConfig, DeskError> {
        let api_url = normalize_base_url(&self.api_url);
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(DeskError::Config(format!(
                "api url must start with http:// or https://, got \"{api_url}\""
            )));
        }
        if self.timeout_secs == 0 {
            return Err(DeskError::Config("timeout must be at least one second".into()));
        }

        Ok(DeskConfig::new(api_url)
            .session_file(expand_path(&self.session_file)?)
            .download_dir(expand_path(&self.download_dir)?)
            .log_file(expand_path(&self.log_file)?)
            .request_timeout(Duration::from_secs(self.timeout_secs))
            .event_poll_time(self.poll_ms))
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn expand_path(raw: &str) -> Result<PathBuf, DeskError> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| DeskError::Config(format!("cannot expand \"{raw}\": {e}")))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
