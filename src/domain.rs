use std::fmt;
use std::io::Error;

use ratatui::crossterm::event::KeyEvent;
use tracing_error::TracedError;

pub const TOAST_SECONDS: u64 = 5;
pub const SKELETON_ROWS: usize = 15;

pub const HELP_TEXT: &str = "\
plantdesk - repair & store desk

  ↑ / ↓        select row
  ← / →  [ ]   previous / next page
  Home / End   first / last page
  Tab          next tab
  /            search (Esc clears)
  Enter        actions for the selected row
  1-9          pick an action
  x            export to Excel
  y            copy selected row
  r            refresh
  m            menu
  L            logout
  ?            this help
  q            quit
";

/// Crate wide error type. Everything that can fail while talking to the
/// backend or the local machine ends up here.
#[derive(Debug)]
pub enum DeskError {
    IoError(Error),
    Json(serde_json::Error),
    Transport(TracedError<reqwest::Error>),
    Status(u16, String),
    Unauthorized(u16),
    Api(String),
    Decode(String),
    Token(String),
    InvalidInput(String),
    Config(String),
    NoSession,
    SessionExpired,
    Clipboard(String),
}

impl fmt::Display for DeskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeskError::IoError(e) => write!(f, "I/O error: {e}"),
            DeskError::Json(e) => write!(f, "JSON error: {e}"),
            DeskError::Transport(e) => write!(f, "request failed: {e}"),
            DeskError::Status(code, body) if body.is_empty() => {
                write!(f, "server answered with status {code}")
            }
            DeskError::Status(code, body) => write!(f, "server answered with status {code}: {body}"),
            DeskError::Unauthorized(code) => write!(f, "not authorized ({code}), please log in again"),
            DeskError::Api(msg) => write!(f, "{msg}"),
            DeskError::Decode(msg) => write!(f, "unexpected response: {msg}"),
            DeskError::Token(msg) => write!(f, "invalid token: {msg}"),
            DeskError::InvalidInput(msg) => write!(f, "{msg}"),
            DeskError::Config(msg) => write!(f, "configuration error: {msg}"),
            DeskError::NoSession => write!(f, "not logged in"),
            DeskError::SessionExpired => write!(f, "session expired"),
            DeskError::Clipboard(msg) => write!(f, "clipboard error: {msg}"),
        }
    }
}

impl std::error::Error for DeskError {}

impl DeskError {
    /// Errors after which the user has to log in again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            DeskError::Unauthorized(_) | DeskError::NoSession | DeskError::SessionExpired
        )
    }
}

impl From<Error> for DeskError {
    fn from(err: Error) -> Self {
        DeskError::IoError(err)
    }
}

impl From<serde_json::Error> for DeskError {
    fn from(err: serde_json::Error) -> Self {
        DeskError::Json(err)
    }
}

impl From<reqwest::Error> for DeskError {
    fn from(err: reqwest::Error) -> Self {
        DeskError::Transport(TracedError::from(err))
    }
}

impl From<base64::DecodeError> for DeskError {
    fn from(err: base64::DecodeError) -> Self {
        DeskError::Token(err.to_string())
    }
}

/// Input driven messages produced by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    NextTab,
    Search,
    Enter,
    Exit,
    Action(usize),
    Refresh,
    Export,
    CopyRow,
    Menu,
    Logout,
    Help,
    Resize(usize, usize),
    RawKey(KeyEvent),
}
