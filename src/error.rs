use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    Env,
    File,
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigSource::Cli => "command line",
            ConfigSource::Env => "environment",
            ConfigSource::File => "config file",
            ConfigSource::Default => "defaults",
        };
        f.write_str(name)
    }
}

/// Errors that can abort or degrade a gpt-clip session.
#[derive(Debug, Error)]
pub enum Error {
    /// Config file exists but could not be read or is not a JSON object
    #[error("Failed to parse config file {}: {message}", .path.display())]
    ConfigParse { path: PathBuf, message: String },

    /// A resolved configuration value is out of range or has the wrong type
    #[error("Invalid {field} from {origin}: {reason}")]
    ConfigValidation {
        field: &'static str,
        origin: ConfigSource,
        reason: String,
    },

    #[error("{var} environment variable not set")]
    MissingCredential { var: &'static str },

    #[error("Clipboard unavailable: {0}")]
    ClipboardUnavailable(String),

    /// Upstream request failed; `status` is absent for transport errors
    #[error("{}", format_chat_error(.status, .message))]
    ChatRequest { status: Option<u16>, message: String },

    #[error("Failed to write session log {}: {source}", .path.display())]
    LogWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn validation(
        field: &'static str,
        origin: ConfigSource,
        reason: impl Into<String>,
    ) -> Self {
        Error::ConfigValidation {
            field,
            origin,
            reason: reason.into(),
        }
    }

    pub fn chat(status: Option<u16>, message: impl Into<String>) -> Self {
        Error::ChatRequest {
            status,
            message: message.into(),
        }
    }
}

fn format_chat_error(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("Chat API request failed with status {code}: {message}"),
        None => format!("Chat API request failed: {message}"),
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
