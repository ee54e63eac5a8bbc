use std::path::PathBuf;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

use crate::subprocess::LaunchError;

/// The unified error type for the harness
///
/// Only `Launch`, `ProcessFailure` and `EmptyResults` describe the outcome of
/// a load run; the remaining variants cover setup mistakes by the caller.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    #[error("[E4003] Load generator exited with non-zero code {exit_code}")]
    ProcessFailure { exit_code: i32 },

    #[error("[E5001] Empty results log, most likely the tool failed: {}", path.display())]
    EmptyResults { path: PathBuf },

    #[error("[E4012] Load generator has not been started")]
    NotStarted,

    #[error("[E5002] A sample sink is already registered for this run")]
    SinkAlreadyRegistered,

    #[error("[E9001] I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl HarnessError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Add a source error to a configuration error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        if let Self::Config { source: src, .. } = &mut self {
            *src = Some(source.into());
        }
        self
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. } => *code,
            Self::Launch(err) => err.code(),
            Self::ProcessFailure { .. } => ErrorCode::PROCESS_FAILED,
            Self::EmptyResults { .. } => ErrorCode::RESULTS_EMPTY,
            Self::NotStarted => ErrorCode::PROCESS_NOT_STARTED,
            Self::SinkAlreadyRegistered => ErrorCode::RESULTS_SINK_REGISTERED,
            Self::Io { .. } => ErrorCode::OTHER_IO,
        }
    }

    /// Get the exit code the CLI reports for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Launch(_) => 3,
            Self::ProcessFailure { .. } => 4,
            Self::EmptyResults { .. } => 5,
            Self::NotStarted | Self::SinkAlreadyRegistered | Self::Io { .. } => 1,
        }
    }

    /// Whether this error ends the load run (as opposed to a caller mistake)
    pub fn is_run_failure(&self) -> bool {
        matches!(
            self,
            Self::Launch(_) | Self::ProcessFailure { .. } | Self::EmptyResults { .. }
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, .. } => format!("Configuration problem: {}", message),
            Self::Launch(err) => format!("Could not launch load generator: {}", err),
            Self::ProcessFailure { exit_code } => {
                format!("Load generator failed with exit code {}", exit_code)
            }
            Self::EmptyResults { path } => format!(
                "No results were written to {}; check the load generator's configuration",
                path.display()
            ),
            Self::NotStarted => "Load generator has not been started".to_string(),
            Self::SinkAlreadyRegistered => {
                "Only one sample sink can be registered per run".to_string()
            }
            Self::Io { message, source } => format!("{}: {}", message, source),
        }
    }
}

/// Type alias for Results using HarnessError
pub type Result<T> = std::result::Result<T, HarnessError>;
