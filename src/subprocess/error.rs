use crate::error::ErrorCode;
use std::path::PathBuf;

/// Failure to bring the load generator up. Always fatal, never retried.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("[E4001] Executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("[E4002] Failed to create capture file {}: {source}", path.display())]
    CaptureFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[E4007] Failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("[E4011] Load generator already started with PID {pid}")]
    AlreadyStarted { pid: u32 },
}

impl LaunchError {
    pub fn code(&self) -> u16 {
        match self {
            Self::ExecutableNotFound(_) => ErrorCode::LAUNCH_EXECUTABLE_NOT_FOUND,
            Self::CaptureFile { .. } => ErrorCode::LAUNCH_CAPTURE_FILE,
            Self::SpawnFailed { .. } => ErrorCode::LAUNCH_SPAWN_FAILED,
            Self::AlreadyStarted { .. } => ErrorCode::LAUNCH_ALREADY_STARTED,
        }
    }
}
