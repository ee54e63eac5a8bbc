//! Common test utilities: artifact directories and fake load generators

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Grinder data log header in its usual column order
pub const GRINDER_HEADER: &str = "Thread, Run, Test, Start time (ms since Epoch), Test time, \
Errors, HTTP response status, HTTP response length, HTTP response errors, \
Time to resolve host, Time to establish connection, Time to first byte, \
New connections, HTTP response code";

/// One Grinder data row matching [`GRINDER_HEADER`]
pub fn grinder_row(start_ms: u64, test_ms: u64, errors: u32, code: &str) -> String {
    format!(
        "0, 0, 1, {}, {}, {}, 200, 512, 0, 2, 3, {}, 1, {}",
        start_ms,
        test_ms,
        errors,
        test_ms / 2,
        code
    )
}

/// Artifact directory with helpers for fake load generators
pub struct RunDir {
    temp_dir: TempDir,
}

impl RunDir {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Write an executable shell script standing in for the load generator
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }

    /// Write `run.toml` launching `executable` with fast timings
    pub fn config(&self, executable: &Path, extra: &str) -> PathBuf {
        let content = format!(
            r#"[process]
executable = "{}"

[artifacts]
dir = "{}"

[timing]
poll_interval = "20ms"
shutdown_interval = "50ms"
term_attempts = 3
{}"#,
            executable.display(),
            self.path().display(),
            extra
        );
        let path = self.join("run.toml");
        fs::write(&path, content).unwrap();
        path
    }
}
