//! Launch description for the external load generator

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::error::LaunchError;

/// Main class of The Grinder console-less agent
pub const GRINDER_MAIN_CLASS: &str = "net.grinder.Grinder";

/// Everything needed to start the load generator.
///
/// Built once before startup and never mutated afterwards. Environment
/// overrides are kept sorted so the spawned command is reproducible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub stdout_path: PathBuf,
    pub stderr_path: PathBuf,
}

impl LaunchSpec {
    /// Fixed-shape Grinder command:
    /// `java -classpath <home>/lib/grinder.jar net.grinder.Grinder <properties>`
    ///
    /// Runs inside `artifacts_dir` with output captured to
    /// `grinder-stdout.log` / `grinder-stderr.log` there. Relative `grinder_home`
    /// and `properties_file` are taken from the current directory.
    pub fn grinder(
        java: impl Into<PathBuf>,
        grinder_home: &Path,
        properties_file: &Path,
        artifacts_dir: &Path,
    ) -> Self {
        // The tool runs inside `artifacts_dir`, so relative inputs are pinned first
        let jar = absolutize(grinder_home).join("lib").join("grinder.jar");
        Self {
            executable: java.into(),
            args: vec![
                "-classpath".to_string(),
                jar.display().to_string(),
                GRINDER_MAIN_CLASS.to_string(),
                absolutize(properties_file).display().to_string(),
            ],
            working_dir: Some(artifacts_dir.to_path_buf()),
            env: BTreeMap::new(),
            stdout_path: artifacts_dir.join("grinder-stdout.log"),
            stderr_path: artifacts_dir.join("grinder-stderr.log"),
        }
    }

    /// The full command line, executable first, in launch order
    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(self.executable.display().to_string())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Human-readable command for logs and error messages
    pub fn display_command(&self) -> String {
        self.command_line().join(" ")
    }

    /// Resolve the executable to an existing file, as an absolute path.
    ///
    /// Paths with a directory component are checked as given (relative ones
    /// against the working directory); bare names are searched on `PATH`.
    /// The result must stay valid after the child changes into the working
    /// directory.
    pub fn resolve_executable(&self) -> Result<PathBuf, LaunchError> {
        let exe = &self.executable;
        let has_dir = exe.components().count() > 1;

        if has_dir {
            let candidate = match (&self.working_dir, exe.is_relative()) {
                (Some(dir), true) => dir.join(exe),
                _ => exe.clone(),
            };
            return if candidate.is_file() {
                Ok(absolutize(&candidate))
            } else {
                Err(LaunchError::ExecutableNotFound(exe.display().to_string()))
            };
        }

        let path_var = std::env::var_os("PATH").unwrap_or_default();
        std::env::split_paths(&path_var)
            .map(|dir| dir.join(exe))
            .find(|candidate| candidate.is_file())
            .map(|candidate| absolutize(&candidate))
            .ok_or_else(|| LaunchError::ExecutableNotFound(exe.display().to_string()))
    }
}

/// `path` made absolute against the current directory; unchanged if that fails
fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
