//! Run configuration
//!
//! A load run is described by one TOML file. Either a `[process]` table names
//! an arbitrary executable, or a `[grinder]` table selects the Grinder preset.
//! Environment variables prefixed with `LOADGEN_` override file values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ErrorCode, HarnessError, Result};
use crate::results::{ColumnNames, ReaderOptions, DEFAULT_CHUNK_BYTES};
use crate::subprocess::{LaunchSpec, LaunchSpecBuilder, ShutdownPolicy};

/// Result log name the Grinder preset expects the tool to write
pub const GRINDER_RESULT_LOG: &str = "grinder-bzt-kpi.log";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub process: Option<ProcessConfig>,
    #[serde(default)]
    pub grinder: Option<GrinderConfig>,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub results: ResultsConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Arbitrary load generator executable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub executable: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    /// Defaults to the artifacts directory
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// The Grinder launched through its Java entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrinderConfig {
    #[serde(default = "default_java")]
    pub java: PathBuf,
    /// Grinder installation; `lib/grinder.jar` must live below it
    pub home: PathBuf,
    /// Generated `grinder.properties`
    pub properties: PathBuf,
}

fn default_java() -> PathBuf {
    PathBuf::from("java")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub dir: PathBuf,
    /// Capture file names for `[process]` runs, relative to `dir`
    pub stdout: String,
    pub stderr: String,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
            stdout: "loadgen-stdout.log".to_string(),
            stderr: "loadgen-stderr.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    /// Result log path, relative to the artifacts directory unless absolute
    pub file: PathBuf,
    pub delimiter: char,
    pub chunk_bytes: usize,
    pub columns: ColumnNames,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(GRINDER_RESULT_LOG),
            delimiter: ',',
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            columns: ColumnNames::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(with = "humantime_serde", default = "default_poll_interval")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde", default = "default_shutdown_interval")]
    pub shutdown_interval: Duration,
    #[serde(default = "default_term_attempts")]
    pub term_attempts: u32,
    /// Give up if the result log is still unreadable after this long
    #[serde(with = "humantime_serde", default)]
    pub startup_timeout: Option<Duration>,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_shutdown_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_term_attempts() -> u32 {
    10
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            shutdown_interval: default_shutdown_interval(),
            term_attempts: default_term_attempts(),
            startup_timeout: None,
        }
    }
}

impl HarnessConfig {
    /// A config running `executable` with defaults everywhere else
    pub fn for_process(executable: impl Into<PathBuf>, artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            process: Some(ProcessConfig {
                executable: executable.into(),
                args: Vec::new(),
                working_dir: None,
                env: BTreeMap::new(),
            }),
            grinder: None,
            artifacts: ArtifactsConfig {
                dir: artifacts_dir.into(),
                ..ArtifactsConfig::default()
            },
            results: ResultsConfig::default(),
            timing: TimingConfig::default(),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            HarnessError::config_with_code(ErrorCode::CONFIG_PARSE_ERROR, e.to_string())
                .with_source(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, apply `LOADGEN_*` overrides and validate
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            HarnessError::config_with_code(
                ErrorCode::CONFIG_NOT_FOUND,
                format!("Cannot read {}", path.display()),
            )
            .with_source(e)
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| {
            HarnessError::config_with_code(
                ErrorCode::CONFIG_PARSE_ERROR,
                format!("{}: {}", path.display(), e),
            )
            .with_source(e)
        })?;
        config.merge_env_vars();
        config.validate()?;
        Ok(config)
    }

    pub fn merge_env_vars(&mut self) {
        self.merge_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value
    pub fn merge_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("LOADGEN_ARTIFACTS_DIR") {
            self.artifacts.dir = PathBuf::from(dir);
        }

        if let Some(executable) = lookup("LOADGEN_EXECUTABLE") {
            let executable = PathBuf::from(executable);
            if let Some(process) = self.process.as_mut() {
                process.executable = executable;
            } else if let Some(grinder) = self.grinder.as_mut() {
                grinder.java = executable;
            } else {
                self.process = Some(ProcessConfig {
                    executable,
                    args: Vec::new(),
                    working_dir: None,
                    env: BTreeMap::new(),
                });
            }
        }

        if let Some(millis) = lookup("LOADGEN_POLL_INTERVAL_MS") {
            match millis.parse::<u64>() {
                Ok(value) => self.timing.poll_interval = Duration::from_millis(value),
                Err(e) => tracing::warn!("Ignoring LOADGEN_POLL_INTERVAL_MS={}: {}", millis, e),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            HarnessError::config_with_code(ErrorCode::CONFIG_VALIDATION_FAILED, message)
        };

        match (&self.process, &self.grinder) {
            (Some(_), Some(_)) => {
                return Err(invalid("Use either [process] or [grinder], not both"))
            }
            (None, None) => {
                return Err(invalid("One of [process] or [grinder] is required"))
            }
            (Some(process), None) if process.executable.as_os_str().is_empty() => {
                return Err(invalid("process.executable must not be empty"))
            }
            _ => {}
        }

        if self.results.delimiter == '\n' || self.results.delimiter == '\r' {
            return Err(invalid("results.delimiter cannot be a line terminator"));
        }
        if self.results.chunk_bytes == 0 {
            return Err(invalid("results.chunk_bytes must be greater than zero"));
        }
        if self.results.file.as_os_str().is_empty() {
            return Err(invalid("results.file must not be empty"));
        }
        if let Some(name) = self.results.columns.all().iter().find(|n| n.trim().is_empty()) {
            return Err(invalid(&format!("Empty column name '{}' in results.columns", name)));
        }
        if self.timing.poll_interval.is_zero() {
            return Err(invalid("timing.poll_interval must be greater than zero"));
        }

        Ok(())
    }

    pub fn result_log_path(&self) -> PathBuf {
        self.artifacts.dir.join(&self.results.file)
    }

    pub fn launch_spec(&self) -> Result<LaunchSpec> {
        let dir = &self.artifacts.dir;
        match (&self.process, &self.grinder) {
            (Some(process), None) => Ok(LaunchSpecBuilder::new(&process.executable, dir, "loadgen")
                .args(&process.args)
                .envs(&process.env)
                .current_dir(process.working_dir.as_deref().unwrap_or(dir))
                .stdout_path(dir.join(&self.artifacts.stdout))
                .stderr_path(dir.join(&self.artifacts.stderr))
                .build()),
            (None, Some(grinder)) => Ok(LaunchSpec::grinder(
                &grinder.java,
                &grinder.home,
                &grinder.properties,
                dir,
            )),
            _ => Err(HarnessError::config_with_code(
                ErrorCode::CONFIG_VALIDATION_FAILED,
                "One of [process] or [grinder] is required",
            )),
        }
    }

    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            delimiter: self.results.delimiter,
            chunk_bytes: self.results.chunk_bytes,
            columns: self.results.columns.clone(),
        }
    }

    pub fn shutdown_policy(&self) -> ShutdownPolicy {
        ShutdownPolicy {
            interval: self.timing.shutdown_interval,
            term_attempts: self.timing.term_attempts,
        }
    }
}
