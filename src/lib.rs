//! # loadgen-harness
//!
//! Supervises an external load generator (The Grinder, or any tool with the
//! same result-log contract) and turns its growing result log into normalized
//! samples while the tool is still running.
//!
//! ## Usage
//!
//! ```bash
//! loadgen-harness run --config run.toml [--samples samples.jsonl]
//! loadgen-harness parse artifacts/grinder-bzt-kpi.log
//! ```
//!
//! ## Modules
//!
//! - `config` - TOML run configuration with `LOADGEN_*` environment overrides
//! - `error` - Crate-wide error type with stable error codes
//! - `results` - Streaming result-log reader and sample sinks
//! - `run` - Polling driver tying the supervisor and the reader together
//! - `subprocess` - Launch description and process-group supervision
pub mod config;
pub mod error;
pub mod results;
pub mod run;
pub mod subprocess;

pub use config::HarnessConfig;
pub use error::{HarnessError, Result};
pub use results::{SampleRecord, SampleSink, StreamingLogReader};
pub use run::{LoadRun, RunReport};
pub use subprocess::{LaunchSpec, ProcessSupervisor};
