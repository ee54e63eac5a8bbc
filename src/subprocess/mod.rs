//! Launching and supervising the external load generator

pub mod builder;
pub mod command;
pub mod error;
pub mod supervisor;

pub use builder::LaunchSpecBuilder;
pub use command::{LaunchSpec, GRINDER_MAIN_CLASS};
pub use error::LaunchError;
pub use supervisor::{
    ProcessHandle, ProcessStatus, ProcessSupervisor, ShutdownPolicy, ShutdownSummary,
};
