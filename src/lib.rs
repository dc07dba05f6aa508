//! Helpers for writing monitoring plugins.
//!
//! A plugin registers one or more checks with a [`PluginManager`], which runs them one at a
//! time under a timeout, captures anything they print, and renders each result for the
//! configured backend: interactive (`nagios`), tabular (`check_mk`) or passive submission
//! through the supervisor's command pipe.

pub mod capture;
pub mod checks;
pub mod cli;
pub mod client;
pub mod command;
pub mod config;
pub mod format;
pub mod logging;
pub mod passive;
pub mod perfdata;
pub mod plugin_io;
pub mod queue;
pub mod status;

pub use checks::ordering::{CyclicDependency, DependencyGraph};
pub use checks::plugin_manager::{exit_code, PluginError, PluginManager, RunResult};
pub use checks::timeout::{run_with_timeout, TimedOut};
pub use checks::{Check, CheckError, CheckId, CheckOptions, FileCheck, FnCheck};
pub use cli::{OutputMode, PluginArgs, PluginOptions};
pub use passive::CommandPipe;
pub use perfdata::PerfData;
pub use plugin_io::{CheckResult, PluginIo};
pub use status::Status;
