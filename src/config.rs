use crate::cli::{OutputMode, PluginArgs};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Settings the engine resolves from the command line once per run.
#[derive(Clone)]
pub struct RunConfig {
    pub hostname: String,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub timeout: Duration,
    pub command_pipe: PathBuf,
    pub dry_run: bool,
    pub output: OutputMode,
}

impl RunConfig {
    pub fn new(args: &PluginArgs) -> Self {
        RunConfig {
            hostname: args.hostname.clone(),
            prefix: args.prefix.clone().filter(|p| !p.is_empty()),
            suffix: args.suffix.clone().filter(|s| !s.is_empty()),
            timeout: Duration::from_secs(args.timeout),
            command_pipe: args.command.clone(),
            dry_run: args.dry_run,
            output: args.output,
        }
    }

    /// Joins the configured prefix and suffix to a check name with hyphens.
    pub fn check_name(&self, name: &str) -> String {
        [self.prefix.as_deref(), Some(name), self.suffix.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Passive checks always submit through the command pipe, everything else follows the
    /// configured output format.
    pub fn output_for(&self, passive: bool) -> OutputMode {
        if passive {
            OutputMode::Passive
        } else {
            self.output
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("hostname", &self.hostname)
            .field("prefix", &self.prefix)
            .field("suffix", &self.suffix)
            .field("timeout", &self.timeout)
            .field("command_pipe", &self.command_pipe)
            .field("dry_run", &self.dry_run)
            .field("output", &self.output.to_string())
            .finish()
    }
}
