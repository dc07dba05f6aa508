use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_COMMAND_PIPE: &str = "/var/nagios/rw/nagios.cmd";
pub const DEFAULT_TIMEOUT_SECS: u64 = 3700;

/// Options every plugin understands.
///
/// Use it directly as the plugin's parser, or flatten it into a larger parser to add
/// plugin-specific arguments and implement [`PluginOptions`] for that parser.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct PluginArgs {
    /// Host name, IP address, or unix socket (must be an absolute path).
    #[arg(short = 'H', long, env = "MONPLUG_HOSTNAME", default_value = "localhost")]
    pub hostname: String,

    /// Offset to result in warning status.
    #[arg(short, long, allow_negative_numbers = true)]
    pub warning: Option<i64>,

    /// Offset to result in critical status.
    #[arg(short, long, allow_negative_numbers = true)]
    pub critical: Option<i64>,

    /// Specify debugging mode.
    #[arg(short, long)]
    pub debug: bool,

    /// Text to prepend to every check name.
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Text to append to every check name.
    #[arg(short, long)]
    pub suffix: Option<String>,

    /// Timeout in seconds for each check.
    #[arg(short, long, env = "MONPLUG_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Command pipe for submitting passive results.
    #[arg(short = 'C', long, env = "MONPLUG_COMMAND", default_value = DEFAULT_COMMAND_PIPE)]
    pub command: PathBuf,

    /// Dry run: do not execute commands, submit passive results or exit the process.
    #[arg(long)]
    pub dry_run: bool,

    /// Plugin output format.
    #[arg(short, long, env = "MONPLUG_OUTPUT", value_enum, default_value_t = OutputMode::Nagios)]
    pub output: OutputMode,
}

/// Gives the engine access to the common options inside a plugin's own argument type.
pub trait PluginOptions: Send + Sync + 'static {
    fn common(&self) -> &PluginArgs;
}

impl PluginOptions for PluginArgs {
    fn common(&self) -> &PluginArgs {
        self
    }
}

#[derive(ValueEnum, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Interactive output for active checks.
    #[value(alias = "interactive")]
    Nagios,
    /// Tabular output for a check collector.
    #[value(name = "check_mk", alias = "tabular")]
    CheckMk,
    /// Submission through the command pipe.
    Passive,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Nagios => write!(f, "nagios"),
            OutputMode::CheckMk => write!(f, "check_mk"),
            OutputMode::Passive => write!(f, "passive"),
        }
    }
}
