//! Runs external commands on behalf of checks.

use log::{debug, info};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(3600);

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Empty command line")]
    Empty,
    #[error("Failed to run command: {0}")]
    Io(#[from] std::io::Error),
    #[error("Command timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

/// Runs `argv` and returns its exit code together with stdout followed by stderr.
///
/// With `shell` the arguments are joined and handed to `sh -c`. A dry run only logs the
/// command. The child is killed when it outlives `timeout`; a child killed by a signal
/// reports exit code -1.
pub async fn sub_process(
    argv: &[&str],
    shell: bool,
    dry_run: bool,
    timeout: Duration,
) -> Result<(i32, String), CommandError> {
    if dry_run {
        info!("subprocess call: {:?}", argv);
        return Ok((0, "success from dry-run".to_string()));
    }

    let mut command = if shell {
        let mut command = Command::new("sh");
        command.arg("-c").arg(argv.join(" "));
        command
    } else {
        let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;
        let mut command = Command::new(program);
        command.args(args);
        command
    };
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Running {:?}", argv);
    let output = tokio::time::timeout(timeout, command.output())
        .await
        .map_err(|_| CommandError::TimedOut(timeout))??;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok((output.status.code().unwrap_or(-1), combined))
}
