//! Submission of passive check results through the supervisor's external command pipe.

use crate::format::passive_payload;
use crate::plugin_io::CheckResult;
use log::{debug, error};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Composes `[<ts>] PROCESS_SERVICE_CHECK_RESULT;<host>;<service>;<code>;<payload>\n`.
pub fn compose_command(
    timestamp: u64,
    hostname: &str,
    service: &str,
    code: i32,
    payload: &str,
) -> String {
    format!(
        "[{}] PROCESS_SERVICE_CHECK_RESULT;{};{};{};{}\n",
        timestamp, hostname, service, code, payload
    )
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// The supervisor's command pipe.
///
/// Writes are synchronous and unserialised: callers sharing a pipe across threads must
/// serialise submissions themselves.
#[derive(Debug, Clone)]
pub struct CommandPipe {
    path: PathBuf,
    dry_run: bool,
}

impl CommandPipe {
    pub fn new(path: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            path: path.into(),
            dry_run,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Submits a check result.
    ///
    /// Failures are logged and swallowed. In dry-run mode the pipe is never touched and the
    /// composed command line is returned instead.
    pub fn submit(&self, hostname: &str, service: &str, result: &CheckResult) -> Option<String> {
        if !self.dry_run && !self.path.exists() {
            error!(
                "Specified command file ({}) doesn't exist",
                self.path.display()
            );
            return None;
        }

        if result.summary.is_none() {
            debug!("{} didn't set a summary, nothing to submit", service);
            return None;
        }

        let payload = passive_payload(result);
        debug!("Passive payload: {:?}", payload);
        self.submit_payload(hostname, service, result.code, &payload)
    }

    /// Submits an already encoded payload.
    pub fn submit_payload(
        &self,
        hostname: &str,
        service: &str,
        code: i32,
        payload: &str,
    ) -> Option<String> {
        let line = compose_command(unix_timestamp(), hostname, service, code, payload);

        if self.dry_run {
            debug!("Dry run, not writing: {}", line.trim_end());
            return Some(line);
        }

        if let Err(e) = self.write_line(&line) {
            error!(
                "Exception while writing to command pipe {} ({})",
                self.path.display(),
                e
            );
        }
        None
    }

    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut pipe = OpenOptions::new().append(true).open(&self.path)?;
        pipe.write_all(line.as_bytes())?;
        pipe.flush()
    }
}
