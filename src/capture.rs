//! Process-wide redirection of the standard output and error streams.

use log::error;
use nix::unistd::dup2;
use std::fs::File;
use std::io::{self, Write};
use std::os::fd::{AsFd, AsRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

static ACTIVE: AtomicBool = AtomicBool::new(false);

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Another capture is already active")]
    AlreadyActive,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to redirect standard streams: {0}")]
    Redirect(#[from] nix::Error),
}

/// Scoped redirection of file descriptors 1 and 2 into a sink file.
///
/// While the value is alive every write to the process's standard output or error, from any
/// thread, lands in the sink. Dropping it restores the original streams. Only one capture can
/// be active at a time.
#[derive(Debug)]
pub struct StdCapture {
    saved_stdout: OwnedFd,
    saved_stderr: OwnedFd,
}

impl StdCapture {
    pub fn redirect_to(sink: &File) -> Result<Self, CaptureError> {
        if ACTIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CaptureError::AlreadyActive);
        }

        Self::swap(sink).inspect_err(|_| ACTIVE.store(false, Ordering::SeqCst))
    }

    /// Reports whether a capture is currently in place.
    pub fn is_active() -> bool {
        ACTIVE.load(Ordering::SeqCst)
    }

    fn swap(sink: &File) -> Result<Self, CaptureError> {
        flush_std_streams();
        let saved_stdout = io::stdout().as_fd().try_clone_to_owned()?;
        let saved_stderr = io::stderr().as_fd().try_clone_to_owned()?;

        dup2(sink.as_raw_fd(), stdout_fd())?;
        if let Err(e) = dup2(sink.as_raw_fd(), stderr_fd()) {
            let _ = dup2(saved_stdout.as_raw_fd(), stdout_fd());
            return Err(e.into());
        }

        Ok(Self {
            saved_stdout,
            saved_stderr,
        })
    }
}

impl Drop for StdCapture {
    fn drop(&mut self) {
        flush_std_streams();
        if let Err(e) = dup2(self.saved_stdout.as_raw_fd(), stdout_fd()) {
            error!("Failed to restore standard output: {}", e);
        }
        if let Err(e) = dup2(self.saved_stderr.as_raw_fd(), stderr_fd()) {
            error!("Failed to restore standard error: {}", e);
        }
        ACTIVE.store(false, Ordering::SeqCst);
    }
}

/// Pushes anything sitting in the std buffers out to the descriptor currently behind them.
pub(crate) fn flush_std_streams() {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
}

fn stdout_fd() -> RawFd {
    io::stdout().as_raw_fd()
}

fn stderr_fd() -> RawFd {
    io::stderr().as_raw_fd()
}
