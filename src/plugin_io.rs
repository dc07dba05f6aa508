use crate::capture::{flush_std_streams, CaptureError, StdCapture};
use crate::perfdata::PerfData;
use crate::status::Status;
use log::warn;
use serde::Serialize;
use std::fmt::Display;
use std::fs::File;
use std::io::Write;
use std::os::unix::fs::FileExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const DEFAULT_SUMMARY: &str = "Plugin didn't set summary message";

/// What a check produced: status code, summary, performance samples and detail text.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub code: i32,
    pub summary: Option<String>,
    pub perf_data: Vec<PerfData>,
    pub detail: String,
}

impl CheckResult {
    pub fn status(&self) -> Option<Status> {
        Status::from_code(self.code)
    }

    /// The summary as rendered, falling back to a placeholder when the check never set one.
    pub fn summary_text(&self) -> &str {
        self.summary.as_deref().unwrap_or(DEFAULT_SUMMARY)
    }

    pub fn detail_lines(&self) -> impl Iterator<Item = &str> {
        self.detail.lines()
    }
}

impl Default for CheckResult {
    fn default() -> Self {
        Self {
            code: Status::Unknown.code(),
            summary: None,
            perf_data: Vec::new(),
            detail: String::new(),
        }
    }
}

enum Detail {
    Memory(String),
    /// Shares its open file description with the redirected standard streams, so writes made
    /// through either path land in order.
    Captured(File),
}

impl Detail {
    fn append(&mut self, text: &str) {
        match self {
            Detail::Memory(buffer) => buffer.push_str(text),
            Detail::Captured(file) => {
                flush_std_streams();
                if let Err(e) = file.write_all(text.as_bytes()) {
                    warn!("Failed to write check output: {}", e);
                }
            }
        }
    }

    fn contents(&self) -> String {
        match self {
            Detail::Memory(buffer) => buffer.clone(),
            Detail::Captured(file) => {
                flush_std_streams();
                read_file(file).unwrap_or_else(|e| {
                    warn!("Failed to read captured output: {}", e);
                    String::new()
                })
            }
        }
    }
}

fn read_file(file: &File) -> std::io::Result<String> {
    let len = file.metadata()?.len() as usize;
    let mut buffer = vec![0; len];
    file.read_exact_at(&mut buffer, 0)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

struct IoState {
    name: String,
    hostname: String,
    code: i32,
    summary: Option<String>,
    perf_data: Vec<PerfData>,
    detail: Detail,
}

/// The output buffer handed to a check.
///
/// Cloning yields another handle onto the same buffer, so the engine keeps whatever a check
/// recorded even when the check itself is abandoned after a timeout.
#[derive(Clone)]
pub struct PluginIo {
    inner: Arc<Mutex<IoState>>,
}

impl PluginIo {
    pub fn new(name: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(IoState {
                name: name.into(),
                hostname: hostname.into(),
                code: Status::Unknown.code(),
                summary: None,
                perf_data: Vec::new(),
                detail: Detail::Memory(String::new()),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, IoState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Name of the check this buffer belongs to, including any configured prefix and suffix.
    pub fn name(&self) -> String {
        self.state().name.clone()
    }

    pub fn hostname(&self) -> String {
        self.state().hostname.clone()
    }

    pub fn set_status(&self, status: Status, summary: impl Into<String>) {
        let mut state = self.state();
        state.code = status.code();
        state.summary = Some(summary.into());
    }

    /// Sets a raw return code. Codes outside the four known statuses render as UNKNOWN.
    pub fn set_code(&self, code: i32) {
        self.state().code = code;
    }

    pub fn set_summary(&self, summary: impl Into<String>) {
        self.state().summary = Some(summary.into());
    }

    pub fn code(&self) -> i32 {
        self.state().code
    }

    pub fn summary(&self) -> Option<String> {
        self.state().summary.clone()
    }

    /// Records a performance sample. Samples are rendered in the order they were added.
    pub fn add_perf_data(&self, perf: PerfData) {
        self.state().perf_data.push(perf);
    }

    /// Appends raw text to the detail output.
    pub fn write(&self, text: &str) {
        self.state().detail.append(text);
    }

    /// Appends a line to the detail output.
    pub fn out(&self, line: impl Display) {
        self.write(&format!("{}\n", line));
    }

    pub fn printf(&self, line: impl Display) {
        self.out(line);
    }

    /// Everything written so far, including stray output captured from the standard streams.
    pub fn contents(&self) -> String {
        self.state().detail.contents()
    }

    /// Redirects the process's standard output and error into this buffer until the returned
    /// guard is dropped.
    pub fn capture(&self) -> Result<StdCapture, CaptureError> {
        let mut state = self.state();
        let mut sink = tempfile::tempfile()?;
        if let Detail::Memory(existing) = &state.detail {
            sink.write_all(existing.as_bytes())?;
        }
        let guard = StdCapture::redirect_to(&sink)?;
        state.detail = Detail::Captured(sink);
        Ok(guard)
    }

    /// Takes a snapshot of the current status, summary, samples and detail text.
    pub fn result(&self) -> CheckResult {
        let state = self.state();
        CheckResult {
            code: state.code,
            summary: state.summary.clone(),
            perf_data: state.perf_data.clone(),
            detail: state.detail.contents(),
        }
    }
}
