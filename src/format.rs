//! Renderers for the three output formats understood by monitoring backends.
//!
//! All encoders are pure: they turn a [`CheckResult`] into the exact text the backend expects
//! and leave writing it to the caller.

use crate::perfdata::PerfData;
use crate::plugin_io::CheckResult;
use crate::status::status_word;
use std::fmt::Write;
use thiserror::Error;

/// Replaces `|` in passive payload text, where a bare pipe would be taken as the start of
/// performance data by the supervisor.
pub const PIPE_GLYPH: char = '\u{2758}';

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    #[error("Malformed performance data: {0}")]
    PerfData(String),
    #[error("Malformed tabular line: {0}")]
    Tabular(String),
}

/// Renders the status line shared by the interactive and passive formats:
/// `<STATUS_WORD> - <summary>` followed by ` | ` and the samples when there are any.
fn status_line(result: &CheckResult, summary: &str) -> String {
    let mut line = format!("{} - {}", status_word(result.code), summary);
    if !result.perf_data.is_empty() {
        line.push_str(" | ");
        for perf in &result.perf_data {
            let _ = write!(line, "{} ", perf);
        }
    }
    line
}

/// Interactive (pull) output: the status line, a newline and then the captured detail text.
pub fn nagios(result: &CheckResult) -> String {
    let mut out = status_line(result, result.summary_text());
    out.push('\n');
    out.push_str(&result.detail);
    out
}

/// Tabular (collector) output: `<code> <name> <perf|...> <summary>` on a single line.
pub fn check_mk(name: &str, result: &CheckResult) -> String {
    let mut out = format!("{} {} ", result.code, name.replace(' ', "_"));
    for perf in &result.perf_data {
        let _ = write!(out, "{}|", perf);
    }
    let _ = writeln!(out, " {}", result.summary_text());
    out
}

/// Passive (push) payload: the status line, a literal `\n` escape and the detail text with
/// every newline escaped, so the whole payload stays on one physical line.
pub fn passive_payload(result: &CheckResult) -> String {
    let summary = result.summary_text().replace('|', &PIPE_GLYPH.to_string());
    let mut payload = status_line(result, &summary);
    payload.push_str("\\n");
    payload.push_str(
        &result
            .detail
            .replace('|', &PIPE_GLYPH.to_string())
            .replace('\n', "\\n"),
    );
    payload
}

/// A decoded tabular output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularRecord {
    pub code: i32,
    pub name: String,
    pub perf_data: Vec<PerfData>,
    pub summary: String,
}

impl TabularRecord {
    pub fn parse(line: &str) -> Result<Self, FormatError> {
        let malformed = || FormatError::Tabular(line.to_string());
        let line = line.strip_suffix('\n').unwrap_or(line);

        let (code, rest) = line.split_once(' ').ok_or_else(malformed)?;
        let code = code.parse::<i32>().map_err(|_| malformed())?;
        let (name, rest) = rest.split_once(' ').ok_or_else(malformed)?;
        let (perf, summary) = rest.split_once(' ').ok_or_else(malformed)?;

        let perf_data = perf
            .split('|')
            .filter(|p| !p.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<PerfData>, _>>()?;

        Ok(Self {
            code,
            name: name.to_string(),
            perf_data,
            summary: summary.to_string(),
        })
    }

    pub fn status_word(&self) -> String {
        status_word(self.code)
    }
}
