use serde::{Deserialize, Serialize};
use std::fmt;

/// The four-valued health classification understood by every monitoring backend.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok = 0,
    Warning = 1,
    Critical = 2,
    Unknown = 3,
}

impl Status {
    /// Returns the numeric plugin return code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Maps a raw return code back onto a status, if it is one of the four known codes.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Status::Ok),
            1 => Some(Status::Warning),
            2 => Some(Status::Critical),
            3 => Some(Status::Unknown),
            _ => None,
        }
    }

    pub fn word(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
            Status::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.word())
    }
}

impl From<Status> for i32 {
    fn from(status: Status) -> Self {
        status.code()
    }
}

/// Returns the status word for a raw return code.
///
/// Codes outside the known range never fail: they render as UNKNOWN together with the
/// offending code, so a misbehaving check still produces conformant output.
pub fn status_word(code: i32) -> String {
    match Status::from_code(code) {
        Some(status) => status.word().to_string(),
        None => format!("UNKNOWN - plugin return code was {}", code),
    }
}
