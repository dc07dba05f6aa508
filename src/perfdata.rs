use crate::format::FormatError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A single labelled measurement with optional unit and threshold/range metadata.
///
/// All fields are kept as text: the backends only ever see the rendered form, and thresholds
/// may use range syntax (`10:20`, `@5`) that is not a plain number.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PerfData {
    pub label: String,
    pub value: String,
    pub unit: String,
    pub warn: String,
    pub crit: String,
    pub min: String,
    pub max: String,
}

impl PerfData {
    pub fn new(label: impl Into<String>, value: impl fmt::Display) -> Self {
        Self {
            label: label.into(),
            value: value.to_string(),
            unit: String::new(),
            warn: String::new(),
            crit: String::new(),
            min: String::new(),
            max: String::new(),
        }
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn warn(mut self, warn: impl fmt::Display) -> Self {
        self.warn = warn.to_string();
        self
    }

    pub fn crit(mut self, crit: impl fmt::Display) -> Self {
        self.crit = crit.to_string();
        self
    }

    pub fn min(mut self, min: impl fmt::Display) -> Self {
        self.min = min.to_string();
        self
    }

    pub fn max(mut self, max: impl fmt::Display) -> Self {
        self.max = max.to_string();
        self
    }
}

/// Renders `label=value<unit>;warn;crit;min;max`, keeping every separator even when the
/// field is empty.
impl fmt::Display for PerfData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}{};{};{};{};{}",
            self.label, self.value, self.unit, self.warn, self.crit, self.min, self.max
        )
    }
}

impl FromStr for PerfData {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (label, rest) = s
            .split_once('=')
            .ok_or_else(|| FormatError::PerfData(s.to_string()))?;
        if label.is_empty() {
            return Err(FormatError::PerfData(s.to_string()));
        }

        let mut fields = rest.split(';');
        let measured = fields.next().unwrap_or_default();
        let split_at = measured
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
            .unwrap_or(measured.len());
        let (value, unit) = measured.split_at(split_at);
        if value.is_empty() {
            return Err(FormatError::PerfData(s.to_string()));
        }

        let mut next = || fields.next().unwrap_or_default().to_string();
        Ok(PerfData {
            label: label.to_string(),
            value: value.to_string(),
            unit: unit.to_string(),
            warn: next(),
            crit: next(),
            min: next(),
            max: next(),
        })
    }
}
