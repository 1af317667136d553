use std::fmt;

use serde::Serialize;

pub const BUILD_MARKER: &str = "Building";
pub const LINK_MARKER: &str = "Linking CXX executable";
pub const DEFAULT_TOOL: &str = "g++";
pub const DEFAULT_LINK_FLAG: &str = "-Wl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkType {
    Build,
    Linking,
}

impl WorkType {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkType::Build => "build",
            WorkType::Linking => "linking",
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rounds to two decimal places. A rounded zero is always `+0.0`.
pub fn round_hundredths(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;

    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingLine {
    pub sys_time: f64,
    pub user_time: f64,
}

impl TimingLine {
    pub fn total(&self) -> f64 {
        round_hundredths(self.sys_time + self.user_time)
    }
}

/// A line that opens a unit. `line` is the zero-based index into the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker<'a> {
    pub line: usize,
    pub work_type: WorkType,
    pub target: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingRecord<'a> {
    pub work_type: WorkType,
    pub target: &'a str,
    pub sys_time: f64,
    pub user_time: f64,
    pub total: f64,
}

impl<'a> TimingRecord<'a> {
    pub fn new(marker: Marker<'a>, timing: TimingLine) -> Self {
        TimingRecord {
            work_type: marker.work_type,
            target: marker.target,
            sys_time: timing.sys_time,
            user_time: timing.user_time,
            total: timing.total(),
        }
    }

    pub fn label(&self) -> String {
        format!("{}:{}", self.work_type, self.target)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent<'a> {
    Unit(TimingRecord<'a>),
    /// The marker was not followed by the expected compiler invocation.
    Placeholder { marker: Marker<'a> },
    /// An invocation line with no `-o <target>` argument.
    Untargeted { line: usize },
    Malformed { marker: Marker<'a>, line: usize },
    /// The log ended before the marker's timing line.
    Truncated { marker: Marker<'a> },
}

impl<'a> ScanEvent<'a> {
    pub fn record(self) -> Option<TimingRecord<'a>> {
        match self {
            ScanEvent::Unit(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, ScanEvent::Unit(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanState<'a> {
    SeekingMarker,
    AwaitingTiming { marker: Marker<'a>, timing_at: usize },
    Done,
}

/// How unit headers are recognised in a log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    /// `Building ...` / `Linking CXX executable ...` lines, timing two lines
    /// below. With `invocation` set, the line right after the marker must
    /// contain that substring or the marker is a placeholder.
    Marker { invocation: Option<String> },
    /// Compiler invocation lines containing `tool`, timing on the next line.
    Invocation { tool: String, link_flag: String },
}

impl Default for Variant {
    fn default() -> Self {
        Variant::Marker { invocation: None }
    }
}

impl Variant {
    pub fn invocation() -> Self {
        Variant::Invocation {
            tool: DEFAULT_TOOL.to_string(),
            link_flag: DEFAULT_LINK_FLAG.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_hundredths() {
        assert_eq!(round_hundredths(1.2 + 0.3), 1.5);
        assert_eq!(round_hundredths(0.1 + 0.05), 0.15);
        assert_eq!(round_hundredths(0.004), 0.0);
        assert_eq!(round_hundredths(12.345_6), 12.35);
    }

    #[test]
    fn test_rounded_zero_is_positive() {
        let zero = round_hundredths(-0.001);
        assert_eq!(zero, 0.0);
        assert!(zero.is_sign_positive());
    }

    #[test]
    fn test_record_label() {
        let marker = Marker {
            line: 0,
            work_type: WorkType::Linking,
            target: "bin/app",
        };
        let record = TimingRecord::new(
            marker,
            TimingLine {
                sys_time: 0.1,
                user_time: 0.05,
            },
        );

        assert_eq!(record.label(), "linking:bin/app");
        assert_eq!(record.total, 0.15);
    }

    #[test]
    fn test_work_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&WorkType::Build).unwrap(),
            "\"build\""
        );
        assert_eq!(WorkType::Linking.to_string(), "linking");
    }
}
