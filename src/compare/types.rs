use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ReportError;

pub const DIFF_HEADER: [&str; 11] = [
    "target",
    "work_type",
    "sys_time",
    "user_time",
    "total",
    "sys_time_diff",
    "user_time_diff",
    "total_diff",
    "sys_time_perc",
    "user_time_perc",
    "total_perc",
];

/// One row of a full-column report. Timings are kept as written so they can
/// be copied to the diff unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimingRow {
    pub target: String,
    pub work_type: String,
    pub sys_time: String,
    pub user_time: String,
    pub total: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Samples {
    pub sys_time: f64,
    pub user_time: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub path: PathBuf,
    pub rows: Vec<TimingRow>,
}

impl Report {
    pub fn samples(&self, row: &TimingRow) -> Result<Samples, ReportError> {
        let parse = |column: &'static str, value: &str| {
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| ReportError::BadValue {
                    path: self.path.clone(),
                    target: row.target.clone(),
                    column,
                    value: value.to_string(),
                })
        };

        Ok(Samples {
            sys_time: parse("sys_time", &row.sys_time)?,
            user_time: parse("user_time", &row.user_time)?,
            total: parse("total", &row.total)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Delta {
    pub seconds: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiffRow {
    pub row: TimingRow,
    pub sys_time: Delta,
    pub user_time: Delta,
    pub total: Delta,
}
