use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {}", .path.display(), .source)]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error in {}: {}", .path.display(), .source)]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write json report {}: {}", .path.display(), .source)]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid log pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("no build logs match {0:?}")]
    NoMatches(String),

    #[error("report {} would overwrite its own input", .0.display())]
    OverwritesInput(PathBuf),

    #[error(
        "{} and {} would both write report {}",
        .first.display(),
        .second.display(),
        .report.display()
    )]
    ReportCollision {
        report: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("can't find report {}", .0.display())]
    MissingReport(PathBuf),

    #[error("no records found in {}", .0.display())]
    EmptyComparison(PathBuf),

    #[error("bad {} value {:?} for target {} in {}", .column, .value, .target, .path.display())]
    BadValue {
        path: PathBuf,
        target: String,
        column: &'static str,
        value: String,
    },
}
