//! Per-target comparison of two full-column reports.
//!
//! Differences are `compare - base`, so a negative value means the compare
//! build got faster.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufWriter},
    path::Path,
};

use crate::{error::ReportError, export::format_seconds, types::round_hundredths};

pub mod types;

use self::types::{Delta, DiffRow, Report, Samples, TimingRow, DIFF_HEADER};

pub fn diff_seconds(base: f64, compare: f64) -> f64 {
    round_hundredths(compare - base)
}

pub fn diff_percent(base: f64, compare: f64) -> f64 {
    if base == 0.0 {
        return 0.0;
    }

    round_hundredths((compare - base) / base * 100.0)
}

pub fn delta(base: f64, compare: f64) -> Delta {
    Delta {
        seconds: diff_seconds(base, compare),
        percent: diff_percent(base, compare),
    }
}

pub fn read_report(path: &Path) -> Result<Report, ReportError> {
    if !path.is_file() {
        return Err(ReportError::MissingReport(path.to_path_buf()));
    }

    let csv_err = |source: csv::Error| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let rows = reader
        .deserialize::<TimingRow>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_err)?;

    Ok(Report {
        path: path.to_path_buf(),
        rows,
    })
}

/// Rows come out in the order targets first appear in `compare`; a target
/// listed twice keeps its last row.
pub fn compare(base: &Report, compare: &Report) -> Result<Vec<DiffRow>, ReportError> {
    let base_rows: HashMap<&str, &TimingRow> = base
        .rows
        .iter()
        .map(|row| (row.target.as_str(), row))
        .collect();

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut ordered: Vec<&TimingRow> = Vec::new();
    for row in &compare.rows {
        match index.get(row.target.as_str()) {
            Some(&at) => ordered[at] = row,
            None => {
                index.insert(row.target.as_str(), ordered.len());
                ordered.push(row);
            }
        }
    }

    if ordered.is_empty() {
        return Err(ReportError::EmptyComparison(compare.path.clone()));
    }

    ordered
        .into_iter()
        .map(|row| -> Result<DiffRow, ReportError> {
            let current = compare.samples(row)?;
            let previous = match base_rows.get(row.target.as_str()) {
                Some(base_row) => Some(base.samples(base_row)?),
                None => {
                    tracing::warn!(
                        target_name = row.target.as_str(),
                        base = %base.path.display(),
                        "target missing from base report"
                    );
                    None
                }
            };

            Ok(diff_row(row, previous, current))
        })
        .collect()
}

fn diff_row(row: &TimingRow, base: Option<Samples>, current: Samples) -> DiffRow {
    let (sys_time, user_time, total) = match base {
        Some(base) => (
            delta(base.sys_time, current.sys_time),
            delta(base.user_time, current.user_time),
            delta(base.total, current.total),
        ),
        None => Default::default(),
    };

    DiffRow {
        row: row.clone(),
        sys_time,
        user_time,
        total,
    }
}

pub fn write_diff<W: io::Write>(writer: W, rows: &[DiffRow]) -> Result<(), csv::Error> {
    let mut csvwriter = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);

    csvwriter.write_record(DIFF_HEADER)?;

    for diff in rows {
        csvwriter.write_field(&diff.row.target)?;
        csvwriter.write_field(&diff.row.work_type)?;
        csvwriter.write_field(&diff.row.sys_time)?;
        csvwriter.write_field(&diff.row.user_time)?;
        csvwriter.write_field(&diff.row.total)?;

        for value in [
            diff.sys_time.seconds,
            diff.user_time.seconds,
            diff.total.seconds,
            diff.sys_time.percent,
            diff.user_time.percent,
            diff.total.percent,
        ] {
            csvwriter.write_field(format_seconds(value))?;
        }

        csvwriter.write_record(None::<&[u8]>)?;
    }

    csvwriter.flush()?;

    Ok(())
}

pub fn compare_reports(base: &Path, other: &Path, output: &Path) -> Result<usize, ReportError> {
    let base = read_report(base)?;
    let other = read_report(other)?;

    let rows = compare(&base, &other)?;

    let out = File::create(output)
        .map(BufWriter::new)
        .map_err(|source| ReportError::Write {
            path: output.to_path_buf(),
            source,
        })?;
    write_diff(out, &rows).map_err(|source| ReportError::Csv {
        path: output.to_path_buf(),
        source,
    })?;

    tracing::info!(output = %output.display(), rows = rows.len(), "wrote report diff");

    Ok(rows.len())
}
