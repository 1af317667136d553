use std::{
    collections::{HashMap, HashSet},
    fs::{self, File},
    io::{self, BufWriter, Read},
    path::{Path, PathBuf},
};

use crate::{
    error::ReportError,
    parser::LogScanner,
    types::{ScanEvent, TimingRecord, Variant},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Columns {
    /// `work_type:target,total`
    #[default]
    Compact,
    /// `target,sys_time,user_time,total,work_type`
    Full,
}

impl Columns {
    pub fn header(self) -> &'static [&'static str] {
        match self {
            Columns::Compact => &["work_type", "total"],
            Columns::Full => &["target", "sys_time", "user_time", "total", "work_type"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportOptions {
    pub columns: Columns,
    pub header: bool,
}

impl ReportOptions {
    pub fn full() -> Self {
        ReportOptions {
            columns: Columns::Full,
            header: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    /// `<log stem>.csv` next to the log.
    Csv(ReportOptions),
    /// `<log stem>.json` next to the log.
    Json,
    /// One full CSV per unit, named after the target's file name.
    Units { dir: PathBuf },
}

impl Sink {
    /// Extension of the report written next to each log, if any.
    pub fn report_extension(&self) -> Option<&'static str> {
        match self {
            Sink::Csv(_) => Some("csv"),
            Sink::Json => Some("json"),
            Sink::Units { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub input: PathBuf,
    pub outputs: Vec<PathBuf>,
    pub units: usize,
    pub skipped: usize,
}

/// Renders seconds the way the reports have always looked: `1.5`, `2.0`.
pub fn format_seconds(value: f64) -> String {
    format!("{:?}", value)
}

pub fn write_csv<W: io::Write>(
    writer: W,
    records: &[TimingRecord],
    options: ReportOptions,
) -> Result<(), csv::Error> {
    let mut csvwriter = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);

    if options.header {
        csvwriter.write_record(options.columns.header())?;
    }

    for record in records {
        match options.columns {
            Columns::Compact => {
                csvwriter.write_field(record.label())?;
                csvwriter.write_field(format_seconds(record.total))?;
            }
            Columns::Full => {
                csvwriter.write_field(record.target)?;
                csvwriter.write_field(format_seconds(record.sys_time))?;
                csvwriter.write_field(format_seconds(record.user_time))?;
                csvwriter.write_field(format_seconds(record.total))?;
                csvwriter.write_field(record.work_type.as_str())?;
            }
        }
        csvwriter.write_record(None::<&[u8]>)?;
    }

    csvwriter.flush()?;

    Ok(())
}

pub fn write_json<W: io::Write>(writer: W, records: &[TimingRecord]) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(writer, records)
}

pub fn report_path(input: &Path, extension: &str) -> PathBuf {
    input.with_extension(extension)
}

fn checked_report_path(input: &Path, extension: &str) -> Result<PathBuf, ReportError> {
    let out = report_path(input, extension);

    if out == input {
        return Err(ReportError::OverwritesInput(out));
    }

    Ok(out)
}

pub fn unit_file_name(target: &str) -> String {
    let name = Path::new(target)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(target);

    format!("{}.csv", name)
}

pub fn read_log(path: &Path) -> Result<String, ReportError> {
    let read_err = |source: io::Error| ReportError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut infile = File::open(path).map_err(read_err)?;
    let mut content = Vec::new();
    infile.read_to_end(&mut content).map_err(read_err)?;

    Ok(String::from_utf8_lossy(&content).into_owned())
}

fn create(path: &Path) -> Result<BufWriter<File>, ReportError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })
}

pub fn export_csv(
    path: &Path,
    records: &[TimingRecord],
    options: ReportOptions,
) -> Result<(), ReportError> {
    write_csv(create(path)?, records, options).map_err(|source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

pub fn export_json(path: &Path, records: &[TimingRecord]) -> Result<(), ReportError> {
    let mut out = create(path)?;

    write_json(&mut out, records).map_err(|source| ReportError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    io::Write::flush(&mut out).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn export_units(dir: &Path, records: &[TimingRecord]) -> Result<Vec<PathBuf>, ReportError> {
    fs::create_dir_all(dir).map_err(|source| ReportError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut outputs = Vec::with_capacity(records.len());
    let mut written = HashSet::new();
    for record in records {
        let path = dir.join(unit_file_name(record.target));
        export_csv(&path, std::slice::from_ref(record), ReportOptions::full())?;

        if written.insert(path.clone()) {
            outputs.push(path);
        } else {
            tracing::warn!(
                report = %path.display(),
                unit = record.target,
                "unit report name repeats, earlier unit overwritten"
            );
        }
    }

    Ok(outputs)
}

fn log_skipped(path: &Path, event: &ScanEvent) {
    match event {
        ScanEvent::Unit(_) => {}
        ScanEvent::Placeholder { marker } => tracing::debug!(
            log = %path.display(),
            line = marker.line + 1,
            unit = marker.target,
            "marker not followed by a compiler invocation"
        ),
        ScanEvent::Untargeted { line } => tracing::debug!(
            log = %path.display(),
            line = line + 1,
            "compiler invocation without an output target"
        ),
        ScanEvent::Malformed { marker, line } => tracing::debug!(
            log = %path.display(),
            line = line + 1,
            unit = marker.target,
            "malformed timing line, unit dropped"
        ),
        ScanEvent::Truncated { marker } => tracing::debug!(
            log = %path.display(),
            line = marker.line + 1,
            unit = marker.target,
            "log ends before timing line"
        ),
    }
}

pub fn export_log(path: &Path, variant: &Variant, sink: &Sink) -> Result<ExportSummary, ReportError> {
    let content = read_log(path)?;

    let mut records = Vec::new();
    let mut skipped = 0;
    for event in LogScanner::new(&content, variant) {
        match event {
            ScanEvent::Unit(record) => records.push(record),
            other => {
                log_skipped(path, &other);
                skipped += 1;
            }
        }
    }

    let outputs = match sink {
        Sink::Csv(options) => {
            let out = checked_report_path(path, "csv")?;
            export_csv(&out, &records, *options)?;
            vec![out]
        }
        Sink::Json => {
            let out = checked_report_path(path, "json")?;
            export_json(&out, &records)?;
            vec![out]
        }
        Sink::Units { dir } => export_units(dir, &records)?,
    };

    tracing::info!(
        log = %path.display(),
        units = records.len(),
        skipped,
        outputs = outputs.len(),
        "exported build timings"
    );

    Ok(ExportSummary {
        input: path.to_path_buf(),
        outputs,
        units: records.len(),
        skipped,
    })
}

/// Fails when two logs would write the same report, e.g. `build.log` and
/// `build.txt` both map to `build.csv`.
pub fn check_report_collisions(logs: &[PathBuf], sink: &Sink) -> Result<(), ReportError> {
    let Some(extension) = sink.report_extension() else {
        return Ok(());
    };

    let mut reports: HashMap<PathBuf, &PathBuf> = HashMap::new();
    for log in logs {
        let report = report_path(log, extension);
        if let Some(first) = reports.insert(report.clone(), log) {
            return Err(ReportError::ReportCollision {
                report,
                first: first.clone(),
                second: log.clone(),
            });
        }
    }

    Ok(())
}

/// A plain path is taken as-is so that a missing log fails on read. Anything
/// with glob metacharacters is expanded and must match at least one file.
/// Matches ending in `report_extension` are earlier reports, not logs, and
/// are left out.
pub fn resolve_logs(
    pattern: &str,
    report_extension: Option<&str>,
) -> Result<Vec<PathBuf>, ReportError> {
    if !pattern.contains(|c: char| matches!(c, '*' | '?' | '[')) {
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let entries = glob::glob(pattern).map_err(|source| ReportError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let paths = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!("skipping unreadable match: {}", err);
                None
            }
        })
        .filter(|path| path.is_file())
        .filter(|path| {
            let is_report = report_extension.is_some()
                && path.extension().and_then(|ext| ext.to_str()) == report_extension;
            if is_report {
                tracing::debug!(path = %path.display(), "skipping earlier report");
            }
            !is_report
        })
        .collect::<Vec<_>>();

    if paths.is_empty() {
        return Err(ReportError::NoMatches(pattern.to_string()));
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Marker, TimingLine, WorkType};

    fn record<'a>(work_type: WorkType, target: &'a str, sys: f64, user: f64) -> TimingRecord<'a> {
        TimingRecord::new(
            Marker {
                line: 0,
                work_type,
                target,
            },
            TimingLine {
                sys_time: sys,
                user_time: user,
            },
        )
    }

    fn render(records: &[TimingRecord], options: ReportOptions) -> String {
        let mut out = Vec::new();
        write_csv(&mut out, records, options).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_compact_rows() {
        let records = [
            record(WorkType::Build, "foo.o", 1.2, 0.3),
            record(WorkType::Linking, "app", 1.0, 1.0),
        ];

        assert_eq!(
            render(&records, ReportOptions::default()),
            "build:foo.o,1.5\r\nlinking:app,2.0\r\n"
        );
    }

    #[test]
    fn test_full_rows_with_header() {
        let records = [record(WorkType::Build, "foo.o", 1.2, 0.3)];

        assert_eq!(
            render(&records, ReportOptions::full()),
            "target,sys_time,user_time,total,work_type\r\nfoo.o,1.2,0.3,1.5,build\r\n"
        );
    }

    #[test]
    fn test_header_only_when_empty() {
        let options = ReportOptions {
            columns: Columns::Compact,
            header: true,
        };

        assert_eq!(render(&[], options), "work_type,total\r\n");
        assert_eq!(render(&[], ReportOptions::default()), "");
    }

    #[test]
    fn test_json_records() {
        let mut out = Vec::new();
        write_json(&mut out, &[record(WorkType::Linking, "app", 0.1, 0.05)]).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["work_type"], "linking");
        assert_eq!(value[0]["target"], "app");
        assert_eq!(value[0]["total"], 0.15);
    }

    #[test]
    fn test_report_path() {
        assert_eq!(
            report_path(Path::new("logs/build.log"), "csv"),
            PathBuf::from("logs/build.csv")
        );
        assert_eq!(report_path(Path::new("build"), "csv"), PathBuf::from("build.csv"));
        assert!(matches!(
            checked_report_path(Path::new("report.csv"), "csv"),
            Err(ReportError::OverwritesInput(_))
        ));
    }

    #[test]
    fn test_unit_file_name() {
        assert_eq!(unit_file_name("src/CMakeFiles/a.dir/a.cpp.o"), "a.cpp.o.csv");
        assert_eq!(unit_file_name("app"), "app.csv");
    }

    #[test]
    fn test_export_log_csv() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("build.log");
        fs::write(
            &log,
            "Building foo.o\ng++ -c foo.cpp\n1.20\t0.30\nBuilding bar.o\ng++\noops\n",
        )
        .unwrap();

        let summary = export_log(&log, &Variant::default(), &Sink::Csv(ReportOptions::default()))
            .unwrap();

        assert_eq!(summary.units, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.outputs, vec![dir.path().join("build.csv")]);
        assert_eq!(
            fs::read_to_string(dir.path().join("build.csv")).unwrap(),
            "build:foo.o,1.5\r\n"
        );
    }

    #[test]
    fn test_export_units() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("units");
        let records = [
            record(WorkType::Build, "obj/a.o", 0.5, 0.5),
            record(WorkType::Linking, "bin/app", 0.25, 0.25),
        ];

        let outputs = export_units(&out_dir, &records).unwrap();

        assert_eq!(outputs, vec![out_dir.join("a.o.csv"), out_dir.join("app.csv")]);
        assert_eq!(
            fs::read_to_string(out_dir.join("app.csv")).unwrap(),
            "target,sys_time,user_time,total,work_type\r\nbin/app,0.25,0.25,0.5,linking\r\n"
        );
    }

    #[test]
    fn test_missing_log_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.log");

        let err = export_log(&missing, &Variant::default(), &Sink::Json).unwrap_err();
        assert!(matches!(err, ReportError::Read { .. }));
    }

    #[test]
    fn test_resolve_logs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.log"), "").unwrap();
        fs::write(dir.path().join("b.log"), "").unwrap();
        fs::write(dir.path().join("c.txt"), "").unwrap();

        let pattern = format!("{}/*.log", dir.path().display());
        let mut paths = resolve_logs(&pattern, Some("csv")).unwrap();
        paths.sort();
        assert_eq!(paths, vec![dir.path().join("a.log"), dir.path().join("b.log")]);

        let none = format!("{}/*.nothing", dir.path().display());
        assert!(matches!(resolve_logs(&none, None), Err(ReportError::NoMatches(_))));

        assert_eq!(
            resolve_logs("plain/path.log", Some("csv")).unwrap(),
            vec![PathBuf::from("plain/path.log")]
        );
    }

    #[test]
    fn test_resolve_logs_skips_reports() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("build.log"), "").unwrap();
        fs::write(dir.path().join("build.csv"), "").unwrap();
        fs::write(dir.path().join("build.json"), "").unwrap();
        let pattern = format!("{}/build.*", dir.path().display());

        let mut csv_inputs = resolve_logs(&pattern, Some("csv")).unwrap();
        csv_inputs.sort();
        assert_eq!(
            csv_inputs,
            vec![dir.path().join("build.json"), dir.path().join("build.log")]
        );

        let json_inputs = resolve_logs(&pattern, Some("json")).unwrap();
        assert!(!json_inputs.contains(&dir.path().join("build.json")));

        let only_reports = format!("{}/*.csv", dir.path().display());
        assert!(matches!(
            resolve_logs(&only_reports, Some("csv")),
            Err(ReportError::NoMatches(_))
        ));
    }

    #[test]
    fn test_report_collisions() {
        let logs = vec![
            PathBuf::from("logs/build.log"),
            PathBuf::from("logs/other.log"),
            PathBuf::from("logs/build.txt"),
        ];

        let err = check_report_collisions(&logs, &Sink::Csv(ReportOptions::default())).unwrap_err();
        assert!(matches!(
            err,
            ReportError::ReportCollision { ref report, ref first, ref second }
                if report == &PathBuf::from("logs/build.csv")
                    && first == &PathBuf::from("logs/build.log")
                    && second == &PathBuf::from("logs/build.txt")
        ));

        let units = Sink::Units {
            dir: PathBuf::from("out"),
        };
        assert!(check_report_collisions(&logs, &units).is_ok());
        assert!(check_report_collisions(&logs[..2], &Sink::Json).is_ok());
    }

    #[test]
    fn test_export_units_repeated_name() {
        let dir = tempfile::tempdir().unwrap();
        let records = [
            record(WorkType::Build, "lib/CMakeFiles/a.dir/util.cpp.o", 1.0, 1.0),
            record(WorkType::Build, "app/CMakeFiles/b.dir/util.cpp.o", 2.0, 2.0),
        ];

        let outputs = export_units(dir.path(), &records).unwrap();

        assert_eq!(outputs, vec![dir.path().join("util.cpp.o.csv")]);
        assert!(fs::read_to_string(dir.path().join("util.cpp.o.csv"))
            .unwrap()
            .contains("app/CMakeFiles/b.dir/util.cpp.o,2.0,2.0,4.0,build"));
    }
}
