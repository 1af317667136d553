//! Command line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{
    export::{Columns, ReportOptions, Sink},
    types::{Variant, DEFAULT_LINK_FLAG, DEFAULT_TOOL},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Csv,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColumnSet {
    /// work_type:target,total
    Compact,
    /// target,sys_time,user_time,total,work_type
    Full,
}

impl From<ColumnSet> for Columns {
    fn from(value: ColumnSet) -> Self {
        match value {
            ColumnSet::Compact => Columns::Compact,
            ColumnSet::Full => Columns::Full,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "build-time-reader")]
#[command(version)]
#[command(about = "Extract per-target compile and link times from build logs", long_about = None)]
pub struct Cli {
    /// Log skipped units and written reports to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan "Building"/"Linking CXX executable" markers into <LOG>.csv
    Analyze(AnalyzeArgs),
    /// Scan compiler invocation lines into <LOG>.csv with all timing columns
    Export(ExportArgs),
    /// Write one CSV per unit into a directory
    Split(SplitArgs),
    /// Compare two exported reports target by target
    Diff(DiffArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Build log, or a glob pattern matching several logs
    pub log: String,

    /// Only accept markers whose next line contains this text
    #[arg(long, value_name = "TEXT")]
    pub require_invocation: Option<String>,

    /// Write a header row
    #[arg(long)]
    pub header: bool,

    #[arg(long, value_enum, default_value = "compact")]
    pub columns: ColumnSet,

    #[arg(long, value_enum, default_value = "csv")]
    pub format: ReportFormat,
}

impl AnalyzeArgs {
    pub fn variant(&self) -> Variant {
        Variant::Marker {
            invocation: self.require_invocation.clone(),
        }
    }

    pub fn sink(&self) -> Sink {
        match self.format {
            ReportFormat::Csv => Sink::Csv(ReportOptions {
                columns: self.columns.into(),
                header: self.header,
            }),
            ReportFormat::Json => Sink::Json,
        }
    }
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Build log, or a glob pattern matching several logs
    pub log: String,

    /// Lines containing this text are compiler invocations
    #[arg(long, default_value = DEFAULT_TOOL)]
    pub tool: String,

    /// Invocations containing this text are link steps
    #[arg(long, default_value = DEFAULT_LINK_FLAG, allow_hyphen_values = true)]
    pub link_flag: String,

    #[arg(long, value_enum, default_value = "csv")]
    pub format: ReportFormat,
}

impl ExportArgs {
    pub fn variant(&self) -> Variant {
        Variant::Invocation {
            tool: self.tool.clone(),
            link_flag: self.link_flag.clone(),
        }
    }

    pub fn sink(&self) -> Sink {
        match self.format {
            ReportFormat::Csv => Sink::Csv(ReportOptions::full()),
            ReportFormat::Json => Sink::Json,
        }
    }
}

#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Build log, or a glob pattern matching several logs
    pub log: String,

    #[arg(long, value_name = "DIR", default_value = "build_times")]
    pub out_dir: PathBuf,

    /// Only accept markers whose next line contains this text
    #[arg(long, value_name = "TEXT")]
    pub require_invocation: Option<String>,
}

impl SplitArgs {
    pub fn variant(&self) -> Variant {
        Variant::Marker {
            invocation: self.require_invocation.clone(),
        }
    }

    pub fn sink(&self) -> Sink {
        Sink::Units {
            dir: self.out_dir.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Report of the baseline build
    pub base: PathBuf,

    /// Report of the build to compare against the baseline
    pub compare: PathBuf,

    #[arg(short, long, default_value = "diff.csv")]
    pub output: PathBuf,
}
