use anyhow::{Context, Result};
use build_time_reader::{
    cli::{Cli, Command},
    compare::compare_reports,
    export::{check_report_collisions, export_log, resolve_logs, ExportSummary, Sink},
    types::Variant,
};
use clap::Parser;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn export_all(pattern: &str, variant: &Variant, sink: &Sink) -> Result<()> {
    let logs = resolve_logs(pattern, sink.report_extension())?;
    check_report_collisions(&logs, sink)?;

    let summaries = logs
        .par_iter()
        .map(|log| export_log(log, variant, sink))
        .collect::<Result<Vec<ExportSummary>, _>>()?;

    for summary in summaries {
        let outputs = match summary.outputs.as_slice() {
            [single] => single.display().to_string(),
            many => format!("{} files", many.len()),
        };
        println!(
            "{} -> {} ({} units, {} skipped)",
            summary.input.display(),
            outputs,
            summary.units,
            summary.skipped
        );
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Analyze(args) => export_all(&args.log, &args.variant(), &args.sink()),
        Command::Export(args) => export_all(&args.log, &args.variant(), &args.sink()),
        Command::Split(args) => export_all(&args.log, &args.variant(), &args.sink()),
        Command::Diff(args) => {
            let rows = compare_reports(&args.base, &args.compare, &args.output)
                .with_context(|| format!("comparing {}", args.compare.display()))?;
            println!("{} targets -> {}", rows, args.output.display());
            Ok(())
        }
    }
}
