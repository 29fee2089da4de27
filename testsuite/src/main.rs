use anyhow::Result;
use clap::Parser;
use std::io::{Write, stdout};
use std::path::PathBuf;
use std::process::ExitCode;
use tessera::RdfFormat;
use tessera_testsuite::report::{SuiteStatus, write_report};
use tessera_testsuite::{SUITE_FORMATS, default_evaluator, parse_suite_name, run_suite};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about, version)]
/// Runs the W3C conformance test suites of the Tessera codecs
struct Args {
    /// Directory containing one test suite directory per format
    /// (turtle, ntriples, trig, nquads, rdfxml or rdf-xml, jsonld)
    suite_root: PathBuf,
    /// Only run the test suite of this format. Can be repeated
    #[arg(short, long = "format", value_parser = parse_suite_name)]
    formats: Vec<RdfFormat>,
    /// Write the logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr);
    if args.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let formats = if args.formats.is_empty() {
        SUITE_FORMATS.to_vec()
    } else {
        args.formats
    };
    let evaluator = default_evaluator();
    let reports = formats
        .into_iter()
        .map(|format| run_suite(&evaluator, &args.suite_root, format))
        .collect::<Result<Vec<_>>>()?;

    let mut output = stdout().lock();
    write_report(&reports, &mut output)?;
    output.flush()?;

    Ok(
        if reports.iter().any(|report| {
            matches!(
                report.status(),
                SuiteStatus::AllFailing | SuiteStatus::PartiallyFailing
            )
        }) {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        },
    )
}
