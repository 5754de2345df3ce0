//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs the log subscriber
//! - resolves the analysis configuration
//! - loads or generates the dataset
//! - runs the batch operations
//! - prints reports and writes exports

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::batch::analyze_all;
use crate::cli::{AnalyzeArgs, Cli, Command, DemoArgs, ExportArgs};
use crate::data::{SampleSpec, generate_dataset};
use crate::domain::{AnalysisConfig, Dataset};
use crate::error::AppError;
use crate::io::write_table_file;
use crate::report::{format_entity_summary, format_failures, format_run_header, format_table};

pub mod pipeline;

/// Entry point for the `gs` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Export(args) => handle_export(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = pipeline::resolve_config(&args.analysis)?;
    let ingest = pipeline::load_input(&args.input)?;
    print_analysis(&ingest.dataset, &config)
}

fn handle_export(args: ExportArgs) -> Result<(), AppError> {
    let config = pipeline::resolve_config(&args.analysis)?;
    let ingest = pipeline::load_input(&args.input)?;
    let out = pipeline::build_table(&ingest.dataset, &config, args.table)?;

    write_table_file(&args.out, &out.table)?;

    eprint!("{}", format_failures(&out.failures));
    println!(
        "Wrote {} ({} entities) to {}",
        args.table.file_stem(),
        out.table.columns.len(),
        args.out.display()
    );
    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = pipeline::resolve_config(&args.analysis)?;
    let dataset = generate_dataset(&SampleSpec {
        entities: args.entities,
        seed: args.seed,
        ..SampleSpec::default()
    })?;
    print_analysis(&dataset, &config)?;

    let out = pipeline::build_table(&dataset, &config, args.table)?;
    println!("{}:", args.table.file_stem());
    println!("{}", format_table(&out.table, 4));
    Ok(())
}

fn print_analysis(dataset: &Dataset, config: &AnalysisConfig) -> Result<(), AppError> {
    let results = analyze_all(dataset, config)?;

    println!("{}", format_run_header(dataset, config));
    for (_, analysis) in &results.results {
        println!("{}", format_entity_summary(analysis));
    }
    print!("{}", format_failures(&results.failures));
    Ok(())
}
