//! # Beamsmith CLI
//!
//! Thin I/O glue around the `beam_core` engine: parse arguments, run one
//! analysis pipeline to completion, write the report atomically.
//!
//! The pipeline is synchronous and request-scoped: one invocation loads one
//! table, produces one report, and owns every intermediate structure for
//! exactly that long. The renderer is checked before any file processing so
//! a broken rendering setup never leaves partial artifacts behind.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use uuid::Uuid;

use beam_core::errors::BeamResult;
use beam_core::{analysis, report, schema, table};

#[derive(Parser, Debug)]
#[command(name = "beam_cli")]
#[command(about = "Generate a beam analysis report from tabular input", long_about = None)]
#[command(version)]
struct Cli {
    /// Input table: point loads (Position/Load) or precomputed results
    /// (x/shear/moment), as .csv or a spreadsheet
    table: PathBuf,

    /// Beam configuration image to embed; a default schematic is drawn
    /// when omitted
    #[arg(long)]
    image: Option<PathBuf>,

    /// Output PDF path (defaults to Report_<id>.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn run(cli: Cli) -> BeamResult<PathBuf> {
    // Renderer check comes first: fail before touching any input
    report::preflight()?;

    let mut data = table::load_table(&cli.table)?;

    schema::map_columns(&mut data);
    let mode = schema::validate(&data)?;
    log::info!("analysis mode: {:?}", mode);

    let solution = analysis::solve_table(&data, mode)?;
    let pdf_bytes = report::render_report(&data, &solution, cli.image.as_deref())?;

    let output = cli.output.unwrap_or_else(default_output_path);
    report::save_report(&pdf_bytes, &output)?;

    Ok(output)
}

fn default_output_path() -> PathBuf {
    let id = Uuid::new_v4().simple().to_string();
    PathBuf::from(format!("Report_{}.pdf", &id[..8]))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(output) => {
            println!("Report written to {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                eprintln!();
                eprintln!("Error JSON:");
                eprintln!("{}", json);
            }
            ExitCode::FAILURE
        }
    }
}
