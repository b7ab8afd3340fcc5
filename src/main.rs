// CLI shim around the analysis pipeline: one input file in, one JSON record
// out. Fatal errors become an {"error": ...} record and a nonzero exit.
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde_json::json;

use fraud_clustering::config::DEFAULT_CLUSTERS;
use fraud_clustering::{run_analysis, AnalysisConfig};

#[derive(Parser)]
#[command(
    name = "fraud_clustering",
    about = "K-Means cluster analysis of a transaction dataset"
)]
struct Cli {
    /// Delimited transaction file with a header row.
    input: PathBuf,

    /// Number of clusters (must be between 1 and the record count).
    #[arg(short = 'k', long = "clusters", default_value_t = DEFAULT_CLUSTERS)]
    clusters: usize,

    /// Skip the decision-boundary render.
    #[arg(long)]
    no_plot: bool,

    /// Grid cells per axis for the decision-boundary render.
    #[arg(long, default_value_t = 1000)]
    grid_resolution: usize,
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();
    let cli = Cli::parse();

    let cfg = AnalysisConfig {
        grid_resolution: cli.grid_resolution,
        render_plot: !cli.no_plot,
        ..AnalysisConfig::default()
    };

    match run_analysis(&cli.input, cli.clusters, &cfg) {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "error": err.to_string() }))?
            );
            Ok(ExitCode::FAILURE)
        }
    }
}
