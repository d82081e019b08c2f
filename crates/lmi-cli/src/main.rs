mod market;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "lmi-cli")]
#[command(about = "Local market intelligence: scrape, score and map nearby businesses")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape live listings for a business type in a city and analyze them
    Search {
        #[command(flatten)]
        query: QueryArgs,
        #[command(flatten)]
        output: OutputArgs,
        /// Ask the narrative provider for a short market summary
        #[arg(long)]
        insights: bool,
    },
    /// Analyze a saved raw dataset (JSON array of scrape records)
    Analyze {
        /// Path to the raw JSON dataset
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        query: QueryArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the resolved configuration (secrets redacted)
    Config,
}

#[derive(Debug, Clone, Args)]
struct QueryArgs {
    /// Business category, e.g. "plumber"
    #[arg(long)]
    business_type: Option<String>,
    /// City, optionally with province or state, e.g. "Calgary, AB"
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    country: Option<String>,
    /// Maximum places to scrape (defaults to `LMI_DEFAULT_MAX_RESULTS`)
    #[arg(long)]
    max_results: Option<u32>,
    /// Drop businesses with fewer reviews than this
    #[arg(long, default_value_t = 0)]
    min_reviews: u64,
}

#[derive(Debug, Clone, Args)]
struct OutputArgs {
    /// Number of most-reviewed businesses to list
    #[arg(long, default_value_t = 5)]
    top: usize,
    /// Write the CSV export to this path
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Write the map view (center, zoom, markers) as JSON to this path
    #[arg(long)]
    markers: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = lmi_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Search {
            query,
            output,
            insights,
        }) => market::run_search(&config, &query, &output, insights).await,
        Some(Commands::Analyze {
            input,
            query,
            output,
        }) => market::run_analyze(&config, &input, &query, &output),
        Some(Commands::Config) => {
            println!("{config:#?}");
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("lmi-cli: run `lmi-cli --help` for available commands");
            Ok(ExitCode::SUCCESS)
        }
    }
}
