use anyhow::Result;
use clap::{Parser, Subcommand};
use pagexray_cli::{OutputFormat, commands};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pagexray")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Turn HTTP Archive (HAR) files into per-page size, cache and request summaries",
    long_about = "pagexray walks the entries of a HAR file, groups them into pages and reports \
                  byte sizes, response codes, content types, cache freshness, first/third-party \
                  splits and redirect chains for every page."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize every page in a HAR file
    Convert {
        /// Path to the HAR file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Keep per-asset details in the output
        #[arg(long)]
        include_assets: bool,

        /// Regex matching first-party asset URLs (enables the first/third-party split)
        #[arg(long, value_name = "REGEX")]
        first_party: Option<String>,

        /// Write the output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    match cli.command {
        Commands::Convert {
            file,
            include_assets,
            first_party,
            output,
        } => commands::convert::execute(
            &file,
            include_assets,
            first_party.as_deref(),
            output,
            cli.format,
        ),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("pagexray=debug,pagexray_cli=debug,pagexray_core=debug")
    } else {
        EnvFilter::new("pagexray=info,pagexray_cli=info,pagexray_core=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
