use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "ingot")]
#[command(version, about = "Build and install PHP releases from source")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Answer yes to every prompt
    #[arg(long, global = true)]
    pub yes: bool,

    /// Path to the config file. Defaults to <root>/ingot.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Installation root holding the checkout, versions, and logs
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build and install one release
    Install {
        /// Release version, e.g. 8.3.7
        release: String,

        /// Named option variant from the config file
        #[arg(long)]
        variant: Option<String>,

        /// Resume a failed install after the given step
        #[arg(short = 'c', long = "continue", value_name = "STEP")]
        continue_from: Option<usize>,

        /// php.ini template: a suffix like "development" or a file path
        #[arg(short, long)]
        ini: Option<String>,
    },
    /// List the releases available in the upstream source tree
    Releases,
    /// Drop build artifacts from the source checkout
    Clean {
        /// Also remove ignored files and the download cache
        #[arg(long)]
        deep: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "ingot=debug" } else { "ingot=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Install {
            release,
            variant,
            continue_from,
            ini,
        } => {
            cmd::cmd_install(
                &cli,
                release,
                variant.as_deref(),
                *continue_from,
                ini.as_deref(),
            )
            .await
        }
        Commands::Releases => cmd::cmd_releases(&cli).await,
        Commands::Clean { deep } => cmd::cmd_clean(&cli, *deep).await,
    };

    if let Err(err) = result {
        eprintln!("{} {err}", console::style("error:").red().bold());
        std::process::exit(err.exit_code());
    }
}
