use annex_watch::cli::check::CheckOptions;
use annex_watch::{Config, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "annex-watch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Watches the COSING annex spreadsheets and commits updated copies", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (default: ./annex-watch.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every annex once and publish the ones that changed
    Check {
        /// Locate and compare only; download and write nothing
        #[arg(long)]
        dry_run: bool,

        /// Keep downloaded files local even if a repository is configured
        #[arg(long)]
        no_publish: bool,

        /// Print the run report as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the recorded freshness markers
    Status {
        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },

    /// List tracked annexes and their index pages
    List,

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    annex_watch::logging::init_logging(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}", format!("Error: failed to create runtime: {}", e).red());
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run_async(cli)) {
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}

async fn run_async(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        generate(shell, &mut Cli::command(), "annex-watch", &mut io::stdout());
        return Ok(());
    }

    let workdir = std::env::current_dir()?;
    let config = Config::load(cli.config.as_deref(), &workdir)?
        .with_env_overrides(|key| std::env::var(key).ok());

    match cli.command {
        Commands::Check {
            dry_run,
            no_publish,
            json,
        } => {
            let opts = CheckOptions {
                dry_run,
                no_publish,
                json,
            };
            annex_watch::cli::check::run(&config, &workdir, opts).await?;
        }

        Commands::Status { json } => {
            annex_watch::cli::status::run(&config, &workdir, json)?;
        }

        Commands::List => {
            annex_watch::cli::list::run(&config, &workdir)?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
