//! Wharf CLI - release engineering for multi-component distributions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use wharf_repo::WharfConfig;

mod commands;
mod display;
mod error;
mod exit_codes;
mod logging;

use commands::ResolveArgs;
use commands::release::ReleaseArgs;
use commands::version::VersionOp;
use error::Result;

#[derive(Parser)]
#[command(name = "wharf")]
#[command(author = "Wharf Contributors")]
#[command(version)]
#[command(about = "Release engineering for multi-component distributions", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show what would change without changing anything
    #[arg(short = 'P', long, global = true)]
    pretend: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Configuration file (default: ./.wharf.yaml, then the user config dir)
    #[arg(long, global = true, env = "WHARF_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the dependency tree of a component
    Deps {
        /// Component checkout
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Install a component with its dependencies
    Install {
        /// Component checkout
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Export every component into this directory and install from there
        #[arg(long, value_name = "DIR")]
        export: Option<PathBuf>,

        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Run release tasks
    Release(ReleaseArgs),

    /// Recompute legacy constraints and write manifest.json
    Update {
        /// Component checkout
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Build a timestamped development archive
    Snapshot {
        /// Component checkout
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Directory receiving the archive (default: the checkout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Evaluate a version operation
    Version {
        #[arg(value_enum)]
        op: VersionOp,

        /// Version or constraint
        value: String,
    },
}

fn run(cli: Cli) -> Result<()> {
    let config = || WharfConfig::load(cli.config.as_deref());
    match cli.command {
        Commands::Deps { path, resolve } => commands::deps::run(&path, &resolve, &config()?),

        Commands::Install {
            path,
            export,
            resolve,
        } => commands::install::run(
            &path,
            export.as_deref(),
            &resolve,
            &config()?,
            cli.pretend,
        ),

        Commands::Release(args) => commands::release::run(&args, &config()?, cli.pretend),

        Commands::Update { path } => commands::update::run(&path, cli.pretend),

        Commands::Snapshot { path, output } => {
            commands::snapshot::run(&path, output.as_deref(), cli.pretend)
        }

        Commands::Version { op, value } => commands::version::run(op, &value),
    }
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    logging::init(cli.debug);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), pretend = cli.pretend, "starting wharf");

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
