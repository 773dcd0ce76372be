mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "standup",
    about = "Daily standup bot: opens sessions, tracks participation, keeps the summary current",
    version,
    propagate_version = true
)]
struct Cli {
    /// Service root (default: auto-detect from .standup/ or .git/)
    #[arg(long, global = true, env = "STANDUP_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .standup/ with default settings
    Init,

    /// Run the scheduler and the HTTP API
    Serve {
        /// Listen address, overriding the settings file
        #[arg(long)]
        listen: Option<String>,
    },

    /// Inspect or change a workspace's configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Open a session now, regardless of trigger time and calendar
    Open { workspace: String },

    /// Print the current summary of a workspace's session
    Summary { workspace: String },

    /// Run the scheduler once for every workspace and exit
    Tick {
        /// Evaluate as of this RFC 3339 instant instead of now
        #[arg(long)]
        at: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Serve { listen } => cmd::serve::run(&root, listen),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Open { workspace } => cmd::open::run(&root, &workspace, cli.json),
        Commands::Summary { workspace } => cmd::summary::run(&root, &workspace, cli.json),
        Commands::Tick { at } => cmd::tick::run(&root, at.as_deref(), cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
