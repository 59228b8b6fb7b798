mod commands;
mod display;
mod refresh;
mod workspace;

use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "powerscale")]
#[command(about = "Declarative management of PowerScale (OneFS) clusters", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "main.psf")]
    file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG takes priority.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Validate,
    /// Show execution plan without applying changes
    Plan,
    /// Apply changes to reach the desired state
    Apply {
        /// Skip confirmation prompt
        #[arg(long)]
        auto_approve: bool,
    },
    /// Destroy every resource recorded in state
    Destroy {
        /// Skip confirmation prompt
        #[arg(long)]
        auto_approve: bool,
    },
    /// Bring an existing object under management
    Import {
        /// Resource type (e.g., smb_share)
        resource_type: String,
        /// Binding or name of the resource in the configuration
        name: String,
        /// Remote id of the object (e.g., "hr:home" for a share in zone hr)
        id: String,
    },
    /// Inspect the state file
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
    /// Remove a stale state lock
    ForceUnlock {
        /// Lock ID shown in the lock error
        lock_id: String,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// List resources in the state
    List,
    /// Show one resource from the state
    Show {
        resource_type: String,
        name: String,
        /// Print the entry as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let file = cli.file;
    let result = match cli.command {
        Commands::Validate => commands::run_validate(&file),
        Commands::Plan => commands::run_plan(&file).await,
        Commands::Apply { auto_approve } => commands::run_apply(&file, auto_approve).await,
        Commands::Destroy { auto_approve } => commands::run_destroy(&file, auto_approve).await,
        Commands::Import {
            resource_type,
            name,
            id,
        } => commands::run_import(&file, &resource_type, &name, &id).await,
        Commands::State { command } => match command {
            StateCommands::List => commands::run_state_list(&file).await,
            StateCommands::Show {
                resource_type,
                name,
                json,
            } => commands::run_state_show(&file, &resource_type, &name, json).await,
        },
        Commands::ForceUnlock { lock_id } => commands::run_force_unlock(&file, &lock_id).await,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "powerscale", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
