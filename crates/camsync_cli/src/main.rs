//! camsync command-line interface
//!
//! Runs synchronization units from unit files, writes the default settings
//! file, or replays the reconciler on literal numbers for manual review.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use camsync_core::logging::LogLevel;
use camsync_core::models::TranscodeProfile;
use clap::{Parser, Subcommand};

/// Multi-camera LED/audio synchronization
#[derive(Parser, Debug)]
#[command(name = "camsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file
    #[arg(short, long, value_name = "FILE", default_value = "camsync.toml", global = true)]
    config: PathBuf,

    /// Log level, overridden by RUST_LOG
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<LogLevel>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synchronize the given units
    Run {
        /// Unit files (TOML)
        #[arg(required = true, value_name = "UNIT_FILE")]
        units: Vec<PathBuf>,

        /// Encoder profile (software or hardware)
        #[arg(long)]
        profile: Option<TranscodeProfile>,

        /// Plan and log transcodes without running them
        #[arg(long)]
        dry_run: bool,

        /// Re-run units that already completed
        #[arg(long)]
        force: bool,
    },

    /// Write the default settings file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Reconcile literal numbers; `-` marks a missing optical start
    Reconcile {
        /// Optical start frames, comma separated
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        optical: Vec<String>,

        /// Audio offsets in frames, comma separated
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        audio: Vec<String>,

        /// Deviation tolerance in frames
        #[arg(long)]
        tolerance: Option<i64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            units,
            profile,
            dry_run,
            force,
        } => commands::run(
            &cli.config,
            cli.log_level,
            cli.json,
            &units,
            commands::RunOverrides {
                profile,
                dry_run,
                force,
            },
        ),
        Commands::InitConfig { force } => commands::init_config(&cli.config, force),
        Commands::Reconcile {
            optical,
            audio,
            tolerance,
        } => commands::reconcile(&cli.config, cli.json, &optical, &audio, tolerance),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
