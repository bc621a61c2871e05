//! Voxprep command-line entry point.

mod commands;
mod config;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "voxprep")]
#[command(about = "Prepare voice training clips and score synthesized speech", version)]
struct Cli {
    /// JSON config overriding segmenter and diagnosis defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a recording (or every WAV in a directory) into training clips
    Segment {
        input: PathBuf,
        /// Destination directory for the numbered clips
        #[arg(long, default_value = "clips")]
        out_dir: PathBuf,
        /// Override the minimum clip duration (seconds)
        #[arg(long)]
        min_duration: Option<f64>,
        /// Override the maximum clip duration (seconds)
        #[arg(long)]
        max_duration: Option<f64>,
        /// Override the silence threshold (dBFS, e.g. -40)
        #[arg(long)]
        silence_threshold_dbfs: Option<f64>,
    },
    /// Extract quality and prosody features from one file
    Analyze {
        input: PathBuf,
        /// Write JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Score one synthesized sample against the rule table
    Diagnose {
        input: PathBuf,
        /// Externally measured character error rate, in [0, 1]
        #[arg(long)]
        cer: Option<f64>,
        /// Write JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Evaluate a directory of synthesized samples, grouped by model
    Batch {
        dir: PathBuf,
        /// Worker threads (defaults to the config value)
        #[arg(long)]
        jobs: Option<usize>,
        /// Write the full result as JSON
        #[arg(long)]
        output: Option<PathBuf>,
        /// Write the model summary as markdown
        #[arg(long)]
        summary: Option<PathBuf>,
        /// Write the per-file detail table as markdown
        #[arg(long)]
        details: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Segment {
            input,
            out_dir,
            min_duration,
            max_duration,
            silence_threshold_dbfs,
        } => {
            if let Some(v) = min_duration {
                config.segmenter.min_duration_s = v;
            }
            if let Some(v) = max_duration {
                config.segmenter.max_duration_s = v;
            }
            if let Some(v) = silence_threshold_dbfs {
                config.segmenter.silence_amplitude_threshold_dbfs = v;
            }
            commands::segment_cmd(&input, &out_dir, &config)
        }
        Commands::Analyze { input, output } => {
            commands::analyze_cmd(&input, output.as_deref(), &config)
        }
        Commands::Diagnose { input, cer, output } => {
            commands::diagnose_cmd(&input, cer, output.as_deref(), &config)
        }
        Commands::Batch {
            dir,
            jobs,
            output,
            summary,
            details,
        } => commands::batch_cmd(
            &dir,
            jobs,
            output.as_deref(),
            summary.as_deref(),
            details.as_deref(),
            &config,
        ),
    }
}
