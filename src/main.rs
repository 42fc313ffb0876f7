//! Engagement map command-line tool
//!
//! Builds engagement maps from formatted datasets, converts single values in
//! either direction, and relabels whole datasets with relative engagement.

use clap::{Parser, Subcommand};
use engagement_map::constants::BIN_NUMBER;
use engagement_map::{
    collect_observations, relabel_dataset, to_relative_engagement, to_watch_percentage,
    EngagementMap, EngagementMapBuilder,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "emap")]
#[command(about = "Duration-stratified engagement maps for video watch-percentage analysis")]
#[command(version = engagement_map::VERSION)]
struct Args {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build an engagement map from a formatted dataset directory
    Build {
        /// Input directory of formatted dataset files
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the engagement map artifact
        #[arg(short, long)]
        output: PathBuf,

        /// Number of split candidates in log-duration space
        #[arg(long, default_value_t = BIN_NUMBER)]
        bin_number: usize,
    },

    /// Convert a watch percentage into relative engagement
    ToRelative {
        /// Path to a previously built engagement map
        #[arg(long)]
        map: PathBuf,

        /// Video duration in seconds
        #[arg(long)]
        duration: u32,

        /// Watch percentage in [0, 1]
        #[arg(long)]
        watch_percentage: f64,
    },

    /// Convert a relative engagement score into a watch percentage
    ToWatch {
        /// Path to a previously built engagement map
        #[arg(long)]
        map: PathBuf,

        /// Video duration in seconds
        #[arg(long)]
        duration: u32,

        /// Relative engagement in [0, 1]
        #[arg(long)]
        relative_engagement: f64,
    },

    /// Append relative engagement to every record of a formatted dataset
    Relabel {
        /// Path to a previously built engagement map
        #[arg(long)]
        map: PathBuf,

        /// Input directory of formatted dataset files
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for relabeled files
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("engagement_map={},emap={}", log_level, log_level))
        .init();

    match args.command {
        Command::Build {
            input,
            output,
            bin_number,
        } => {
            tracing::info!("Building engagement map from {}", input.display());
            let observations = collect_observations(&input)?;
            let map = EngagementMapBuilder::with_bin_number(bin_number).build(&observations)?;
            map.save(&output)?;
            println!(
                "Built engagement map with {} bins from {} observations -> {}",
                map.num_bins(),
                observations.len(),
                output.display()
            );
        }

        Command::ToRelative {
            map,
            duration,
            watch_percentage,
        } => {
            let map = EngagementMap::load(&map)?;
            let re = to_relative_engagement(&map, duration, watch_percentage);
            println!(
                "relative engagement for video with length {} seconds and {:.2} watch percentage is {:.4}",
                duration, watch_percentage, re
            );
        }

        Command::ToWatch {
            map,
            duration,
            relative_engagement,
        } => {
            let map = EngagementMap::load(&map)?;
            let wp = to_watch_percentage(&map, duration, relative_engagement);
            println!(
                "watch percentage for video with length {} seconds and {:.2} relative engagement is {:.4}",
                duration, relative_engagement, wp
            );
        }

        Command::Relabel { map, input, output } => {
            let map = EngagementMap::load(&map)?;
            let total = relabel_dataset(&map, &input, &output)?;
            println!(
                "Relabeled {} records -> {}",
                total,
                output.display()
            );
        }
    }

    Ok(())
}
