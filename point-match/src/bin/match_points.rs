//! Match two labeled 3D point files and write the paired ids to CSV.
//!
//! Input files are `ID,x,y,z` with a header row. The output file pairs each
//! id from the first file with its matched id from the second, plus the
//! Euclidean distance between the two points.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use std::path::PathBuf;

use point_match::{io, match_exclusive, match_unique};

#[derive(Debug, Clone, ValueEnum)]
enum Policy {
    /// Best-wins: each second-set point keeps only its globally closest
    /// claimant.
    Unique,
    /// First-come, first-served: points claim neighbors in input order and
    /// claims are never revisited.
    Sequential,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Pair two 3D point lists by nearest neighbor using a KD-tree",
    long_about = None
)]
struct Args {
    /// CSV file for the first point list (format: ID,x,y,z)
    input_a: PathBuf,

    /// CSV file for the second point list (format: ID,x,y,z)
    input_b: PathBuf,

    /// Output CSV path
    #[arg(long, default_value = "output.csv")]
    output: PathBuf,

    /// Conflict-resolution policy
    #[arg(long, value_enum, default_value = "unique")]
    policy: Policy,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let set_a = io::load_points(&args.input_a)
        .with_context(|| format!("failed to load {}", args.input_a.display()))?;
    let set_b = io::load_points(&args.input_b)
        .with_context(|| format!("failed to load {}", args.input_b.display()))?;
    info!(
        "Loaded {} points from {} and {} points from {}",
        set_a.len(),
        args.input_a.display(),
        set_b.len(),
        args.input_b.display()
    );

    let matches = match args.policy {
        Policy::Unique => match_unique(&set_a, &set_b)?,
        Policy::Sequential => match_exclusive(&set_a, &set_b)?,
    };
    info!("Computed {} matches", matches.len());

    io::save_matches(&args.output, &matches)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!("Matches saved to {}", args.output.display());

    Ok(())
}
