#![deny(unsafe_code, missing_docs, non_snake_case)]
#![warn(dead_code, unused_results, unreachable_pub)]

//! Headless command-line runner for Grid Defence sessions.

mod autopilot;
mod config;
mod render;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use grid_defence_simulation::{Simulation, SimulationConfig};
use grid_defence_world::query;
use tracing::{info, Level};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "grid-defence", about = "Headless grid tower defence runner")]
struct Cli {
    /// TOML session configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the configured level seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Saved session to resume. Unreadable saves start a fresh level.
    #[arg(long)]
    load: Option<PathBuf>,
    /// Most verbose log level written to stderr.
    #[arg(long, default_value = "warn")]
    log_level: Level,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Prints the level as text.
    Render,
    /// Lets the autopilot play a number of waves.
    Run {
        /// Waves to play.
        #[arg(long, default_value_t = 5)]
        waves: u32,
        /// Simulation speed multiplier.
        #[arg(long, default_value_t = 1)]
        speed: u8,
        /// Prints the board after every wave.
        #[arg(long)]
        render: bool,
        /// Writes the session to this file when the run ends.
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut simulation_config = match &cli.config {
        Some(path) => config::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = cli.seed {
        simulation_config.seed = seed;
    }

    let save = match &cli.load {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read save at {}", path.display()))?,
        ),
        None => None,
    };
    let mut simulation = Simulation::restore_or_generate(simulation_config, save.as_deref());
    info!(
        level = simulation.level(),
        route = query::route(simulation.world()).len(),
        "session ready"
    );

    match cli.command {
        Cmd::Render => print!("{}", render::ascii(&simulation.snapshot())),
        Cmd::Run {
            waves,
            speed,
            render: show_board,
            save,
        } => {
            simulation
                .set_speed(speed)
                .with_context(|| format!("cannot run at speed {speed}"))?;
            let report = autopilot::play(&mut simulation, waves, |simulation| {
                if show_board {
                    println!("{}", render::ascii(&simulation.snapshot()));
                }
            });
            println!(
                "waves {}  ticks {}  towers {}  gold {}  lives {}  score {}  status {:?}",
                report.waves_completed,
                report.ticks,
                report.towers,
                report.gold,
                report.lives,
                report.score,
                report.status
            );

            if let Some(path) = save {
                let encoded = simulation.save().context("failed to encode session")?;
                fs::write(&path, encoded)
                    .with_context(|| format!("failed to write save to {}", path.display()))?;
                info!(path = %path.display(), "session saved");
            }
        }
    }

    Ok(())
}
