//! Motif CLI
//!
//! Simulate animation scenes headlessly, emit CSS keyframes, and inspect
//! SVG paths.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use motif_animation::{Animator, CssKeyframes};
use motif_core::TargetHandle;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod scene;
mod simulate;

use scene::Scene;
use simulate::{parse_event, Simulation, StopAt};

#[derive(Parser)]
#[command(name = "motif")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Motif animation engine CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scene on virtual time and report what it wrote
    Simulate {
        /// Scene file
        scene: PathBuf,

        /// Run exactly this many frames
        #[arg(long, conflicts_with = "until_ms")]
        frames: Option<u32>,

        /// Run until this much time has been simulated
        #[arg(long)]
        until_ms: Option<f64>,

        /// Interaction events delivered after mount (enter, leave, click, visible, hidden, scroll:P)
        #[arg(short, long)]
        event: Vec<String>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Emit the scene's tween animations as CSS keyframes
    Keyframes {
        /// Scene file
        scene: PathBuf,

        /// Write the stylesheet here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect SVG path data
    Path {
        #[command(subcommand)]
        command: PathCommands,
    },
}

#[derive(Subcommand)]
enum PathCommands {
    /// Total length of a path
    Length { data: String },

    /// Point at a distance along a path
    Point { data: String, distance: f32 },

    /// The same path traced backwards
    Reverse { data: String },

    /// Split a path into its subpaths
    Split { data: String },

    /// Interpolate between two paths of the same structure
    Interpolate {
        from: String,
        to: String,
        progress: f32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over the default level
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Simulate {
            scene,
            frames,
            until_ms,
            event,
            json,
        } => cmd_simulate(&scene, frames, until_ms, &event, json),

        Commands::Keyframes { scene, output } => cmd_keyframes(&scene, output.as_ref()),

        Commands::Path { command } => cmd_path(command),
    }
}

fn cmd_simulate(
    path: &PathBuf,
    frames: Option<u32>,
    until_ms: Option<f64>,
    events: &[String],
    json: bool,
) -> Result<()> {
    let scene = Scene::load(path)?;
    let events = events
        .iter()
        .map(|text| parse_event(text))
        .collect::<Result<Vec<_>>>()?;
    let stop = match (frames, until_ms) {
        (Some(frames), _) => StopAt::Frames(frames),
        (None, Some(ms)) => StopAt::Millis(ms),
        (None, None) => StopAt::Idle,
    };

    info!(
        "Simulating {} ({} targets, {} animations)",
        path.display(),
        scene.targets.len(),
        scene.animations.len()
    );

    let simulation = Simulation::new(&scene)?;
    simulation.start(&events);
    let ran = simulation.run(stop);
    let report = simulation.report(ran);

    if json {
        let text = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", text);
    } else {
        println!("{}", report.summary());
    }
    Ok(())
}

fn cmd_keyframes(path: &PathBuf, output: Option<&PathBuf>) -> Result<()> {
    let scene = Scene::load(path)?;
    let animator = Animator::new(scene.engine.clone());

    for spec in &scene.animations {
        if spec.spring.is_some() {
            warn!("Skipping '{}': springs have no keyframe form", spec.name);
            continue;
        }
        let config = spec.to_config(TargetHandle::detached())?;
        let keyframes = CssKeyframes::from_config(&config, scene.engine.default_easing)
            .with_context(|| format!("Failed to build keyframes for '{}'", spec.name))?;
        animator.styles().register(&spec.name, &keyframes);
    }

    let stylesheet = animator.styles().stylesheet();
    match output {
        Some(output) => {
            fs::write(output, format!("{}\n", stylesheet))
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(
                "Wrote {} rules for #{} to {}",
                animator.styles().len(),
                animator.styles().element_id(),
                output.display()
            );
        }
        None => println!("{}", stylesheet),
    }
    Ok(())
}

fn cmd_path(command: PathCommands) -> Result<()> {
    match command {
        PathCommands::Length { data } => {
            let length = motif_path::path_length(data.as_str()).context("Invalid path data")?;
            println!("{}", length);
        }
        PathCommands::Point { data, distance } => {
            let point = motif_path::point_at_length(data.as_str(), distance)
                .context("Invalid path data")?;
            println!("{} {}", point.x, point.y);
        }
        PathCommands::Reverse { data } => {
            println!("{}", motif_path::reverse_path(&data).context("Invalid path data")?);
        }
        PathCommands::Split { data } => {
            for subpath in motif_path::split_path(&data).context("Invalid path data")? {
                println!("{}", subpath);
            }
        }
        PathCommands::Interpolate { from, to, progress } => {
            let path = motif_path::interpolate_path(&from, &to, progress)
                .context("Cannot interpolate these paths")?;
            println!("{}", path);
        }
    }
    Ok(())
}
