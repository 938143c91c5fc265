//! SceneSync CLI: retiming math, continuity merging, and gap resolution.
//!
//! Usage:
//!   scenesync speed <START> <END> <TARGET>     Exact playback speed of an excerpt
//!   scenesync import <PROJECT> <SCENES.json>   Store the scene list of a project
//!   scenesync reconcile <ANCHORS.json>         Match scenes from recorded anchor hits
//!   scenesync continuity <PROJECT>             List continuous scene pairs
//!   scenesync merge <PROJECT>                  Merge continuous scenes
//!   scenesync undo <PROJECT> <SCENE>           Undo one merged scene
//!   scenesync gaps <PROJECT>                   Report timing gaps
//!   scenesync candidates <PROJECT> <SCENE>     Propose gap-filling excerpts
//!   scenesync cuts <VIDEO>                     Detect (or load cached) scene cuts
//!   scenesync probe <VIDEO>                    Show frame rate and duration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use scenesync_common::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "scenesync",
    about = "Frame-exact scene-to-source matching and retiming",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/scenesync/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the source episodes
    #[arg(long, global = true, default_value = ".")]
    library: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the playback speed of a source excerpt over a target duration
    Speed {
        /// Excerpt start (seconds)
        start: String,

        /// Excerpt end (seconds)
        end: String,

        /// Target duration (seconds)
        target: String,

        /// Snap the target to this sequence frame rate (e.g. 60 or 24000/1001)
        #[arg(long)]
        sequence_fps: Option<String>,
    },

    /// Store the scene list of a project
    Import {
        /// Project id
        project: String,

        /// JSON array of scenes
        scenes: PathBuf,
    },

    /// Match scenes offline from per-anchor search results
    Reconcile {
        /// JSON array of `{scene, candidates}` records
        anchors: PathBuf,

        /// Print the matches as JSON
        #[arg(long)]
        json: bool,
    },

    /// List adjacent scenes that continue in the same episode
    Continuity {
        /// Project id
        project: String,
    },

    /// Merge continuous scenes into single scenes
    Merge {
        /// Project id
        project: String,

        /// Show the chains without merging
        #[arg(long)]
        dry_run: bool,
    },

    /// Restore the original scenes behind a merged scene
    Undo {
        /// Project id
        project: String,

        /// Index of the merged scene
        scene: usize,
    },

    /// Report the speed and gap of every matched scene
    Gaps {
        /// Project id
        project: String,

        /// JSON array of `{scene_index, target_duration}` records
        #[arg(long)]
        timings: Option<PathBuf>,
    },

    /// Propose gap-filling excerpts for one scene
    Candidates {
        /// Project id
        project: String,

        /// Scene index
        scene: usize,

        /// Target duration (seconds)
        #[arg(long)]
        target: String,

        /// Apply the candidate at this position
        #[arg(long)]
        apply: Option<usize>,
    },

    /// Detect scene cuts of a video (cached)
    Cuts {
        /// Path to the video
        video: PathBuf,
    },

    /// Show the frame rate and duration of a video
    Probe {
        /// Path to the video
        video: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    scenesync_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Speed {
            start,
            end,
            target,
            sequence_fps,
        } => commands::speed::run(&config, &start, &end, &target, sequence_fps.as_deref()),
        Commands::Import { project, scenes } => {
            commands::import::run(&config, cli.library, &project, scenes)
        }
        Commands::Reconcile { anchors, json } => commands::reconcile::run(&config, anchors, json),
        Commands::Continuity { project } => commands::continuity::run(&config, cli.library, &project),
        Commands::Merge { project, dry_run } => {
            commands::merge::run(&config, cli.library, &project, dry_run)
        }
        Commands::Undo { project, scene } => commands::undo::run(&config, cli.library, &project, scene),
        Commands::Gaps { project, timings } => {
            commands::gaps::run(&config, cli.library, &project, timings)
        }
        Commands::Candidates {
            project,
            scene,
            target,
            apply,
        } => commands::candidates::run(&config, cli.library, &project, scene, &target, apply).await,
        Commands::Cuts { video } => commands::cuts::run(&config, video).await,
        Commands::Probe { video } => commands::probe::run(video).await,
    }
}
