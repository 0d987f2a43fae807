//! RallyMark CLI: tag match videos and export score-annotated highlights.
//!
//! Usage:
//!   rallymark init <NAME> --source <VIDEO>   Create a match project
//!   rallymark tag <PATH>                     Interactive tagging session
//!   rallymark mark <PATH> <TYPE> <TIME>      Add a single marker
//!   rallymark unmark <PATH> <TIME>...        Remove markers
//!   rallymark list <PATH>                    List markers
//!   rallymark timeline <PATH>                Draw the marker timeline
//!   rallymark plan <PATH>                    Show planned rally clips
//!   rallymark score <PATH> <TIME>            Score at a point in the match
//!   rallymark export <PATH>                  Render the highlight video
//!   rallymark preview <PATH> <CLIP>          Render one overlay frame
//!   rallymark publish-info <FILE>            Upload metadata for an export
//!   rallymark info <PATH>                    Show project information
//!   rallymark check                          Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use rallymark_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "rallymark",
    about = "Tag match videos and export score-annotated highlights",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new match project
    Init {
        /// Project name
        name: String,

        /// Recorded match video
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Parent directory (defaults to the configured projects dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Home side label
        #[arg(long)]
        home: Option<String>,

        /// Away side label
        #[arg(long)]
        away: Option<String>,
    },

    /// Tag a match interactively while it plays
    Tag {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Add a marker at a timestamp
    Mark {
        /// Path to the project directory
        path: PathBuf,

        /// serve|home|away|none (or a full label such as "Home point")
        marker_type: String,

        /// Timestamp: 12500 (ms), 12.5s, 1:02.5 or 1:02:03.250
        time: String,
    },

    /// Remove markers at the given timestamps
    Unmark {
        /// Path to the project directory
        path: PathBuf,

        /// Timestamps to remove
        #[arg(required = true)]
        times: Vec<String>,
    },

    /// List markers in timestamp order
    List {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Draw the marker timeline
    Timeline {
        /// Path to the project directory
        path: PathBuf,

        /// Strip width in characters
        #[arg(long, default_value = "80")]
        width: usize,

        /// Draw a playhead at this time
        #[arg(long)]
        at: Option<String>,
    },

    /// Show the rally clips derived from the markers
    Plan {
        /// Path to the project directory
        path: PathBuf,

        /// Print clips as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the score at a point in the match
    Score {
        /// Path to the project directory
        path: PathBuf,

        /// Timestamp to evaluate
        time: String,
    },

    /// Render the score-annotated highlight video
    Export {
        /// Path to the project directory
        path: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Scoreboard image drawn behind the score
        #[arg(long)]
        scoreboard: Option<PathBuf>,
    },

    /// Render a single frame of a clip with its overlay
    Preview {
        /// Path to the project directory
        path: PathBuf,

        /// Clip number as shown by `plan` (1-based)
        clip: usize,

        /// Output PNG path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print upload metadata for an exported file
    PublishInfo {
        /// Exported video named <date>-<home>-<away>.mp4
        file: PathBuf,
    },

    /// Show project information
    Info {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    rallymark_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Init {
            name,
            source,
            output,
            home,
            away,
        } => commands::init::run(&config, name, source, output, home, away).await,
        Commands::Tag { path } => commands::tag::run(&config, path).await,
        Commands::Mark {
            path,
            marker_type,
            time,
        } => commands::mark::run(path, marker_type, time),
        Commands::Unmark { path, times } => commands::unmark::run(path, times),
        Commands::List { path } => commands::list::run(path),
        Commands::Timeline { path, width, at } => commands::timeline::run(path, width, at),
        Commands::Plan { path, json } => commands::plan::run(path, json),
        Commands::Score { path, time } => commands::score::run(path, time),
        Commands::Export {
            path,
            output,
            scoreboard,
        } => commands::export::run(&config, path, output, scoreboard).await,
        Commands::Preview { path, clip, output } => {
            commands::preview::run(&config, path, clip, output)
        }
        Commands::PublishInfo { file } => commands::publish_info::run(file),
        Commands::Info { path } => commands::info::run(path),
        Commands::Check => commands::check::run(&config),
    }
}
