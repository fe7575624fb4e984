//! # dblocate CLI (`dbl`)
//!
//! One command: search a locate database for a pattern, building the index
//! first if it is missing.
//!
//! ```bash
//! dbl '*.rs'                         # search under the current directory
//! dbl kernel --root /srv/tree        # search a specific root
//! dbl conf --root /ssh:box:/etc      # remote root, over ssh
//! dbl hit --yes                      # build a missing index without asking
//! dbl hit --progress json            # machine-readable event stream
//! ```
//!
//! The pattern is prompted for interactively when omitted. Configuration is
//! read from `./dblocate.toml` when present; every option has a default.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use dblocate::config::load_config;
use dblocate::pipeline::{RunOutcome, SearchPipeline};
use dblocate::prompt::{Prompter, TerminalPrompter};
use dblocate::surface::RenderMode;

/// Search a locate database, building it on demand, with results streamed
/// live. Remote roots (`/method:host:/path`) run both stages on the remote
/// host over a persistent ssh channel.
#[derive(Parser)]
#[command(
    name = "dbl",
    about = "Search a locate database, building the index on demand",
    version
)]
struct Cli {
    /// Pattern to search for; prompted interactively when omitted.
    pattern: Option<String>,

    /// Root directory of the index (local path or /method:host:/path).
    #[arg(long, default_value = ".")]
    root: String,

    /// Path to configuration file (TOML). A missing file means defaults.
    #[arg(long, default_value = "./dblocate.toml")]
    config: PathBuf,

    /// Assume "yes" when asked to build a missing database.
    #[arg(long, short = 'y')]
    yes: bool,

    /// Progress output format.
    #[arg(long, value_enum, default_value_t = ProgressArg::Human)]
    progress: ProgressArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProgressArg {
    Human,
    Json,
}

impl ProgressArg {
    fn mode(self) -> RenderMode {
        match self {
            ProgressArg::Human => RenderMode::Human,
            ProgressArg::Json => RenderMode::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let root = if cli.root == "." {
        std::env::current_dir()?.to_string_lossy().to_string()
    } else {
        cli.root.clone()
    };

    let mut pipeline = SearchPipeline::new(
        config,
        cli.progress.mode().renderer(),
        Box::new(TerminalPrompter),
    )
    .assume_yes(cli.yes);

    let pattern = match cli.pattern.as_deref().map(str::trim) {
        Some(pattern) if !pattern.is_empty() => pattern.to_string(),
        _ => {
            let default = pipeline.last_pattern().map(str::to_string);
            TerminalPrompter.read_pattern(default.as_deref())?
        }
    };

    let outcome = pipeline.run(&root, &pattern).await?;

    let code = match outcome {
        RunOutcome::Done | RunOutcome::Declined => 0,
        RunOutcome::ToolMissing => 2,
        RunOutcome::BuildFailed(_) | RunOutcome::SearchFailed(_) => 1,
    };
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
