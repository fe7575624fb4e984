//! Search pipeline orchestration.
//!
//! Ties the execution context, command builder, process streaming, and
//! surfaces together into a two-stage state machine:
//!
//! ```text
//!            run(root, pattern)
//!                   │
//!          database exists? ──no──▶ confirm ──declined──▶ (no surface)
//!              │yes                    │yes
//!              ▼                       ▼
//!          Searching ◀──exit 0─── Building
//!              │                       │
//!         exit 0 → Done          nonzero → stalled
//! ```
//!
//! The stage transition runs from the process-exit event: `Building`'s
//! output is fully cleared before `Searching` spawns, so the two stages
//! never interleave in the surface. Either stage short-circuits to
//! `ToolMissing` when its executable cannot be resolved, in which case no
//! process is spawned at all.

use anyhow::{Context, Result};
use chrono::Local;
use std::sync::Arc;
use tracing::debug;

use crate::command;
use crate::config::Config;
use crate::context::{context_for, ExecutionContext};
use crate::process::{ProcessEvent, RunningProcess};
use crate::prompt::Prompter;
use crate::remote::to_local_form;
use crate::surface::{Surface, SurfaceKey, SurfaceRegistry, SurfaceRenderer, SurfaceState};

/// Fixed name of the index file, directly under the searched root.
pub const DATABASE_NAME: &str = "locate.db";

/// One user search invocation.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub database: String,
    pub pattern: String,
}

/// Terminal result of one `run` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Search ran and exited 0.
    Done,
    /// User declined to build a missing database; nothing was created.
    Declined,
    /// A required executable was absent in the execution context.
    ToolMissing,
    /// Index build exited nonzero; search never started.
    BuildFailed(i32),
    /// Search pipeline exited nonzero; raw output is the diagnostic.
    SearchFailed(i32),
}

enum Stage {
    Building,
    Searching,
}

/// What a finished stage tells the state machine to do next.
enum Next {
    Advance(Stage),
    Finish(RunOutcome),
}

/// Database path for a root directory: `<root>/locate.db`. The root may be
/// remote-tagged; the tag is preserved.
pub fn database_path(root: &str) -> String {
    if root.ends_with('/') {
        format!("{}{}", root, DATABASE_NAME)
    } else {
        format!("{}/{}", root, DATABASE_NAME)
    }
}

/// The pipeline with its session state: configuration, the surface
/// registry, and the request history, all owned here and passed in by the
/// caller — nothing global.
pub struct SearchPipeline {
    config: Config,
    registry: SurfaceRegistry,
    history: Vec<SearchRequest>,
    prompter: Box<dyn Prompter>,
    assume_yes: bool,
}

impl SearchPipeline {
    pub fn new(
        config: Config,
        renderer: Arc<dyn SurfaceRenderer>,
        prompter: Box<dyn Prompter>,
    ) -> SearchPipeline {
        SearchPipeline {
            config,
            registry: SurfaceRegistry::new(renderer),
            history: Vec::new(),
            prompter,
            assume_yes: false,
        }
    }

    /// Skip the build confirmation (non-interactive runs).
    pub fn assume_yes(mut self, yes: bool) -> SearchPipeline {
        self.assume_yes = yes;
        self
    }

    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    pub fn history(&self) -> &[SearchRequest] {
        &self.history
    }

    pub fn last_pattern(&self) -> Option<&str> {
        self.history.last().map(|request| request.pattern.as_str())
    }

    /// Top-level entry point: search `pattern` against the index under
    /// `root`, building the index first when it is missing. The execution
    /// context is selected from the root's path tag.
    pub async fn run(&mut self, root: &str, pattern: &str) -> Result<RunOutcome> {
        let ctx = context_for(&database_path(root));
        self.run_in(ctx, root, pattern).await
    }

    /// [`run`](Self::run) with an explicit execution context; embedding
    /// hosts can supply their own transport here.
    pub async fn run_in(
        &mut self,
        ctx: Arc<dyn ExecutionContext>,
        root: &str,
        pattern: &str,
    ) -> Result<RunOutcome> {
        let database = database_path(root);
        let exists = ctx.file_exists(&database).await;
        debug!(
            database = database.as_str(),
            exists,
            context = ctx.label(),
            "resolved index database"
        );

        if !exists {
            let question = format!("Locate database {} does not exist. Build it now?", database);
            let build = self.assume_yes || self.prompter.confirm(&question)?;
            if !build {
                return Ok(RunOutcome::Declined);
            }
        }

        self.history.push(SearchRequest {
            database: database.clone(),
            pattern: pattern.to_string(),
        });

        let key = SurfaceKey {
            database: database.clone(),
            pattern: pattern.to_string(),
        };
        let header_dir = command::database_dir(&database);
        self.registry.open(&key, ctx.is_remote(), &header_dir);

        let mut stage = if exists {
            Stage::Searching
        } else {
            Stage::Building
        };

        loop {
            let surface = self
                .registry
                .get_mut(&key)
                .context("result surface was closed mid-pipeline")?;
            let next = match stage {
                Stage::Building => {
                    build_stage(&self.config, ctx.as_ref(), surface, &database).await?
                }
                Stage::Searching => {
                    search_stage(&self.config, ctx.as_ref(), surface, &database, pattern).await?
                }
            };
            match next {
                Next::Advance(next_stage) => stage = next_stage,
                Next::Finish(outcome) => return Ok(outcome),
            }
        }
    }

    /// Manual refresh for an open surface: re-invokes [`run`](Self::run)
    /// with the surface's stored (database, pattern) pair, re-triggering the
    /// whole pipeline rather than re-reading stale content.
    pub async fn refresh(&mut self, key: &SurfaceKey) -> Result<RunOutcome> {
        let root = key
            .database
            .strip_suffix(DATABASE_NAME)
            .with_context(|| format!("not a locate database path: {}", key.database))?
            .to_string();
        let pattern = key.pattern.clone();
        self.run(&root, &pattern).await
    }
}

async fn build_stage(
    config: &Config,
    ctx: &dyn ExecutionContext,
    surface: &mut Surface,
    database: &str,
) -> Result<Next> {
    surface.set_state(SurfaceState::Building);
    let db_local = to_local_form(database);
    surface.append(&format!("Building locate database {} ...\n", db_local));
    let banner_mark = surface.mark();

    let tool = config.tools.updatedb.as_str();
    let Some(exe) = ctx.find_executable(tool).await else {
        surface.append(&format!("{} not found !\n", tool));
        surface.set_state(SurfaceState::ToolMissing);
        return Ok(Next::Finish(RunOutcome::ToolMissing));
    };
    debug!(exe = exe.as_str(), context = ctx.label(), "resolved index builder");

    let args = command::index_args(&db_local, &config.index.prunepaths);
    let mut process = ctx.spawn_program(&exe, &args).await?;
    let exit_code = drain_into(surface, &mut process).await;

    if exit_code == 0 {
        // Build output is gone before any search output appears.
        surface.truncate_to(banner_mark);
        Ok(Next::Advance(Stage::Searching))
    } else {
        debug!(exit_code, "index build failed");
        Ok(Next::Finish(RunOutcome::BuildFailed(exit_code)))
    }
}

async fn search_stage(
    config: &Config,
    ctx: &dyn ExecutionContext,
    surface: &mut Surface,
    database: &str,
    pattern: &str,
) -> Result<Next> {
    surface.set_state(SurfaceState::Searching);
    surface.append(&format!("Searching for {} ...\n\n", pattern));
    let banner_mark = surface.mark();

    let tool = config.tools.locate.as_str();
    let Some(exe) = ctx.find_executable(tool).await else {
        surface.append(&format!("{} not found !\n", tool));
        surface.set_state(SurfaceState::ToolMissing);
        return Ok(Next::Finish(RunOutcome::ToolMissing));
    };

    let db_local = to_local_form(database);
    let command_line =
        command::search_pipeline(&exe, &db_local, pattern, &config.listing.switches);
    debug!(
        command = command_line.as_str(),
        context = ctx.label(),
        "spawning search pipeline"
    );
    let mut process = ctx.spawn_shell(&command_line).await?;
    let exit_code = drain_into(surface, &mut process).await;

    if exit_code != 0 {
        // Raw pipeline output stays in the surface as the diagnostic.
        debug!(exit_code, "search pipeline failed");
        return Ok(Next::Finish(RunOutcome::SearchFailed(exit_code)));
    }

    if surface.text_after(banner_mark).trim().is_empty() {
        surface.append("--- No files found ---\n");
    }
    surface.append(&format!(
        "\nSearch finished at {}\n",
        Local::now().format("%a %b %e %H:%M:%S %Y")
    ));
    surface.set_state(SurfaceState::Done);
    Ok(Next::Finish(RunOutcome::Done))
}

/// Feed every chunk into the surface, in delivery order, and return the
/// exit code once the stream ends.
async fn drain_into(surface: &mut Surface, process: &mut RunningProcess) -> i32 {
    let mut exit_code = -1;
    while let Some(event) = process.next_event().await {
        match event {
            ProcessEvent::Chunk(text) => surface.append(&text),
            ProcessEvent::Exited(code) => exit_code = code,
        }
    }
    exit_code
}
