//! # dblocate
//!
//! A locate-database search orchestrator. Given a root directory and a
//! pattern, dblocate searches the `locate.db` index under that root and
//! streams the matching files into a live-updating listing — building the
//! index first when it does not exist yet. The root may live on a remote
//! host (`/ssh:host:/path`); resolution and execution then happen over a
//! persistent ssh channel, transparently to the rest of the pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐    ┌─────────────────┐    ┌───────────────┐
//! │   CLI    │──▶│  SearchPipeline  │──▶│ ExecutionCtx   │
//! │  (dbl)   │    │ Building→Search │    │ local / remote │
//! └──────────┘    └───────┬─────────┘    └──────┬────────┘
//!                         │                     │ spawn
//!                         ▼                     ▼
//!                  ┌────────────┐       ┌──────────────┐
//!                  │  Surfaces  │◀──────│  Streaming    │
//!                  │ (registry) │ chunks │  processes   │
//!                  └────────────┘       └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration (listing switches, prune list, tool names) |
//! | [`remote`] | Remote path syntax and the ssh command channel |
//! | [`context`] | Execution contexts: local machine or remote host |
//! | [`command`] | Command construction for both pipeline stages |
//! | [`surface`] | Append-only result surfaces and their registry |
//! | [`process`] | Streaming subprocess execution |
//! | [`pipeline`] | The Building → Searching state machine |
//! | [`prompt`] | User prompting seam |

pub mod command;
pub mod config;
pub mod context;
pub mod pipeline;
pub mod process;
pub mod prompt;
pub mod remote;
pub mod surface;
