//! Result surfaces and their registry.
//!
//! A surface is the append-only text view a search renders into. Its
//! identity is exactly the (database path, pattern) pair, fixed at creation;
//! re-running the same request reuses the surface instead of opening a
//! second one. Surfaces live in a [`SurfaceRegistry`], a map from identity
//! key to surface, and display through a [`SurfaceRenderer`] — the rendering
//! host only ever observes appends, one truncation after a successful index
//! build, and state changes.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Identity of a result surface: the database path and the search pattern,
/// compared by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceKey {
    pub database: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Building,
    Searching,
    Done,
    ToolMissing,
}

impl SurfaceState {
    pub fn label(&self) -> &'static str {
        match self {
            SurfaceState::Building => "building",
            SurfaceState::Searching => "searching",
            SurfaceState::Done => "done",
            SurfaceState::ToolMissing => "tool-missing",
        }
    }
}

pub struct Surface {
    name: String,
    key: SurfaceKey,
    state: SurfaceState,
    content: String,
    remote: bool,
    listing_root: PathBuf,
    renderer: Arc<dyn SurfaceRenderer>,
}

impl Surface {
    fn new(
        name: String,
        key: SurfaceKey,
        remote: bool,
        renderer: Arc<dyn SurfaceRenderer>,
    ) -> Surface {
        let listing_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Surface {
            name,
            key,
            state: SurfaceState::Building,
            content: String::new(),
            remote,
            listing_root,
            renderer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &SurfaceKey {
        &self.key
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_remote(&self) -> bool {
        self.remote
    }

    /// Directory the file listing is rooted at (the working directory when
    /// the surface was created).
    pub fn listing_root(&self) -> &Path {
        &self.listing_root
    }

    pub fn set_state(&mut self, state: SurfaceState) {
        self.state = state;
        self.renderer.on_state(self);
    }

    pub fn append(&mut self, text: &str) {
        self.content.push_str(text);
        self.renderer.on_append(self, text);
    }

    /// Current end of content, used to mark banner boundaries.
    pub fn mark(&self) -> usize {
        self.content.len()
    }

    /// The single sanctioned deletion: drop everything after `mark`. Used to
    /// clear build output before search output begins.
    pub fn truncate_to(&mut self, mark: usize) {
        if mark < self.content.len() {
            self.content.truncate(mark);
            self.renderer.on_truncate(self);
        }
    }

    pub fn text_after(&self, mark: usize) -> &str {
        &self.content[mark.min(self.content.len())..]
    }

    /// Offset just past the header line and any leading whitespace — where a
    /// viewer positions itself to show results first.
    pub fn results_start(&self) -> usize {
        let after_header = match self.content.find('\n') {
            Some(idx) => idx + 1,
            None => self.content.len(),
        };
        let rest = &self.content[after_header..];
        after_header + (rest.len() - rest.trim_start().len())
    }

    /// Clear content and rewrite the one-line header naming the database's
    /// directory. Called on creation and on every reuse.
    fn reset(&mut self, header_dir: &str, remote: bool) {
        self.content.clear();
        self.remote = remote;
        self.listing_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        self.state = SurfaceState::Building;
        self.renderer.on_create(self);
        self.append(&format!("Database directory {}:\n\n", header_dir));
    }
}

/// Display host for surfaces. Implementations only observe; content is owned
/// by the pipeline.
pub trait SurfaceRenderer: Send + Sync {
    /// A surface was created or cleared for reuse.
    fn on_create(&self, _surface: &Surface) {}
    fn on_append(&self, surface: &Surface, text: &str);
    fn on_truncate(&self, _surface: &Surface) {}
    fn on_state(&self, _surface: &Surface) {}
}

/// Human renderer: streams chunks straight to stdout as they arrive.
pub struct StdoutRenderer;

impl SurfaceRenderer for StdoutRenderer {
    fn on_append(&self, _surface: &Surface, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

/// Machine renderer: one JSON object per event on stdout.
pub struct JsonRenderer;

impl SurfaceRenderer for JsonRenderer {
    fn on_create(&self, surface: &Surface) {
        emit(serde_json::json!({
            "event": "create",
            "surface": surface.name(),
            "database": surface.key().database,
            "pattern": surface.key().pattern,
            "remote": surface.is_remote(),
        }));
    }

    fn on_append(&self, surface: &Surface, text: &str) {
        emit(serde_json::json!({
            "event": "append",
            "surface": surface.name(),
            "text": text,
        }));
    }

    fn on_truncate(&self, surface: &Surface) {
        emit(serde_json::json!({
            "event": "truncate",
            "surface": surface.name(),
        }));
    }

    fn on_state(&self, surface: &Surface) {
        emit(serde_json::json!({
            "event": "state",
            "surface": surface.name(),
            "state": surface.state().label(),
        }));
    }
}

fn emit(value: serde_json::Value) {
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{}", value);
}

/// Renderer that discards everything. Useful for embedding and tests.
pub struct NullRenderer;

impl SurfaceRenderer for NullRenderer {
    fn on_append(&self, _surface: &Surface, _text: &str) {}
}

/// Render mode for the CLI.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RenderMode {
    Human,
    Json,
}

impl RenderMode {
    pub fn renderer(&self) -> Arc<dyn SurfaceRenderer> {
        match self {
            RenderMode::Human => Arc::new(StdoutRenderer),
            RenderMode::Json => Arc::new(JsonRenderer),
        }
    }
}

/// Map from identity key to open surface. One surface per (database,
/// pattern); surfaces leave the registry only when the host closes them.
pub struct SurfaceRegistry {
    surfaces: HashMap<SurfaceKey, Surface>,
    renderer: Arc<dyn SurfaceRenderer>,
}

impl SurfaceRegistry {
    pub fn new(renderer: Arc<dyn SurfaceRenderer>) -> SurfaceRegistry {
        SurfaceRegistry {
            surfaces: HashMap::new(),
            renderer,
        }
    }

    pub fn find(&self, database: &str, pattern: &str) -> Option<&Surface> {
        self.surfaces.get(&SurfaceKey {
            database: database.to_string(),
            pattern: pattern.to_string(),
        })
    }

    /// Display name for a (database, pattern) pair: an existing surface
    /// keeps its name, otherwise a fresh one is derived from the pattern,
    /// suffixed until unique among open surfaces.
    pub fn name_for(&self, database: &str, pattern: &str) -> String {
        if let Some(existing) = self.find(database, pattern) {
            return existing.name().to_string();
        }
        let base = format!("locate: {}", pattern);
        let mut name = base.clone();
        let mut counter = 2;
        while self.surfaces.values().any(|s| s.name() == name) {
            name = format!("{} <{}>", base, counter);
            counter += 1;
        }
        name
    }

    /// Find-or-create the surface for `key`, cleared and with its header
    /// rewritten. The key is stamped once and never changes.
    pub fn open(&mut self, key: &SurfaceKey, remote: bool, header_dir: &str) -> &mut Surface {
        let name = self.name_for(&key.database, &key.pattern);
        let renderer = self.renderer.clone();
        let surface = self
            .surfaces
            .entry(key.clone())
            .or_insert_with(|| Surface::new(name, key.clone(), remote, renderer));
        surface.reset(header_dir, remote);
        surface
    }

    pub fn get_mut(&mut self, key: &SurfaceKey) -> Option<&mut Surface> {
        self.surfaces.get_mut(key)
    }

    /// Host-driven close; the only way a surface leaves the registry.
    pub fn close(&mut self, key: &SurfaceKey) -> Option<Surface> {
        self.surfaces.remove(key)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}
