//! Layer discovery.
//!
//! Locates the four candidate configuration files for an invocation. Nothing
//! here creates files or fails: a missing file is a normal state.

use heck::ToShoutySnakeCase;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const TEAM_CONFIG_SUFFIX: &str = ".config.json";
const USER_CONFIG_SUFFIX: &str = ".config.user.json";
const SCHEMA_SUFFIX: &str = ".schema.json";

/// One of the four configuration layers, declared in read precedence
/// order (highest first).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layer {
    /// `<app>.config.user.json` in the project tree
    ProjectUser = 0,
    /// `<app>.config.json` in the project tree
    #[default]
    Project = 1,
    /// `<app>.config.user.json` in the global home
    GlobalUser = 2,
    /// `<app>.config.json` in the global home
    Global = 3,
}

impl Layer {
    /// All layers, highest precedence first.
    pub const ALL: [Layer; 4] = [
        Layer::ProjectUser,
        Layer::Project,
        Layer::GlobalUser,
        Layer::Global,
    ];

    pub fn from_flags(user: bool, global: bool) -> Self {
        match (user, global) {
            (true, false) => Layer::ProjectUser,
            (false, false) => Layer::Project,
            (true, true) => Layer::GlobalUser,
            (false, true) => Layer::Global,
        }
    }

    pub fn is_user(self) -> bool {
        matches!(self, Layer::ProjectUser | Layer::GlobalUser)
    }

    pub fn is_global(self) -> bool {
        matches!(self, Layer::GlobalUser | Layer::Global)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layer::ProjectUser => write!(f, "project-user"),
            Layer::Project => write!(f, "project"),
            Layer::GlobalUser => write!(f, "global-user"),
            Layer::Global => write!(f, "global"),
        }
    }
}

/// Where a layer lives on disk, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerLocation {
    pub layer: Layer,
    /// `None` for a project layer when no project file was found.
    pub path: Option<PathBuf>,
    pub exists: bool,
}

/// Resolved locations of all four layers.
#[derive(Debug, Clone)]
pub struct LayerPaths {
    locations: [LayerLocation; 4],
}

impl LayerPaths {
    pub fn get(&self, layer: Layer) -> &LayerLocation {
        &self.locations[layer.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerLocation> {
        self.locations.iter()
    }
}

/// Resolves layer file paths for one application.
#[derive(Debug, Clone)]
pub struct PathResolver {
    app: String,
    start_dir: PathBuf,
    home_dir: PathBuf,
}

impl PathResolver {
    pub fn new(app: impl Into<String>, start_dir: impl Into<PathBuf>, home_dir: impl Into<PathBuf>) -> Self {
        Self {
            app: app.into(),
            start_dir: start_dir.into(),
            home_dir: home_dir.into(),
        }
    }

    /// Discover directories from the environment.
    ///
    /// `<APP>_CLI_HOME` overrides the global home (default `~/.<app>`),
    /// `<APP>_PROJECT_DIR` overrides where the project search starts (default cwd).
    pub fn discover(app: &str) -> Self {
        let prefix = env_prefix(app);

        let home_dir = std::env::var(format!("{prefix}_CLI_HOME"))
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(format!(".{app}"))))
            .unwrap_or_else(|| PathBuf::from(format!(".{app}")));

        let start_dir = std::env::var(format!("{prefix}_PROJECT_DIR"))
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        Self::new(app, start_dir, home_dir)
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn start_dir(&self) -> &Path {
        &self.start_dir
    }

    pub fn config_name(&self) -> String {
        format!("{}{}", self.app, TEAM_CONFIG_SUFFIX)
    }

    pub fn user_config_name(&self) -> String {
        format!("{}{}", self.app, USER_CONFIG_SUFFIX)
    }

    pub fn schema_name(&self) -> String {
        format!("{}{}", self.app, SCHEMA_SUFFIX)
    }

    /// File name used by a layer.
    pub fn file_name(&self, layer: Layer) -> String {
        if layer.is_user() {
            self.user_config_name()
        } else {
            self.config_name()
        }
    }

    /// Search upward from the start directory for `file`, skipping the
    /// global home directory.
    pub fn search(&self, file: &str) -> Option<PathBuf> {
        search_upward(&self.start_dir, file, &[self.home_dir.as_path()])
    }

    /// Resolve all four layer locations.
    pub fn resolve(&self) -> LayerPaths {
        let locations = Layer::ALL.map(|layer| {
            let path = if layer.is_global() {
                Some(self.home_dir.join(self.file_name(layer)))
            } else {
                self.search(&self.file_name(layer))
            };
            let exists = path.as_ref().is_some_and(|p| p.is_file());
            debug!(layer = %layer, path = ?path, exists, "resolved config layer");
            LayerLocation { layer, path, exists }
        });
        LayerPaths { locations }
    }

    /// Path a layer would be created at when it does not exist yet.
    pub fn init_target(&self, layer: Layer) -> PathBuf {
        let dir = if layer.is_global() {
            &self.home_dir
        } else {
            &self.start_dir
        };
        dir.join(self.file_name(layer))
    }

    /// Directory of the legacy single-layer profile store.
    pub fn legacy_profiles_dir(&self) -> PathBuf {
        self.home_dir.join("profiles")
    }

    /// Where the legacy store is moved after conversion.
    pub fn legacy_old_dir(&self) -> PathBuf {
        self.home_dir.join("profiles-old")
    }

    /// Directory holding extra profile-type definitions.
    pub fn profile_types_dir(&self) -> PathBuf {
        self.home_dir.join("profile-types")
    }
}

/// Environment variable prefix for an application name (`my-cli` -> `MY_CLI`).
pub fn env_prefix(app: &str) -> String {
    app.to_shouty_snake_case()
}

fn search_upward(start: &Path, file: &str, ignore: &[&Path]) -> Option<PathBuf> {
    let start = absolutize(start);
    let ignore: Vec<PathBuf> = ignore.iter().map(|p| absolutize(p)).collect();
    for dir in start.ancestors() {
        if ignore.iter().any(|i| i == dir) {
            continue;
        }
        let candidate = dir.join(file);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    }
}
