use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("content config read failed: path={path:?} err={source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("content config parse failed (json): path={path:?} err={source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Effective configuration of one content manager.
/// All fields have concrete defaults.
#[derive(Debug, Clone)]
pub struct ContentManagerConfig {
    pub root_directory: PathBuf,
    /// Searched after the root, in order; later directories win.
    pub override_directories: Vec<PathBuf>,
    /// Source content tree that hot reloads read from (debug builds).
    pub solution_directory: Option<PathBuf>,
    pub suppress_dependency_tracking: bool,
    pub batch_deleted_files: bool,
    pub watch_content: bool,
    /// Start OS file watchers. When false the host feeds `on_file_changed` itself.
    pub file_system_events: bool,
}

impl Default for ContentManagerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            root_directory: PathBuf::from("content"),
            override_directories: Vec::new(),
            solution_directory: None,
            suppress_dependency_tracking: false,
            batch_deleted_files: false,
            watch_content: cfg!(debug_assertions),
            file_system_events: true,
        }
    }
}

impl ContentManagerConfig {
    #[inline]
    pub fn new(root_directory: impl Into<PathBuf>) -> Self {
        Self {
            root_directory: root_directory.into(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn with_override_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.override_directories.push(dir.into());
        self
    }

    #[inline]
    pub fn with_solution_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.solution_directory = Some(dir.into());
        self
    }

    #[inline]
    pub fn with_watch_content(mut self, watch: bool) -> Self {
        self.watch_content = watch;
        self
    }

    #[inline]
    pub fn with_file_system_events(mut self, enabled: bool) -> Self {
        self.file_system_events = enabled;
        self
    }

    #[inline]
    pub fn with_suppressed_dependency_tracking(mut self, suppress: bool) -> Self {
        self.suppress_dependency_tracking = suppress;
        self
    }
}

/// Optional values of one configuration layer (env or programmatic).
#[derive(Debug, Clone, Default)]
pub struct ContentConfigOverrides {
    pub root_directory: Option<PathBuf>,
    pub override_directories: Option<Vec<PathBuf>>,
    pub solution_directory: Option<PathBuf>,
    pub suppress_dependency_tracking: Option<bool>,
    pub batch_deleted_files: Option<bool>,
    pub watch_content: Option<bool>,
    pub file_system_events: Option<bool>,
}

impl ContentConfigOverrides {
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads `NEWENGINE_CONTENT_*` variables. Unparseable booleans are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key).map(|v| v.to_string_lossy().into_owned()))
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            root_directory: non_empty("NEWENGINE_CONTENT_ROOT").map(PathBuf::from),
            override_directories: non_empty("NEWENGINE_CONTENT_OVERRIDES")
                .map(|v| std::env::split_paths(&v).collect()),
            solution_directory: non_empty("NEWENGINE_CONTENT_SOLUTION_DIR").map(PathBuf::from),
            suppress_dependency_tracking: non_empty("NEWENGINE_CONTENT_SUPPRESS_DEPS")
                .and_then(|v| parse_bool(&v)),
            batch_deleted_files: None,
            watch_content: non_empty("NEWENGINE_CONTENT_WATCH").and_then(|v| parse_bool(&v)),
            file_system_events: non_empty("NEWENGINE_CONTENT_FS_EVENTS")
                .and_then(|v| parse_bool(&v)),
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContentConfigSource {
    #[default]
    Defaults,
    File {
        path: PathBuf,
    },
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentOverrideSource {
    File,
    Env,
    Programmatic,
}

#[derive(Debug, Clone)]
pub struct ContentOverride {
    pub key: &'static str,
    pub source: ContentOverrideSource,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default)]
pub struct ContentConfigReport {
    pub source: ContentConfigSource,
    pub file: Option<PathBuf>,
    pub overrides: Vec<ContentOverride>,
}

impl ContentConfigReport {
    #[inline]
    pub fn has_overrides(&self) -> bool {
        !self.overrides.is_empty()
    }

    /// Layer that last set `key`, if any.
    pub fn source_of(&self, key: &str) -> Option<ContentOverrideSource> {
        self.overrides
            .iter()
            .rev()
            .find(|o| o.key == key)
            .map(|o| o.source)
    }
}

pub struct ContentConfigLoader;

impl ContentConfigLoader {
    /// Loads the content config with layering:
    /// defaults -> file -> env -> programmatic.
    pub fn load_json(path: &Path) -> Result<(ContentManagerConfig, ContentConfigReport), ConfigError> {
        Self::load_json_with_overrides(path, &ContentConfigOverrides::empty())
    }

    pub fn load_json_with_overrides(
        path: &Path,
        programmatic: &ContentConfigOverrides,
    ) -> Result<(ContentManagerConfig, ContentConfigReport), ConfigError> {
        Self::load_layers(path, &ContentConfigOverrides::from_env(), programmatic)
    }

    pub(crate) fn load_layers(
        path: &Path,
        env: &ContentConfigOverrides,
        programmatic: &ContentConfigOverrides,
    ) -> Result<(ContentManagerConfig, ContentConfigReport), ConfigError> {
        let mut cfg = ContentManagerConfig::default();
        let mut report = ContentConfigReport::default();

        // Missing file is not an error.
        if path.is_file() {
            let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let parsed: RootJson = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
            if let Some(content) = parsed.content {
                apply_overrides(&mut cfg, &mut report, ContentOverrideSource::File, &content.into());
            }
            report.file = Some(path.to_path_buf());
            report.source = ContentConfigSource::File {
                path: path.to_path_buf(),
            };
        }

        apply_overrides(&mut cfg, &mut report, ContentOverrideSource::Env, env);
        apply_overrides(&mut cfg, &mut report, ContentOverrideSource::Programmatic, programmatic);

        let mixed = report
            .overrides
            .iter()
            .any(|o| o.source != ContentOverrideSource::File);
        if mixed {
            report.source = ContentConfigSource::Mixed;
        }

        Ok((cfg, report))
    }
}

#[derive(Deserialize)]
struct RootJson {
    content: Option<ContentJson>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentJson {
    root: Option<String>,
    overrides: Option<Vec<String>>,
    solution: Option<String>,
    suppress_dependency_tracking: Option<bool>,
    batch_deleted_files: Option<bool>,
    watch: Option<bool>,
    file_system_events: Option<bool>,
}

impl From<ContentJson> for ContentConfigOverrides {
    fn from(j: ContentJson) -> Self {
        Self {
            root_directory: j.root.map(PathBuf::from),
            override_directories: j
                .overrides
                .map(|v| v.into_iter().map(PathBuf::from).collect()),
            solution_directory: j.solution.map(PathBuf::from),
            suppress_dependency_tracking: j.suppress_dependency_tracking,
            batch_deleted_files: j.batch_deleted_files,
            watch_content: j.watch,
            file_system_events: j.file_system_events,
        }
    }
}

fn apply_overrides(
    cfg: &mut ContentManagerConfig,
    report: &mut ContentConfigReport,
    source: ContentOverrideSource,
    ov: &ContentConfigOverrides,
) {
    if let Some(v) = ov.root_directory.clone() {
        let from = cfg.root_directory.display().to_string();
        cfg.root_directory = v;
        record(report, source, "root_directory", from, cfg.root_directory.display().to_string());
    }

    if let Some(v) = ov.override_directories.clone() {
        let from = format_paths(&cfg.override_directories);
        cfg.override_directories = v;
        record(report, source, "override_directories", from, format_paths(&cfg.override_directories));
    }

    if let Some(v) = ov.solution_directory.clone() {
        let from = format_opt_path(cfg.solution_directory.as_deref());
        cfg.solution_directory = Some(v);
        record(report, source, "solution_directory", from, format_opt_path(cfg.solution_directory.as_deref()));
    }

    apply_bool(report, source, "suppress_dependency_tracking", &mut cfg.suppress_dependency_tracking, ov.suppress_dependency_tracking);
    apply_bool(report, source, "batch_deleted_files", &mut cfg.batch_deleted_files, ov.batch_deleted_files);
    apply_bool(report, source, "watch_content", &mut cfg.watch_content, ov.watch_content);
    apply_bool(report, source, "file_system_events", &mut cfg.file_system_events, ov.file_system_events);
}

fn apply_bool(
    report: &mut ContentConfigReport,
    source: ContentOverrideSource,
    key: &'static str,
    slot: &mut bool,
    to: Option<bool>,
) {
    let Some(to) = to else {
        return;
    };
    let from = *slot;
    *slot = to;
    record(report, source, key, from.to_string(), to.to_string());
}

fn record(
    report: &mut ContentConfigReport,
    source: ContentOverrideSource,
    key: &'static str,
    from: String,
    to: String,
) {
    if from == to {
        return;
    }
    report.overrides.push(ContentOverride { key, source, from, to });
}

fn format_paths(paths: &[PathBuf]) -> String {
    let parts: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    format!("[{}]", parts.join(", "))
}

#[inline]
fn format_opt_path(p: Option<&Path>) -> String {
    p.map_or_else(|| "none".to_owned(), |p| p.display().to_string())
}
