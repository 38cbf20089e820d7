//! Pipeline configuration.
//!
//! Values come from, in increasing precedence: built-in defaults, a TOML
//! file, `COMICFLIP_*` environment variables and finally whatever the caller
//! sets through the `with_*` builders (the CLI maps its flags onto those).

use comicflip_cache::DEFAULT_RENDER_CACHE_CAPACITY;
use comicflip_render::{FitMode, DEFAULT_MEMO_CAPACITY};
use comicflip_scheduler::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKER_COUNT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// When a nearest-neighbour preview may be painted ahead of the real render
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreviewPolicy {
    Never,
    /// Skip on the first render of a document and right after a resize
    #[default]
    AfterFirstRender,
    Always,
}

impl std::str::FromStr for PreviewPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never" => Ok(Self::Never),
            "after-first-render" => Ok(Self::AfterFirstRender),
            "always" => Ok(Self::Always),
            other => Err(format!("unknown preview policy '{other}'")),
        }
    }
}

/// Tunables of the render pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Render cache entries
    pub cache_capacity: usize,
    /// Work queue bound
    pub queue_capacity: usize,
    /// Worker threads per open document
    pub worker_count: usize,
    /// Navigation debounce quiet period
    pub debounce_ms: u64,
    /// Resize memo entries, 0 disables the memo layer
    pub memo_capacity: usize,
    /// Both viewport sides must reach this before results are cached
    pub stable_viewport_min: u32,
    /// Preload the next image page after each render
    pub preload_next: bool,
    pub preview: PreviewPolicy,
    pub fit: FitMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_RENDER_CACHE_CAPACITY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            worker_count: DEFAULT_WORKER_COUNT,
            debounce_ms: 150,
            memo_capacity: DEFAULT_MEMO_CAPACITY,
            stable_viewport_min: 100,
            preload_next: true,
            preview: PreviewPolicy::default(),
            fit: FitMode::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets the worker count, clamped to at least one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.worker_count = workers.max(1);
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub fn with_memo_capacity(mut self, capacity: usize) -> Self {
        self.memo_capacity = capacity;
        self
    }

    pub fn with_stable_viewport_min(mut self, min: u32) -> Self {
        self.stable_viewport_min = min;
        self
    }

    pub fn with_preload_next(mut self, preload: bool) -> Self {
        self.preload_next = preload;
        self
    }

    pub fn with_preview(mut self, preview: PreviewPolicy) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_fit(mut self, fit: FitMode) -> Self {
        self.fit = fit;
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// `<config dir>/comicflip/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("comicflip").join("config.toml"))
    }

    /// Resolve the full configuration.
    ///
    /// An explicit `path` must exist. Without one the default path is used
    /// when present. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(path)?,
                None => Self::default(),
            },
        };
        config.apply_env()
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// Override fields from `COMICFLIP_*` variables:
    ///
    /// - `COMICFLIP_WORKERS`
    /// - `COMICFLIP_QUEUE_CAPACITY`
    /// - `COMICFLIP_CACHE_CAPACITY`
    /// - `COMICFLIP_DEBOUNCE_MS`
    /// - `COMICFLIP_MEMO_CAPACITY`
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Some(workers) = env_number::<usize>("COMICFLIP_WORKERS")? {
            self.worker_count = workers;
        }
        if let Some(capacity) = env_number::<usize>("COMICFLIP_QUEUE_CAPACITY")? {
            self.queue_capacity = capacity;
        }
        if let Some(capacity) = env_number::<usize>("COMICFLIP_CACHE_CAPACITY")? {
            self.cache_capacity = capacity;
        }
        if let Some(ms) = env_number::<u64>("COMICFLIP_DEBOUNCE_MS")? {
            self.debounce_ms = ms;
        }
        if let Some(capacity) = env_number::<usize>("COMICFLIP_MEMO_CAPACITY")? {
            self.memo_capacity = capacity;
        }
        self.validate()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Parse TOML; missing keys keep their defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Reject capacities of zero; clamp the worker count.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::InvalidValue("cache_capacity".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue("queue_capacity".to_string()));
        }
        self.worker_count = self.worker_count.max(1);
        Ok(self)
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        Err(_) => Ok(None),
    }
}

/// Errors that can occur while loading or saving configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid value for a configuration key or variable
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}
