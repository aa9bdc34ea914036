use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::health::HealthConfig;
use crate::presets::DEFAULT_PRESET;
use crate::session::SessionConfig;
use crate::snake::SnakeConfig;
use crate::tune::GameMode;

pub const DEFAULT_TICK_RATE_MS: u64 = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub mode: GameMode,
    pub preset: String,
    /// Tune file that replaces the preset when set.
    pub tunes_file: Option<PathBuf>,
    pub tick_rate_ms: u64,
    pub health: HealthConfig,
    pub snake: SnakeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: GameMode::Simple,
            preset: DEFAULT_PRESET.to_string(),
            tunes_file: None,
            tick_rate_ms: DEFAULT_TICK_RATE_MS,
            health: HealthConfig::default(),
            snake: SnakeConfig::default(),
        }
    }
}

impl Config {
    /// Swaps out any section that fails validation for its defaults.
    pub fn validated(mut self) -> Self {
        if let Err(e) = self.health.validate() {
            warn!(error = %e, "invalid health settings, using defaults");
            self.health = HealthConfig::default();
        }
        if let Err(e) = self.snake.validate() {
            warn!(error = %e, "invalid snake settings, using defaults");
            self.snake = SnakeConfig::default();
        }
        if self.tick_rate_ms == 0 {
            warn!("tick rate must be at least 1 ms, using the default");
            self.tick_rate_ms = DEFAULT_TICK_RATE_MS;
        }
        self
    }
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            mode: cfg.mode,
            health: cfg.health.clone(),
            snake: cfg.snake.clone(),
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing or unreadable config falls back to defaults, and so does any
    /// section with out-of-range values.
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg.validated(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable config");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
