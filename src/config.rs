use anyhow::Result;
use eldergrove_world::StreamingConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Default location of the run configuration.
pub const DEFAULT_CONFIG_PATH: &str = "config/eldergrove.toml";

/// Streaming parameters plus the scripted walk the headless driver follows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Frames to simulate.
    pub frames: u64,
    /// World units the player moves per frame.
    pub player_speed: f32,
    /// Radius of the circular walk around the origin.
    pub path_radius: f32,
    /// Camera height above the terrain.
    pub eye_height: f32,
    /// Frames between stats log lines; zero disables them.
    pub stats_interval: u64,
    pub streaming: StreamingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            frames: 1200,
            player_speed: 1.5,
            path_radius: 256.0,
            eye_height: 1.8,
            stats_interval: 120,
            streaming: StreamingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from [`DEFAULT_CONFIG_PATH`], falling back to defaults.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                Ok(cfg) => cfg.sanitized(),
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    AppConfig::default()
                }
            },
            Err(err) => {
                if path != Path::new(DEFAULT_CONFIG_PATH)
                    || err.kind() != std::io::ErrorKind::NotFound
                {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else {
                    warn!("Config not found at {}. Using defaults", path.display());
                }
                AppConfig::default()
            }
        }
    }

    /// Write the configuration as TOML, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    /// Replace an invalid streaming table and non-positive walk values with defaults.
    fn sanitized(mut self) -> Self {
        let defaults = AppConfig::default();
        if let Err(err) = self.streaming.validate() {
            warn!(%err, "Invalid [streaming] table. Using default streaming settings");
            self.streaming = defaults.streaming;
        }
        if !(self.player_speed > 0.0) {
            warn!(value = self.player_speed, "player_speed must be positive");
            self.player_speed = defaults.player_speed;
        }
        if !(self.path_radius > 0.0) {
            warn!(value = self.path_radius, "path_radius must be positive");
            self.path_radius = defaults.path_radius;
        }
        self
    }
}
