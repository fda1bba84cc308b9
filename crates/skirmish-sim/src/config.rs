//! Duel runner configuration.
//!
//! Loaded from `skirmish.toml`; every field has a default so a missing or
//! partial file still produces a runnable duel.

use serde::{Deserialize, Serialize};
use skirmish_core::{FighterConfig, DEFAULT_CATALOG_PATH};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "skirmish.toml";

/// Built-in fighter presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Turns in place, uses the ready stance, blocks frontal hits
    #[default]
    Brawler,
    /// Instant flips, no blocking, switchable forms
    Platformer,
}

/// One side of the duel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FighterSlot {
    /// Preset used when no config file is given
    pub preset: Preset,
    /// Optional fighter config file, overriding the preset
    pub config_path: Option<PathBuf>,
    /// Spawn x coordinate
    pub spawn_x: f32,
}

impl Default for FighterSlot {
    fn default() -> Self {
        Self {
            preset: Preset::Brawler,
            config_path: None,
            spawn_x: -3.0,
        }
    }
}

impl FighterSlot {
    /// Resolves the slot to a fighter config.
    pub fn fighter_config(&self) -> FighterConfig {
        match &self.config_path {
            Some(path) => FighterConfig::load_from(path),
            None => match self.preset {
                Preset::Brawler => FighterConfig::brawler(),
                Preset::Platformer => FighterConfig::platformer(),
            },
        }
    }
}

/// Duel runner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Ticks to run before calling a draw
    pub max_ticks: u32,
    /// Attack catalog file (TOML or RON)
    pub catalog_path: PathBuf,
    /// Half-width of the floor
    pub arena_half_width: f32,
    /// Event bus capacity
    pub event_capacity: usize,
    /// Distance at which the scripted controllers attack
    pub attack_range: f32,
    /// Ticks between scripted attack attempts
    pub attack_cadence: u32,
    /// Left fighter
    pub left: FighterSlot,
    /// Right fighter
    pub right: FighterSlot,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: 50,
            max_ticks: 3000,
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            arena_half_width: 12.0,
            event_capacity: 4096,
            attack_range: 1.4,
            attack_cadence: 12,
            left: FighterSlot::default(),
            right: FighterSlot {
                spawn_x: 3.0,
                ..FighterSlot::default()
            },
        }
    }
}

impl SimConfig {
    /// Load configuration from a specific path.
    /// Returns default config if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(10, 240);
        self.max_ticks = self.max_ticks.max(1);
        self.arena_half_width = self.arena_half_width.clamp(2.0, 500.0);
        self.event_capacity = self.event_capacity.clamp(64, 1 << 20);
        self.attack_range = self.attack_range.clamp(0.1, 10.0);
        self.attack_cadence = self.attack_cadence.max(1);
    }

    /// Seconds per tick.
    #[must_use]
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimConfig::default();
        assert_eq!(config.tick_rate, 50);
        assert!((config.tick_seconds() - 0.02).abs() < 1e-6);
        assert!(config.left.spawn_x < config.right.spawn_x);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = SimConfig::load_from(dir.path().join("nope.toml"));
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let mut config = SimConfig::default();
        config.max_ticks = 120;
        config.right.preset = Preset::Platformer;
        config.save_to(&path).expect("save");

        let loaded = SimConfig::load_from(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_and_clamping() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "tick_rate = 1000\n[right]\npreset = \"platformer\"\n").expect("write");

        let loaded = SimConfig::load_from(&path);
        assert_eq!(loaded.tick_rate, 240);
        assert_eq!(loaded.right.preset, Preset::Platformer);
        assert_eq!(loaded.right.spawn_x, -3.0);
        assert_eq!(loaded.max_ticks, 3000);
    }

    #[test]
    fn test_slot_config_path_overrides_preset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fighter.toml");
        FighterConfig::default()
            .with_name("custom")
            .with_max_health(250)
            .save_to(&path)
            .expect("save");

        let slot = FighterSlot {
            config_path: Some(path),
            ..FighterSlot::default()
        };
        let config = slot.fighter_config();
        assert_eq!(config.name, "custom");
        assert_eq!(config.max_health, 250);
    }
}
