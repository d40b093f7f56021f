use crate::input::keys;
use crate::navigation::Keymap;
use anyhow::{Context, Result};
use log::LevelFilter;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct KeymapConfig {
    #[serde(default = "KeymapConfig::default_forward")]
    pub forward: String,
    #[serde(default = "KeymapConfig::default_backward")]
    pub backward: String,
    #[serde(default = "KeymapConfig::default_left")]
    pub left: String,
    #[serde(default = "KeymapConfig::default_right")]
    pub right: String,
    #[serde(default = "KeymapConfig::default_up")]
    pub up: String,
    #[serde(default = "KeymapConfig::default_down")]
    pub down: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpawnConfig {
    #[serde(default)]
    pub position: [f32; 3],
    /// Heading in degrees; 0 looks down +X.
    #[serde(default)]
    pub yaw: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "AudioConfig::default_enabled")]
    pub enabled: bool,
    /// 0-100, used by background music started without an explicit volume.
    #[serde(default = "AudioConfig::default_music_volume")]
    pub music_volume: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Merged into one scene, in order.
    #[serde(default)]
    pub worlds: Vec<PathBuf>,
    #[serde(default)]
    pub asset_root: Option<PathBuf>,
    #[serde(default)]
    pub keymap: KeymapConfig,
    #[serde(default)]
    pub spawn: SpawnConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default = "EngineConfig::default_log_level")]
    pub log_level: String,
    /// Seconds per frame for headless runs.
    #[serde(default = "EngineConfig::default_fixed_delta")]
    pub fixed_delta: f32,
    #[serde(default = "EngineConfig::default_frames")]
    pub frames: u32,
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfigOverrides {
    pub worlds: Vec<PathBuf>,
    pub frames: Option<u32>,
    pub fixed_delta: Option<f32>,
    pub mute: bool,
    pub log_level: Option<String>,
}

impl KeymapConfig {
    fn default_forward() -> String {
        "w".to_string()
    }

    fn default_backward() -> String {
        "s".to_string()
    }

    fn default_left() -> String {
        "a".to_string()
    }

    fn default_right() -> String {
        "d".to_string()
    }

    fn default_up() -> String {
        "space".to_string()
    }

    fn default_down() -> String {
        "left_shift".to_string()
    }

    /// Resolves key names, keeping the default binding for any name that does not parse.
    pub fn to_keymap(&self) -> Keymap {
        let defaults = Keymap::default();
        let resolve = |label: &str, raw: &str, fallback| {
            keys::from_name(raw).unwrap_or_else(|| {
                log::warn!("[config] unknown key '{raw}' for {label}, keeping default {fallback}");
                fallback
            })
        };
        Keymap {
            forward: resolve("forward", &self.forward, defaults.forward),
            backward: resolve("backward", &self.backward, defaults.backward),
            left: resolve("left", &self.left, defaults.left),
            right: resolve("right", &self.right, defaults.right),
            up: resolve("up", &self.up, defaults.up),
            down: resolve("down", &self.down, defaults.down),
        }
    }
}

impl Default for KeymapConfig {
    fn default() -> Self {
        Self {
            forward: Self::default_forward(),
            backward: Self::default_backward(),
            left: Self::default_left(),
            right: Self::default_right(),
            up: Self::default_up(),
            down: Self::default_down(),
        }
    }
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self { position: [0.0; 3], yaw: 0.0 }
    }
}

impl AudioConfig {
    const fn default_enabled() -> bool {
        true
    }

    const fn default_music_volume() -> f32 {
        100.0
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { enabled: Self::default_enabled(), music_volume: Self::default_music_volume() }
    }
}

impl EngineConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }

    const fn default_fixed_delta() -> f32 {
        1.0 / 60.0
    }

    const fn default_frames() -> u32 {
        120
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("[config] {err:#}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    /// CLI worlds replace the configured list; other fields override one by one.
    pub fn apply_overrides(&mut self, overrides: &EngineConfigOverrides) {
        if !overrides.worlds.is_empty() {
            self.worlds = overrides.worlds.clone();
        }
        if let Some(frames) = overrides.frames {
            self.frames = frames;
        }
        if let Some(delta) = overrides.fixed_delta {
            self.fixed_delta = delta;
        }
        if overrides.mute {
            self.audio.enabled = false;
        }
        if let Some(level) = &overrides.log_level {
            self.log_level = level.clone();
        }
    }

    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worlds: Vec::new(),
            asset_root: None,
            keymap: KeymapConfig::default(),
            spawn: SpawnConfig::default(),
            audio: AudioConfig::default(),
            log_level: Self::default_log_level(),
            fixed_delta: Self::default_fixed_delta(),
            frames: Self::default_frames(),
        }
    }
}

impl EngineConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
            && self.frames.is_none()
            && self.fixed_delta.is_none()
            && !self.mute
            && self.log_level.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if !self.worlds.is_empty() {
            fields.push("worlds");
        }
        if self.frames.is_some() {
            fields.push("frames");
        }
        if self.fixed_delta.is_some() {
            fields.push("fixed_delta");
        }
        if self.mute {
            fields.push("mute");
        }
        if self.log_level.is_some() {
            fields.push("log_level");
        }
        fields
    }
}
