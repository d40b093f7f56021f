use crate::assets::AssetLoader;
use crate::audio::{AudioBackend, SoundPlayback};
use crate::scene::{SceneSettings, SettingField};
use crate::world::Block;
use anyhow::{anyhow, bail, Result};
use glam::Vec3;
use std::path::PathBuf;

/// The closed set of trigger actions with parameters resolved at load time.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerAction {
    LogToConsole(String),
    ChangeSetting { field: SettingField, value: f32 },
    /// `volume: None` plays at the backend's configured music volume.
    PlayBackgroundMusic { path: PathBuf, volume: Option<f32>, looping: bool },
    StopBackgroundMusic,
    SetBackgroundMusicVolume(f32),
    SetBackgroundMusicLoop(bool),
    PlaySound { name: String, looping: bool, spatial: bool },
}

/// Everything an action is allowed to touch.
pub struct ActionContext<'a> {
    pub settings: &'a mut SceneSettings,
    pub audio: &'a mut dyn AudioBackend,
    /// Center of the trigger volume that fired.
    pub origin: Vec3,
}

fn flag(value: f32) -> bool {
    value != 0.0
}

fn number(params: &Block, index: usize, what: &str) -> Result<f32> {
    params.numbers.get(index).copied().ok_or_else(|| anyhow!("missing {what} parameter"))
}

fn string<'a>(params: &'a Block, index: usize, what: &str) -> Result<&'a str> {
    params.strings.get(index).map(String::as_str).ok_or_else(|| anyhow!("missing {what} parameter"))
}

impl TriggerAction {
    pub const NAMES: [&'static str; 8] = [
        "logToConsole",
        "changeSetting",
        "playBackgroundMusic",
        "stopBackgroundMusic",
        "setBackgroundMusicVolume",
        "setBackgroundMusicLoop",
        "playSound",
        "playSoundAtTrigger",
    ];

    pub fn resolve(name: &str, params: &Block, assets: &dyn AssetLoader) -> Result<Self> {
        Ok(match name {
            "logToConsole" => {
                let mut parts: Vec<String> = params.strings.clone();
                parts.extend(params.numbers.iter().map(|value| value.to_string()));
                TriggerAction::LogToConsole(parts.join(" "))
            }
            "changeSetting" => {
                let index = number(params, 0, "setting index")?;
                let value = number(params, 1, "setting value")?;
                let field = (index >= 0.0 && index.fract() == 0.0)
                    .then(|| SettingField::from_index(index as usize))
                    .flatten()
                    .ok_or_else(|| anyhow!("setting index {index} does not name a setting"))?;
                TriggerAction::ChangeSetting { field, value }
            }
            "playBackgroundMusic" => TriggerAction::PlayBackgroundMusic {
                path: assets.resolve(string(params, 0, "music path")?),
                volume: params.numbers.first().copied(),
                looping: params.numbers.get(1).copied().map_or(true, flag),
            },
            "stopBackgroundMusic" => TriggerAction::StopBackgroundMusic,
            "setBackgroundMusicVolume" => {
                TriggerAction::SetBackgroundMusicVolume(number(params, 0, "volume")?)
            }
            "setBackgroundMusicLoop" => TriggerAction::SetBackgroundMusicLoop(flag(number(params, 0, "loop")?)),
            "playSound" | "playSoundAtTrigger" => TriggerAction::PlaySound {
                name: string(params, 0, "sound name")?.to_string(),
                looping: params.numbers.first().copied().map_or(false, flag),
                spatial: name == "playSoundAtTrigger",
            },
            _ => bail!("unknown action '{name}' (known: {})", Self::NAMES.join(", ")),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            TriggerAction::LogToConsole(_) => "logToConsole",
            TriggerAction::ChangeSetting { .. } => "changeSetting",
            TriggerAction::PlayBackgroundMusic { .. } => "playBackgroundMusic",
            TriggerAction::StopBackgroundMusic => "stopBackgroundMusic",
            TriggerAction::SetBackgroundMusicVolume(_) => "setBackgroundMusicVolume",
            TriggerAction::SetBackgroundMusicLoop(_) => "setBackgroundMusicLoop",
            TriggerAction::PlaySound { spatial: false, .. } => "playSound",
            TriggerAction::PlaySound { spatial: true, .. } => "playSoundAtTrigger",
        }
    }

    /// Runs the action. Audio failures are logged; they never stop the sweep.
    pub fn run(&self, ctx: &mut ActionContext<'_>) {
        match self {
            TriggerAction::LogToConsole(message) => log::info!("[trigger] {message}"),
            TriggerAction::ChangeSetting { field, value } => {
                log::debug!("[trigger] {field}: {} -> {value}", ctx.settings.get(*field));
                ctx.settings.set(*field, *value);
            }
            TriggerAction::PlayBackgroundMusic { path, volume, looping } => {
                let volume = volume.unwrap_or_else(|| ctx.audio.music_volume());
                if let Err(err) = ctx.audio.play_music(path, volume, *looping) {
                    log::warn!("[audio] background music {} failed: {err:#}", path.display());
                }
            }
            TriggerAction::StopBackgroundMusic => ctx.audio.stop_music(),
            TriggerAction::SetBackgroundMusicVolume(volume) => ctx.audio.set_music_volume(*volume),
            TriggerAction::SetBackgroundMusicLoop(looping) => ctx.audio.set_music_looping(*looping),
            TriggerAction::PlaySound { name, looping, spatial } => {
                let playback = SoundPlayback { looping: *looping, position: spatial.then_some(ctx.origin) };
                if let Err(err) = ctx.audio.play_sound(name, playback) {
                    log::warn!("[audio] {err:#}");
                }
            }
        }
    }
}
