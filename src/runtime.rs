use crate::assets::{AssetLoader, DiskAssets};
use crate::audio::{AudioBackend, NullAudio, RodioAudio};
use crate::config::{AudioConfig, EngineConfig};
use crate::input::{HeldKeys, KeyState};
use crate::navigation::{advance_player, Keymap, MoveOutcome, MoveReport, Player};
use crate::scene::Scene;
use crate::time::Time;
use crate::triggers::{evaluate_triggers, SweepReport};
use crate::world::{self, LoadReport};
use anyhow::{bail, Result};
use glam::Vec3;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub movement: MoveReport,
    pub sweep: SweepReport,
}

/// Counters accumulated over a run of frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub frames: u64,
    pub fired: usize,
    pub slid: u64,
    pub held: u64,
}

impl RunStats {
    pub fn record(&mut self, frame: &FrameReport) {
        self.frames += 1;
        self.fired += frame.sweep.fired.len();
        match frame.movement.outcome {
            MoveOutcome::Slid => self.slid += 1,
            MoveOutcome::Held => self.held += 1,
            MoveOutcome::Free | MoveOutcome::Direct => {}
        }
    }
}

/// Owns the scene, the player and the audio collaborator, and runs the per-frame update.
pub struct Runtime<A: AudioBackend> {
    pub scene: Scene,
    pub player: Player,
    pub audio: A,
}

impl<A: AudioBackend> Runtime<A> {
    pub fn new(audio: A) -> Self {
        Self { scene: Scene::new(), player: Player::new(Vec3::ZERO, 0.0, Keymap::default()), audio }
    }

    /// Applies the configured music volume, which music started without an explicit volume uses.
    pub fn configure_audio(&mut self, config: &AudioConfig) {
        self.audio.set_music_volume(config.music_volume);
    }

    /// Merges a world file into the scene. A file that cannot be read leaves the scene untouched.
    pub fn load_world(&mut self, path: impl AsRef<Path>, assets: &mut dyn AssetLoader) -> Result<LoadReport> {
        world::load_world_file(&mut self.scene, path, assets, &mut self.audio)
    }

    /// Puts the player into the loaded walkmap. Call after every world is merged.
    pub fn spawn(&mut self, position: Vec3, yaw: f32, keymap: Keymap) {
        self.player = Player::spawn(position, yaw, keymap, &self.scene);
    }

    /// Moves the player, then evaluates triggers against the new position, then services audio.
    pub fn frame(&mut self, keys: &dyn KeyState, delta: f32) -> FrameReport {
        let movement = advance_player(&mut self.player, &self.scene, keys, delta);
        let sweep = evaluate_triggers(&mut self.scene, &self.player, keys, &mut self.audio);
        self.audio.update_listener(self.player.position, self.player.forward());
        self.audio.update();
        FrameReport { movement, sweep }
    }
}

fn open_audio(config: &EngineConfig) -> Box<dyn AudioBackend> {
    if !config.audio.enabled {
        log::info!("[audio] muted");
        return Box::new(NullAudio::default());
    }
    match RodioAudio::new() {
        Ok(audio) => Box::new(audio),
        Err(err) => {
            log::warn!("[audio] {err:#}; continuing without sound");
            Box::new(NullAudio::default())
        }
    }
}

/// Loads the configured worlds, spawns the player and runs `config.frames` frames at the fixed delta
/// with no keys held.
pub fn run_headless(config: &EngineConfig) -> Result<RunStats> {
    let mut assets = match &config.asset_root {
        Some(root) => DiskAssets::with_root(root),
        None => DiskAssets::new(),
    };
    let mut runtime = Runtime::new(open_audio(config));
    runtime.configure_audio(&config.audio);

    if config.worlds.is_empty() {
        log::warn!("[world] no world files configured; the scene is empty");
    }
    let mut loaded = 0;
    for path in &config.worlds {
        match runtime.load_world(path, &mut assets) {
            Ok(_) => loaded += 1,
            Err(err) => log::warn!("[world] {err:#}"),
        }
    }
    if loaded == 0 && !config.worlds.is_empty() {
        bail!("none of the {} configured world files could be read", config.worlds.len());
    }

    let [x, y, z] = config.spawn.position;
    runtime.spawn(Vec3::new(x, y, z), config.spawn.yaw.to_radians(), config.keymap.to_keymap());

    let mut time = Time::fixed(config.fixed_delta);
    let keys = HeldKeys::none();
    let mut stats = RunStats::default();
    for _ in 0..config.frames {
        time.tick();
        let report = runtime.frame(&keys, time.delta_seconds());
        stats.record(&report);
    }
    log::info!(
        "[runtime] {} frames in {:.2}s simulated: {} triggers fired, {} slides, {} held moves, player at {} in {}",
        stats.frames,
        time.elapsed_seconds(),
        stats.fired,
        stats.slid,
        stats.held,
        runtime.player.position,
        runtime.player.region.map_or_else(|| "no region".to_string(), |id| format!("region {id}"))
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioCommand, NullAudio};
    use crate::input::HeldKeys;
    use crate::triggers::{EventKind, TriggerAction, TriggerInfo};

    #[test]
    fn frame_runs_triggers_after_movement() {
        let mut runtime = Runtime::new(NullAudio::default());
        runtime.scene.triggers.insert(TriggerInfo::new(
            Vec3::new(4.5, 1.0, 0.0),
            Vec3::ONE,
            EventKind::Enter,
            TriggerAction::StopBackgroundMusic,
        ));
        runtime.spawn(Vec3::new(3.0, 1.8, 0.0), 0.0, Keymap::default());

        let mut stats = RunStats::default();
        let idle = runtime.frame(&HeldKeys::none(), 0.1);
        stats.record(&idle);
        assert!(idle.sweep.fired.is_empty());

        // No walkmap: the player walks freely along +X, 0.2 per frame, into the volume.
        let walking = HeldKeys::with([runtime.player.keymap.forward]);
        let mut fired_on = None;
        for _ in 0..5 {
            let report = runtime.frame(&walking, 0.1);
            stats.record(&report);
            if !report.sweep.fired.is_empty() && fired_on.is_none() {
                fired_on = Some(report.sweep.frame);
            }
        }
        assert_eq!(fired_on, Some(3));
        assert_eq!(stats.fired, 1);
        assert_eq!(stats.frames, 6);
        assert_eq!(runtime.scene.frame, 6);
        assert_eq!(runtime.audio.recent_commands().last(), Some(&AudioCommand::StopMusic));
    }

    #[test]
    fn configured_music_volume_reaches_music_without_a_volume() {
        let mut runtime = Runtime::new(NullAudio::default());
        runtime.configure_audio(&AudioConfig { enabled: false, music_volume: 40.0 });
        let text = "![0,0,0,0,0,0,onStart,playBackgroundMusic,(music/hall.ogg)]\n\
                    ![0,0,0,0,0,0,onStart,playBackgroundMusic,(music/yard.ogg, 70)]";
        let report = world::load_world_str(&mut runtime.scene, text, &mut DiskAssets::new(), &mut runtime.audio);
        assert_eq!(report.dropped, 0);

        runtime.frame(&HeldKeys::none(), 0.1);
        let volumes: Vec<_> = runtime
            .audio
            .recent_commands()
            .filter_map(|cmd| match cmd {
                AudioCommand::PlayMusic { path, volume, .. } => Some((path.display().to_string(), *volume)),
                _ => None,
            })
            .collect();
        assert_eq!(volumes, vec![("music/hall.ogg".to_string(), 40.0), ("music/yard.ogg".to_string(), 70.0)]);
    }

    #[test]
    fn start_actions_run_once() {
        let mut runtime = Runtime::new(NullAudio::default());
        runtime.scene.triggers.insert(TriggerInfo::new(
            Vec3::ZERO,
            Vec3::ZERO,
            EventKind::Start,
            TriggerAction::SetBackgroundMusicVolume(30.0),
        ));
        runtime.frame(&HeldKeys::none(), 0.1);
        runtime.frame(&HeldKeys::none(), 0.1);
        let volumes: Vec<_> =
            runtime.audio.recent_commands().filter(|cmd| matches!(cmd, AudioCommand::MusicVolume(_))).collect();
        assert_eq!(volumes, vec![&AudioCommand::MusicVolume(30.0)]);
    }
}
