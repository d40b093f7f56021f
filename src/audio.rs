use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source, SpatialSink};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fs::{self, File};
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How a registered sound should be voiced.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SoundPlayback {
    pub looping: bool,
    /// World-space emitter; `None` plays the sound flat.
    pub position: Option<Vec3>,
}

/// The audio collaborator driven by `.` blocks and trigger actions.
pub trait AudioBackend {
    fn load_sound(&mut self, name: &str, path: &Path) -> Result<()>;
    fn play_sound(&mut self, name: &str, playback: SoundPlayback) -> Result<()>;
    fn play_music(&mut self, path: &Path, volume: f32, looping: bool) -> Result<()>;
    fn stop_music(&mut self);
    fn set_music_volume(&mut self, volume: f32);
    fn set_music_looping(&mut self, looping: bool);
    /// Volume (0-100) used by music started without an explicit volume.
    fn music_volume(&self) -> f32;
    fn update_listener(&mut self, _position: Vec3, _forward: Vec3) {}
    /// Releases voices that finished playing.
    fn update(&mut self) {}
}

impl<T: AudioBackend + ?Sized> AudioBackend for Box<T> {
    fn load_sound(&mut self, name: &str, path: &Path) -> Result<()> {
        (**self).load_sound(name, path)
    }

    fn play_sound(&mut self, name: &str, playback: SoundPlayback) -> Result<()> {
        (**self).play_sound(name, playback)
    }

    fn play_music(&mut self, path: &Path, volume: f32, looping: bool) -> Result<()> {
        (**self).play_music(path, volume, looping)
    }

    fn stop_music(&mut self) {
        (**self).stop_music()
    }

    fn set_music_volume(&mut self, volume: f32) {
        (**self).set_music_volume(volume)
    }

    fn set_music_looping(&mut self, looping: bool) {
        (**self).set_music_looping(looping)
    }

    fn music_volume(&self) -> f32 {
        (**self).music_volume()
    }

    fn update_listener(&mut self, position: Vec3, forward: Vec3) {
        (**self).update_listener(position, forward)
    }

    fn update(&mut self) {
        (**self).update()
    }
}

const DEFAULT_MUSIC_VOLUME: f32 = 100.0;

/// Background track bookkeeping shared by every backend.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicState {
    pub track: Option<PathBuf>,
    pub volume: f32,
    pub looping: bool,
}

impl Default for MusicState {
    fn default() -> Self {
        Self { track: None, volume: DEFAULT_MUSIC_VOLUME, looping: true }
    }
}

impl MusicState {
    pub fn start(&mut self, path: &Path, volume: f32, looping: bool) {
        self.track = Some(path.to_path_buf());
        self.volume = volume;
        self.looping = looping;
    }

    pub fn stop(&mut self) {
        self.track = None;
    }

    /// Track to queue again once the current pass has `finished`. Reads the looping flag at that
    /// moment, so toggling it affects the track already playing.
    pub fn requeue(&self, finished: bool) -> Option<&Path> {
        if finished && self.looping {
            self.track.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioCommand {
    LoadSound { name: String, path: PathBuf },
    PlaySound { name: String, playback: SoundPlayback },
    PlayMusic { path: PathBuf, volume: f32, looping: bool },
    StopMusic,
    MusicVolume(f32),
    MusicLooping(bool),
}

/// Silent backend that remembers the most recent commands it received.
pub struct NullAudio {
    capacity: usize,
    sounds: BTreeSet<String>,
    commands: VecDeque<AudioCommand>,
    music: MusicState,
}

impl NullAudio {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            sounds: BTreeSet::new(),
            commands: VecDeque::new(),
            music: MusicState::default(),
        }
    }

    pub fn music(&self) -> &MusicState {
        &self.music
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn recent_commands(&self) -> impl ExactSizeIterator<Item = &AudioCommand> {
        self.commands.iter()
    }

    pub fn has_sound(&self, name: &str) -> bool {
        self.sounds.contains(name)
    }

    fn push_command(&mut self, command: AudioCommand) {
        if self.commands.len() == self.capacity {
            self.commands.pop_front();
        }
        self.commands.push_back(command);
    }
}

impl Default for NullAudio {
    fn default() -> Self {
        Self::new(64)
    }
}

impl AudioBackend for NullAudio {
    fn load_sound(&mut self, name: &str, path: &Path) -> Result<()> {
        self.sounds.insert(name.to_string());
        self.push_command(AudioCommand::LoadSound { name: name.to_string(), path: path.to_path_buf() });
        Ok(())
    }

    fn play_sound(&mut self, name: &str, playback: SoundPlayback) -> Result<()> {
        if !self.sounds.contains(name) {
            return Err(anyhow!("Invalid key for sound: {name}"));
        }
        self.push_command(AudioCommand::PlaySound { name: name.to_string(), playback });
        Ok(())
    }

    fn play_music(&mut self, path: &Path, volume: f32, looping: bool) -> Result<()> {
        self.music.start(path, volume, looping);
        self.push_command(AudioCommand::PlayMusic { path: path.to_path_buf(), volume, looping });
        Ok(())
    }

    fn stop_music(&mut self) {
        self.music.stop();
        self.push_command(AudioCommand::StopMusic);
    }

    fn set_music_volume(&mut self, volume: f32) {
        self.music.volume = volume;
        self.push_command(AudioCommand::MusicVolume(volume));
    }

    fn set_music_looping(&mut self, looping: bool) {
        self.music.looping = looping;
        self.push_command(AudioCommand::MusicLooping(looping));
    }

    fn music_volume(&self) -> f32 {
        self.music.volume
    }
}

enum Voice {
    Flat(Sink),
    Spatial(SpatialSink),
}

impl Voice {
    fn finished(&self) -> bool {
        match self {
            Voice::Flat(sink) => sink.empty(),
            Voice::Spatial(sink) => sink.empty(),
        }
    }
}

const EAR_SPACING: f32 = 0.2;

/// Device-backed playback. Sound files are kept encoded in memory and decoded per voice.
pub struct RodioAudio {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    buffers: HashMap<String, Arc<[u8]>>,
    voices: Vec<Voice>,
    music_sink: Option<Sink>,
    music: MusicState,
    ears: ([f32; 3], [f32; 3]),
}

impl RodioAudio {
    pub fn new() -> Result<Self> {
        let (stream, handle) = OutputStream::try_default().context("No audio output device available")?;
        Ok(Self {
            _stream: stream,
            handle,
            buffers: HashMap::new(),
            voices: Vec::new(),
            music_sink: None,
            music: MusicState::default(),
            ears: ([-EAR_SPACING * 0.5, 0.0, 0.0], [EAR_SPACING * 0.5, 0.0, 0.0]),
        })
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }
}

impl AudioBackend for RodioAudio {
    fn load_sound(&mut self, name: &str, path: &Path) -> Result<()> {
        let bytes: Arc<[u8]> =
            fs::read(path).with_context(|| format!("Failed to read sound {}", path.display()))?.into();
        Decoder::new(Cursor::new(bytes.clone()))
            .with_context(|| format!("Unsupported sound format {}", path.display()))?;
        self.buffers.insert(name.to_string(), bytes);
        Ok(())
    }

    fn play_sound(&mut self, name: &str, playback: SoundPlayback) -> Result<()> {
        let bytes = self.buffers.get(name).ok_or_else(|| anyhow!("Invalid key for sound: {name}"))?.clone();
        let source = Decoder::new(Cursor::new(bytes))?;
        let voice = match playback.position {
            Some(position) => {
                let (left, right) = self.ears;
                let sink = SpatialSink::try_new(&self.handle, position.to_array(), left, right)?;
                if playback.looping {
                    sink.append(source.repeat_infinite());
                } else {
                    sink.append(source);
                }
                Voice::Spatial(sink)
            }
            None => {
                let sink = Sink::try_new(&self.handle)?;
                if playback.looping {
                    sink.append(source.repeat_infinite());
                } else {
                    sink.append(source);
                }
                Voice::Flat(sink)
            }
        };
        self.voices.push(voice);
        Ok(())
    }

    fn play_music(&mut self, path: &Path, volume: f32, looping: bool) -> Result<()> {
        self.stop_music();
        let sink = Sink::try_new(&self.handle)?;
        sink.append(open_track(path)?);
        sink.set_volume(volume / 100.0);
        self.music.start(path, volume, looping);
        self.music_sink = Some(sink);
        Ok(())
    }

    fn stop_music(&mut self) {
        if let Some(sink) = self.music_sink.take() {
            sink.stop();
        }
        self.music.stop();
    }

    fn set_music_volume(&mut self, volume: f32) {
        self.music.volume = volume;
        if let Some(sink) = &self.music_sink {
            sink.set_volume(volume / 100.0);
        }
    }

    // Tracks are queued one pass at a time, so the flag is read again when the current pass ends.
    fn set_music_looping(&mut self, looping: bool) {
        self.music.looping = looping;
    }

    fn music_volume(&self) -> f32 {
        self.music.volume
    }

    fn update_listener(&mut self, position: Vec3, forward: Vec3) {
        let side = forward.cross(Vec3::Y).normalize_or_zero() * (EAR_SPACING * 0.5);
        let left = (position - side).to_array();
        let right = (position + side).to_array();
        self.ears = (left, right);
        for voice in &self.voices {
            if let Voice::Spatial(sink) = voice {
                sink.set_left_ear_position(left);
                sink.set_right_ear_position(right);
            }
        }
    }

    fn update(&mut self) {
        self.voices.retain(|voice| !voice.finished());

        let Some(sink) = &self.music_sink else { return };
        let Some(path) = self.music.requeue(sink.empty()) else { return };
        match open_track(path) {
            Ok(source) => sink.append(source),
            Err(err) => {
                log::warn!("[audio] {err:#}; stopping background music");
                self.stop_music();
            }
        }
    }
}

fn open_track(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Invalid path to music source {}", path.display()))?;
    Decoder::new(BufReader::new(file)).with_context(|| format!("Unsupported music format {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_audio_rejects_unregistered_sounds() {
        let mut audio = NullAudio::default();
        assert!(audio.play_sound("door", SoundPlayback::default()).is_err());
        audio.load_sound("door", Path::new("res/sounds/door.ogg")).expect("register");
        audio.play_sound("door", SoundPlayback { looping: true, position: None }).expect("play");
        let last = audio.recent_commands().last().cloned();
        assert_eq!(
            last,
            Some(AudioCommand::PlaySound {
                name: "door".into(),
                playback: SoundPlayback { looping: true, position: None }
            })
        );
    }

    #[test]
    fn looping_flag_applies_to_the_playing_track() {
        let mut music = MusicState::default();
        music.start(Path::new("music/hall.ogg"), 80.0, false);
        assert_eq!(music.requeue(true), None);

        music.looping = true;
        assert_eq!(music.requeue(false), None);
        assert_eq!(music.requeue(true), Some(Path::new("music/hall.ogg")));

        music.stop();
        assert_eq!(music.requeue(true), None);
    }

    #[test]
    fn null_audio_tracks_music_state() {
        let mut audio = NullAudio::default();
        assert_eq!(audio.music_volume(), 100.0);
        audio.set_music_volume(35.0);
        audio.play_music(Path::new("music/hall.ogg"), 60.0, false).expect("play");
        audio.set_music_looping(true);
        assert_eq!(audio.music_volume(), 60.0);
        assert_eq!(audio.music().requeue(true), Some(Path::new("music/hall.ogg")));
        audio.stop_music();
        assert_eq!(audio.music().track, None);
    }

    #[test]
    fn null_audio_history_is_bounded() {
        let mut audio = NullAudio::new(2);
        audio.stop_music();
        audio.set_music_volume(50.0);
        audio.set_music_looping(false);
        let history: Vec<_> = audio.recent_commands().cloned().collect();
        assert_eq!(history, vec![AudioCommand::MusicVolume(50.0), AudioCommand::MusicLooping(false)]);
    }
}
