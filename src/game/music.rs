use crate::config::{DEFAULT_MUSIC_VOLUME, MUSIC_LOAD_TIMEOUT};
use crate::core::audio::AudioOutput;
use crate::game::beat::BeatDetector;
use crate::game::song::Song;
use log::{error, info};
use rand::Rng;
use std::path::Path;
use std::time::{Duration, Instant};

/// Background-music state. Playback itself lives in the audio backend; this tracks what
/// the game needs to know about it, and keeps a play clock so a song can end even on a
/// backend that cannot report it.
pub struct MusicPlayer {
    current_song: Option<Song>,
    is_loaded: bool,
    is_playing: bool,
    volume: f32,
    length: Duration,
    played_before: Duration,
    playing_since: Option<Instant>,
    beat: BeatDetector,
}

impl MusicPlayer {
    pub fn new(volume: f32) -> Self {
        Self {
            current_song: None,
            is_loaded: false,
            is_playing: false,
            volume: volume.clamp(0.0, 1.0),
            length: Duration::ZERO,
            played_before: Duration::ZERO,
            playing_since: None,
            beat: BeatDetector::new(120.0),
        }
    }

    /// Loads `song` from `audio_dir`. Failures are logged and leave the player unloaded.
    pub fn load(&mut self, song: &Song, audio_dir: &Path, audio: &mut dyn AudioOutput) -> bool {
        audio.stop_music();
        self.current_song = Some(song.clone());
        self.beat.set_bpm(song.bpm);
        self.beat.reset();
        self.is_loaded = false;
        self.is_playing = false;
        self.played_before = Duration::ZERO;
        self.playing_since = None;

        let path = song.resolve_path(audio_dir);
        match audio.load_music(&path, MUSIC_LOAD_TIMEOUT) {
            Ok(length) if length.is_zero() => {
                error!("Music file {:?} has no audio.", path);
                false
            }
            Ok(length) => {
                self.length = length;
                self.is_loaded = true;
                audio.set_music_volume(self.volume);
                info!("Loaded: {} ({} BPM, {:.1}s)", song.display_name, song.bpm, length.as_secs_f32());
                true
            }
            Err(e) => {
                error!("Failed to load music: {}", song.name);
                error!("Attempted path: {:?} ({})", path, e);
                false
            }
        }
    }

    fn mark_playing(&mut self, now: Instant) {
        self.is_playing = true;
        self.playing_since = Some(now);
    }

    fn mark_stopped(&mut self, now: Instant) {
        if let Some(since) = self.playing_since.take() {
            self.played_before += now.saturating_duration_since(since);
        }
        self.is_playing = false;
    }

    pub fn play(&mut self, now: Instant, audio: &mut dyn AudioOutput) {
        if !self.is_loaded || self.is_playing {
            return;
        }
        audio.play_music(false);
        self.mark_playing(now);
    }

    pub fn pause(&mut self, now: Instant, audio: &mut dyn AudioOutput) {
        if !self.is_loaded || !self.is_playing {
            return;
        }
        audio.pause_music();
        self.mark_stopped(now);
    }

    pub fn resume(&mut self, now: Instant, audio: &mut dyn AudioOutput) {
        self.play(now, audio);
    }

    pub fn restart(&mut self, now: Instant, audio: &mut dyn AudioOutput) {
        if !self.is_loaded {
            return;
        }
        audio.play_music(true);
        self.played_before = Duration::ZERO;
        self.beat.reset();
        self.mark_playing(now);
    }

    pub fn stop(&mut self, now: Instant, audio: &mut dyn AudioOutput) {
        self.pause(now, audio);
        audio.stop_music();
        self.played_before = Duration::ZERO;
    }

    pub fn set_volume(&mut self, volume: f32, audio: &mut dyn AudioOutput) {
        self.volume = volume.clamp(0.0, 1.0);
        audio.set_music_volume(self.volume);
    }

    pub fn position(&self, now: Instant) -> Duration {
        let running = self
            .playing_since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or_default();
        self.played_before + running
    }

    pub fn has_ended(&self, now: Instant, audio: &dyn AudioOutput) -> bool {
        if !self.is_loaded {
            return false;
        }
        audio.music_finished() || (self.is_playing && self.position(now) >= self.length)
    }

    /// Beat pulse for spawning. Never fires while the music is stopped.
    pub fn detect_beat<R: Rng>(&mut self, now: Instant, rng: &mut R) -> bool {
        if !self.is_loaded || !self.is_playing {
            return false;
        }
        self.beat.detect(now, rng)
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.current_song.as_ref()
    }

    pub fn current_bpm(&self) -> f32 {
        self.beat.bpm()
    }
}

impl Default for MusicPlayer {
    fn default() -> Self {
        Self::new(DEFAULT_MUSIC_VOLUME)
    }
}
