use crate::config::{DEFAULT_MASTER_VOLUME, DEFAULT_SFX_VOLUME};
use crate::core::audio::AudioOutput;
use crate::game::judgment::{self, ComboTier};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::Path;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SoundCue {
    // UI
    ButtonClick,
    ButtonHover,
    MenuOpen,
    MenuClose,
    // Game
    NoteHit,
    NoteMiss,
    NotePerfect,
    // Song events
    SongStart,
    SongEnd,
    SongComplete,
    // Combo and streak
    Combo2,
    Combo3,
    Combo5,
    Combo10,
    Combo20,
    StreakBreak,
    // Power-ups
    PowerUp,
    Multiplier,
    PerfectStreak,
    Whammy,
    // Menu enhancements
    MenuHover,
    MenuTransition,
    DifficultyChange,
    ScoreUpdate,
    // Game state
    GamePause,
    GameResume,
    GameOver,
    LevelUp,
    // Ambient loops
    MenuMusic,
    PauseMusic,
}

pub struct CueDefinition {
    pub file: &'static str,
    pub volume: f32,
    pub looped: bool,
}

const fn cue(file: &'static str, volume: f32) -> CueDefinition {
    CueDefinition { file, volume, looped: false }
}

const fn looped_cue(file: &'static str, volume: f32) -> CueDefinition {
    CueDefinition { file, volume, looped: true }
}

impl SoundCue {
    pub const ALL: [SoundCue; 30] = [
        SoundCue::ButtonClick,
        SoundCue::ButtonHover,
        SoundCue::MenuOpen,
        SoundCue::MenuClose,
        SoundCue::NoteHit,
        SoundCue::NoteMiss,
        SoundCue::NotePerfect,
        SoundCue::SongStart,
        SoundCue::SongEnd,
        SoundCue::SongComplete,
        SoundCue::Combo2,
        SoundCue::Combo3,
        SoundCue::Combo5,
        SoundCue::Combo10,
        SoundCue::Combo20,
        SoundCue::StreakBreak,
        SoundCue::PowerUp,
        SoundCue::Multiplier,
        SoundCue::PerfectStreak,
        SoundCue::Whammy,
        SoundCue::MenuHover,
        SoundCue::MenuTransition,
        SoundCue::DifficultyChange,
        SoundCue::ScoreUpdate,
        SoundCue::GamePause,
        SoundCue::GameResume,
        SoundCue::GameOver,
        SoundCue::LevelUp,
        SoundCue::MenuMusic,
        SoundCue::PauseMusic,
    ];

    pub const fn definition(self) -> CueDefinition {
        match self {
            SoundCue::ButtonClick => cue("ui/button-click.ogg", 0.6),
            SoundCue::ButtonHover => cue("ui/button-hover.ogg", 0.4),
            SoundCue::MenuOpen => cue("ui/menu-open.ogg", 0.5),
            SoundCue::MenuClose => cue("ui/menu-close.ogg", 0.5),
            SoundCue::NoteHit => cue("game/note-hit.ogg", 0.8),
            SoundCue::NoteMiss => cue("game/note-miss.ogg", 0.6),
            SoundCue::NotePerfect => cue("game/note-perfect.ogg", 0.9),
            SoundCue::SongStart => cue("events/song-start.ogg", 0.7),
            SoundCue::SongEnd => cue("events/song-end.ogg", 0.7),
            SoundCue::SongComplete => cue("events/song-complete.ogg", 0.8),
            SoundCue::Combo2 => cue("game/combo-2.ogg", 0.6),
            SoundCue::Combo3 => cue("game/combo-3.ogg", 0.7),
            SoundCue::Combo5 => cue("game/combo-5.ogg", 0.8),
            SoundCue::Combo10 => cue("game/combo-10.ogg", 0.9),
            SoundCue::Combo20 => cue("game/combo-20.ogg", 1.0),
            SoundCue::StreakBreak => cue("game/streak-break.ogg", 0.5),
            SoundCue::PowerUp => cue("game/power-up.ogg", 0.8),
            SoundCue::Multiplier => cue("game/multiplier.ogg", 0.7),
            SoundCue::PerfectStreak => cue("game/perfect-streak.ogg", 0.9),
            SoundCue::Whammy => cue("game/whammy.ogg", 0.6),
            SoundCue::MenuHover => cue("ui/menu-hover.ogg", 0.3),
            SoundCue::MenuTransition => cue("ui/menu-transition.ogg", 0.4),
            SoundCue::DifficultyChange => cue("ui/difficulty-change.ogg", 0.5),
            SoundCue::ScoreUpdate => cue("ui/score-update.ogg", 0.3),
            SoundCue::GamePause => cue("events/game-pause.ogg", 0.6),
            SoundCue::GameResume => cue("events/game-resume.ogg", 0.6),
            SoundCue::GameOver => cue("events/game-over.ogg", 0.8),
            SoundCue::LevelUp => cue("events/level-up.ogg", 0.9),
            SoundCue::MenuMusic => looped_cue("music/menu-ambient.ogg", 0.3),
            SoundCue::PauseMusic => looped_cue("music/pause-ambient.ogg", 0.2),
        }
    }

    /// Stable key used to address the cue inside the audio backend.
    pub fn key(self) -> &'static str {
        self.definition().file
    }
}

/// The cue played when the combo reaches `combo`, if any.
pub fn combo_cue(combo: u32) -> Option<SoundCue> {
    judgment::combo_tier(combo).map(|tier| match tier {
        ComboTier::Two => SoundCue::Combo2,
        ComboTier::Three => SoundCue::Combo3,
        ComboTier::Five => SoundCue::Combo5,
        ComboTier::Ten => SoundCue::Combo10,
        ComboTier::Twenty => SoundCue::Combo20,
    })
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Slot {
    Loaded,
    Silent,
}

pub struct SfxBank {
    slots: HashMap<SoundCue, Slot>,
    volume: f32,
    master_volume: f32,
    enabled: bool,
}

impl SfxBank {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            volume: DEFAULT_SFX_VOLUME,
            master_volume: DEFAULT_MASTER_VOLUME,
            enabled: true,
        }
    }

    /// Loads every cue from `dir`. A cue that fails gets a silent placeholder. Returns the
    /// number of cues that loaded.
    pub fn load_all(&mut self, dir: &Path, audio: &mut dyn AudioOutput) -> usize {
        let mut loaded = 0;
        for cue in SoundCue::ALL {
            let path = dir.join(cue.definition().file);
            let slot = match audio.load_sfx(cue.key(), &path) {
                Ok(()) => {
                    loaded += 1;
                    Slot::Loaded
                }
                Err(e) => {
                    warn!("Failed to load sound {:?} from {:?}: {}", cue, path, e);
                    Slot::Silent
                }
            };
            self.slots.insert(cue, slot);
        }
        if loaded == SoundCue::ALL.len() {
            info!("All {} sound effects loaded.", loaded);
        } else {
            warn!(
                "Loaded {}/{} sound effects; the rest are silent.",
                loaded,
                SoundCue::ALL.len()
            );
        }
        loaded
    }

    pub fn is_loaded(&self, cue: SoundCue) -> bool {
        self.slots.get(&cue) == Some(&Slot::Loaded)
    }

    pub fn effective_volume(&self, cue: SoundCue, volume_override: Option<f32>) -> f32 {
        match volume_override {
            Some(v) => v * self.master_volume,
            None => cue.definition().volume * self.volume * self.master_volume,
        }
    }

    pub fn play(&self, cue: SoundCue, volume_override: Option<f32>, audio: &mut dyn AudioOutput) {
        if !self.enabled {
            return;
        }
        match self.slots.get(&cue) {
            Some(Slot::Loaded) => {
                let volume = self.effective_volume(cue, volume_override);
                audio.play_sfx(cue.key(), volume, cue.definition().looped);
            }
            Some(Slot::Silent) => debug!("Sound {:?} is a silent placeholder.", cue),
            None => {}
        }
    }

    #[allow(dead_code)]
    pub fn stop(&self, cue: SoundCue, audio: &mut dyn AudioOutput) {
        if self.is_loaded(cue) {
            audio.stop_sfx(cue.key());
        }
    }

    pub fn stop_all(&self, audio: &mut dyn AudioOutput) {
        for (cue, slot) in &self.slots {
            if *slot == Slot::Loaded {
                audio.stop_sfx(cue.key());
            }
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
    }

    pub fn set_enabled(&mut self, enabled: bool, audio: &mut dyn AudioOutput) {
        self.enabled = enabled;
        if !enabled {
            self.stop_all(audio);
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    #[allow(dead_code)]
    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    #[allow(dead_code)]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for SfxBank {
    fn default() -> Self {
        Self::new()
    }
}
