use crate::game::sfx::SoundCue;
use crate::game::state::Difficulty;

/// Everything the session tells the outside world about. The UI state folds these in.
/// `Sfx` cues are queued first and played when the session flushes at the end of a
/// dispatch or frame.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Sfx(SoundCue),
    ScoreChanged(u64),
    ComboChanged(u32),
    BeatPulse,
    PauseMenu { visible: bool },
    EndScreen { visible: bool, final_score: u64 },
    StartButton { label: &'static str, disabled: bool },
    PlayState { is_playing: bool, has_played: bool },
    DifficultyChanged(Difficulty),
    SongSelected { index: usize, display_name: String },
    VolumeChanged(f32),
    DebugToggled(bool),
    Alert(String),
}
