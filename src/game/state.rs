use crate::config::LANE_COUNT;
use crate::game::note::Lane;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DifficultySettings {
    pub scroll_speed: f32,
    pub note_spawn_chance: f32,
    pub notes_per_beat: usize,
    pub chord_chance: f32,
    pub rapid_chance: f32,
    pub beat_spawn_chance: f32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    #[allow(dead_code)]
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub const fn settings(self) -> DifficultySettings {
        match self {
            Difficulty::Easy => DifficultySettings {
                scroll_speed: 0.05,
                note_spawn_chance: 0.1,
                notes_per_beat: 1,
                chord_chance: 0.0,
                rapid_chance: 0.0,
                beat_spawn_chance: 0.4,
            },
            Difficulty::Medium => DifficultySettings {
                scroll_speed: 0.08,
                note_spawn_chance: 0.15,
                notes_per_beat: 2,
                chord_chance: 0.1,
                rapid_chance: 0.05,
                beat_spawn_chance: 0.6,
            },
            Difficulty::Hard => DifficultySettings {
                scroll_speed: 0.12,
                note_spawn_chance: 0.2,
                notes_per_beat: 3,
                chord_chance: 0.2,
                rapid_chance: 0.1,
                beat_spawn_chance: 0.8,
            },
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("Unknown difficulty '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GameState {
    pub score: u64,
    pub is_playing: bool,
    pub debug_mode: bool,
    pub difficulty: Difficulty,
    pub game_start_time: Option<Instant>,
    pub active_keys: [bool; LANE_COUNT],
}

impl GameState {
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            score: 0,
            is_playing: false,
            debug_mode: false,
            difficulty,
            game_start_time: None,
            active_keys: [false; LANE_COUNT],
        }
    }

    /// Clears the per-run values. Difficulty and debug mode survive a reset.
    pub fn reset(&mut self) {
        self.score = 0;
        self.is_playing = false;
        self.game_start_time = None;
        self.active_keys = [false; LANE_COUNT];
    }

    /// Starts (or resumes) play. The buffer clock restarts on every call.
    pub fn start(&mut self, now: Instant) {
        self.is_playing = true;
        self.game_start_time = Some(now);
    }

    pub fn pause(&mut self) {
        self.is_playing = false;
    }

    pub fn add_score(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
    }

    pub fn settings(&self) -> DifficultySettings {
        self.difficulty.settings()
    }

    pub fn has_played(&self) -> bool {
        self.game_start_time.is_some()
    }

    pub fn is_buffer_time_passed(&self, buffer: Duration, now: Instant) -> bool {
        match self.game_start_time {
            Some(start) => now.saturating_duration_since(start) >= buffer,
            None => false,
        }
    }

    pub fn toggle_debug(&mut self) -> bool {
        self.debug_mode = !self.debug_mode;
        self.debug_mode
    }

    #[inline(always)]
    pub fn is_key_active(&self, lane: Lane) -> bool {
        self.active_keys[lane.index()]
    }

    pub fn set_key_active(&mut self, lane: Lane, active: bool) {
        self.active_keys[lane.index()] = active;
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(Difficulty::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert_eq!(" easy ".parse::<Difficulty>(), Ok(Difficulty::Easy));
        assert!("expert".parse::<Difficulty>().is_err());
    }

    #[test]
    fn harder_settings_scroll_faster() {
        let speeds: Vec<f32> = Difficulty::ALL.iter().map(|d| d.settings().scroll_speed).collect();
        assert!(speeds.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(Difficulty::Easy.settings().notes_per_beat, 1);
    }

    #[test]
    fn reset_keeps_difficulty_and_debug() {
        let now = Instant::now();
        let mut state = GameState::new(Difficulty::Hard);
        state.toggle_debug();
        state.start(now);
        state.add_score(120);
        state.set_key_active(Lane::D, true);
        state.reset();
        assert_eq!(state.score, 0);
        assert!(!state.is_playing);
        assert!(!state.has_played());
        assert!(!state.is_key_active(Lane::D));
        assert_eq!(state.difficulty, Difficulty::Hard);
        assert!(state.debug_mode);
    }

    #[test]
    fn buffer_time_measures_from_start() {
        let now = Instant::now();
        let mut state = GameState::default();
        assert!(!state.is_buffer_time_passed(Duration::from_secs(3), now));
        state.start(now);
        assert!(!state.is_buffer_time_passed(Duration::from_secs(3), now + Duration::from_millis(2999)));
        assert!(state.is_buffer_time_passed(Duration::from_secs(3), now + Duration::from_secs(3)));
    }
}
