use crate::config::BEAT_INDICATOR_DURATION;
use crate::game::events::GameEvent;
use crate::game::state::Difficulty;
use std::time::Instant;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MenuMode {
    /// Nothing started yet: the menu offers Start.
    Start,
    /// A run exists: the menu offers Resume and Restart.
    ResumeOrRestart,
}

/// What the player would see on screen, folded from session events.
#[derive(Clone, Debug)]
pub struct UiState {
    pub score: u64,
    pub combo: u32,
    pub start_label: &'static str,
    pub start_disabled: bool,
    pub pause_enabled: bool,
    pub pause_menu_visible: bool,
    pub end_screen_visible: bool,
    pub final_score: u64,
    pub menu_mode: MenuMode,
    pub difficulty: Difficulty,
    pub song: Option<(usize, String)>,
    pub volume_percent: u32,
    pub debug: bool,
    pub beat_lit_until: Option<Instant>,
    pub alert: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            score: 0,
            combo: 0,
            start_label: "Start",
            start_disabled: false,
            pause_enabled: false,
            pause_menu_visible: false,
            end_screen_visible: false,
            final_score: 0,
            menu_mode: MenuMode::Start,
            difficulty: Difficulty::default(),
            song: None,
            volume_percent: 50,
            debug: false,
            beat_lit_until: None,
            alert: None,
        }
    }
}

impl UiState {
    pub fn apply(&mut self, event: &GameEvent, now: Instant) {
        match event {
            GameEvent::Sfx(_) => {}
            GameEvent::ScoreChanged(score) => self.score = *score,
            GameEvent::ComboChanged(combo) => self.combo = *combo,
            GameEvent::BeatPulse => self.beat_lit_until = Some(now + BEAT_INDICATOR_DURATION),
            GameEvent::PauseMenu { visible } => self.pause_menu_visible = *visible,
            GameEvent::EndScreen { visible, final_score } => {
                self.end_screen_visible = *visible;
                self.final_score = *final_score;
            }
            GameEvent::StartButton { label, disabled } => {
                self.start_label = *label;
                self.start_disabled = *disabled;
            }
            GameEvent::PlayState { is_playing, has_played } => {
                self.pause_enabled = *is_playing;
                self.menu_mode = if *has_played {
                    MenuMode::ResumeOrRestart
                } else {
                    MenuMode::Start
                };
            }
            GameEvent::DifficultyChanged(difficulty) => self.difficulty = *difficulty,
            GameEvent::SongSelected { index, display_name } => {
                self.song = Some((*index, display_name.clone()));
            }
            GameEvent::VolumeChanged(volume) => {
                self.volume_percent = (volume.clamp(0.0, 1.0) * 100.0).round() as u32;
            }
            GameEvent::DebugToggled(on) => self.debug = *on,
            GameEvent::Alert(message) => self.alert = Some(message.clone()),
        }
    }

    pub fn apply_all<'a>(&mut self, events: impl IntoIterator<Item = &'a GameEvent>, now: Instant) {
        for event in events {
            self.apply(event, now);
        }
    }

    pub fn beat_lit(&self, now: Instant) -> bool {
        self.beat_lit_until.is_some_and(|until| now < until)
    }

    pub fn volume_label(&self) -> String {
        format!("{}%", self.volume_percent)
    }

    pub fn debug_label(&self) -> &'static str {
        if self.debug { "Debug ON" } else { "Debug" }
    }

    pub fn clear_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    /// One-line HUD, shown in the window title.
    pub fn hud_line(&self, now: Instant) -> String {
        let song = self.song.as_ref().map_or("-", |(_, name)| name.as_str());
        let mut line = format!(
            "Score: {} | Combo: {} | {} | {} | Vol {}",
            self.score,
            self.combo,
            song,
            self.difficulty,
            self.volume_label()
        );
        if self.beat_lit(now) {
            line.push_str(" | *");
        }
        if self.end_screen_visible {
            line.push_str(&format!(" | Song over! Final score {} [Enter] again [N] new song", self.final_score));
        } else if self.pause_menu_visible {
            match self.menu_mode {
                MenuMode::Start => line.push_str(&format!(" | [{}]", self.start_label)),
                MenuMode::ResumeOrRestart => line.push_str(" | Paused [Esc] resume [R] restart"),
            }
        }
        if self.debug {
            line.push_str(&format!(" | {}", self.debug_label()));
        }
        line
    }
}
