use crate::config::{
    GAME_START_BUFFER, MAX_DELTA_TIME, REFERENCE_FPS, STATUS_LOG_INTERVAL, VOLUME_STEP,
};
use crate::core::audio::AudioOutput;
use crate::core::input::MenuKey;
use crate::game::effects::Effects;
use crate::game::events::GameEvent;
use crate::game::judgment::Stats;
use crate::game::music::MusicPlayer;
use crate::game::note::Lane;
use crate::game::notefield::{FieldContext, NoteField};
use crate::game::profile::Profile;
use crate::game::sfx::{SfxBank, SoundCue};
use crate::game::song::SongCatalog;
use crate::game::spawner::Spawner;
use crate::game::state::{Difficulty, GameState};
use log::{debug, info, warn};
use rand::Rng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::time::Instant;

const MUSIC_UNAVAILABLE_ALERT: &str =
    "Music is not available. Please check that the audio file exists and restart the game.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    StartGame,
    PauseGame,
    ResumeGame,
    RestartGame,
    PlayAgain,
    ShowSongSelection,
    SelectSong(usize),
    ChangeDifficulty(Difficulty),
    ChangeVolume(f32),
    ToggleDebug,
    KeyDown(Lane),
    KeyUp(Lane),
}

/// Runs one game: owns every manager and applies commands and frame ticks to them.
/// Observers learn what happened through `drain_events`.
pub struct Session<A: AudioOutput> {
    audio: A,
    state: GameState,
    stats: Stats,
    field: NoteField,
    spawner: Spawner,
    music: MusicPlayer,
    sfx: SfxBank,
    effects: Effects,
    catalog: SongCatalog,
    selected_song: Option<usize>,
    audio_dir: PathBuf,
    rng: StdRng,
    events: Vec<GameEvent>,
    cues_played: usize,
    pause_menu_visible: bool,
    end_screen_visible: bool,
    last_update: Option<Instant>,
    status_timer: f32,
}

impl<A: AudioOutput> Session<A> {
    pub fn new(mut audio: A, profile: &Profile, catalog: SongCatalog, rng: StdRng) -> Self {
        let mut sfx = SfxBank::new();
        sfx.set_volume(profile.sfx_volume);
        sfx.set_master_volume(profile.master_volume);
        sfx.load_all(&profile.sfx_dir, &mut audio);
        sfx.set_enabled(profile.sfx_enabled, &mut audio);

        let mut state = GameState::new(profile.difficulty);
        state.debug_mode = profile.debug;

        Self {
            audio,
            state,
            stats: Stats::default(),
            field: NoteField::new(),
            spawner: Spawner::new(),
            music: MusicPlayer::new(profile.music_volume),
            sfx,
            effects: Effects::new(),
            catalog,
            selected_song: None,
            audio_dir: profile.audio_dir.clone(),
            rng,
            events: Vec::new(),
            cues_played: 0,
            pause_menu_visible: false,
            end_screen_visible: false,
            last_update: None,
            status_timer: 0.0,
        }
    }

    /// Loads the first song and opens the menu.
    pub fn init(&mut self) {
        info!("Session initialized with {} songs.", self.catalog.len());
        for song in self.catalog.songs() {
            debug!("Song: {} ({}, {} BPM)", song.display_name, song.name, song.bpm);
        }
        self.emit(GameEvent::DifficultyChanged(self.state.difficulty));
        self.emit(GameEvent::VolumeChanged(self.music.volume()));
        self.emit(GameEvent::DebugToggled(self.state.debug_mode));
        self.emit(GameEvent::ScoreChanged(self.state.score));
        if self.catalog.is_empty() {
            warn!("No songs available.");
            self.update_start_button("Music Unavailable", true);
        } else if self.load_song(0) {
            self.update_start_button("Start", false);
        } else {
            self.update_start_button("Music Unavailable", true);
        }
        self.show_pause_menu();
        self.flush_cues();
    }

    // --- Event plumbing ---

    fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    fn cue(&mut self, cue: SoundCue) {
        self.emit(GameEvent::Sfx(cue));
    }

    /// Plays every cue queued since the last flush.
    fn flush_cues(&mut self) {
        for event in &self.events[self.cues_played..] {
            if let GameEvent::Sfx(cue) = event {
                self.sfx.play(*cue, None, &mut self.audio);
            }
        }
        self.cues_played = self.events.len();
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.flush_cues();
        self.cues_played = 0;
        std::mem::take(&mut self.events)
    }

    fn field_ctx(&mut self) -> (&mut NoteField, FieldContext<'_>) {
        (
            &mut self.field,
            FieldContext {
                state: &mut self.state,
                stats: &mut self.stats,
                effects: &mut self.effects,
                rng: &mut self.rng,
                events: &mut self.events,
            },
        )
    }

    // --- UI helpers ---

    fn update_start_button(&mut self, label: &'static str, disabled: bool) {
        self.emit(GameEvent::StartButton { label, disabled });
        self.emit(GameEvent::PlayState {
            is_playing: self.state.is_playing,
            has_played: self.state.has_played(),
        });
    }

    fn show_pause_menu(&mut self) {
        self.cue(SoundCue::MenuOpen);
        self.pause_menu_visible = true;
        self.emit(GameEvent::PlayState {
            is_playing: self.state.is_playing,
            has_played: self.state.has_played(),
        });
        self.emit(GameEvent::PauseMenu { visible: true });
    }

    fn hide_pause_menu(&mut self) {
        self.cue(SoundCue::MenuClose);
        self.pause_menu_visible = false;
        self.emit(GameEvent::PauseMenu { visible: false });
    }

    fn show_end_screen(&mut self) {
        self.cue(SoundCue::SongComplete);
        self.end_screen_visible = true;
        self.emit(GameEvent::EndScreen { visible: true, final_score: self.state.score });
    }

    fn hide_end_screen(&mut self) {
        self.cue(SoundCue::MenuClose);
        self.end_screen_visible = false;
        self.emit(GameEvent::EndScreen { visible: false, final_score: self.state.score });
    }

    // --- Commands ---

    pub fn dispatch(&mut self, command: Command, now: Instant) {
        debug!("Command: {:?}", command);
        match command {
            Command::StartGame => self.start_game(now),
            Command::PauseGame => self.pause_game(now),
            Command::ResumeGame => self.resume_game(now),
            Command::RestartGame => {
                self.cue(SoundCue::ButtonClick);
                self.restart_game(now);
            }
            Command::PlayAgain => {
                self.cue(SoundCue::ButtonClick);
                self.restart_game(now);
            }
            Command::ShowSongSelection => self.show_song_selection(now),
            Command::SelectSong(index) => self.select_song(index),
            Command::ChangeDifficulty(difficulty) => self.change_difficulty(difficulty),
            Command::ChangeVolume(volume) => self.change_volume(volume),
            Command::ToggleDebug => self.toggle_debug(),
            Command::KeyDown(lane) => self.handle_key_down(lane, now),
            Command::KeyUp(lane) => self.handle_key_up(lane),
        }
        self.flush_cues();
    }

    fn start_game(&mut self, now: Instant) {
        if self.state.is_playing {
            return;
        }
        self.cue(SoundCue::ButtonClick);
        if !self.music.is_loaded() {
            warn!("Start refused: no music loaded.");
            self.emit(GameEvent::Alert(MUSIC_UNAVAILABLE_ALERT.to_string()));
            return;
        }
        self.begin_run(now);
    }

    fn restart_game(&mut self, now: Instant) {
        if self.end_screen_visible {
            self.hide_end_screen();
        }
        if self.pause_menu_visible {
            self.hide_pause_menu();
        }
        self.begin_run(now);
    }

    fn begin_run(&mut self, now: Instant) {
        self.state.reset();
        self.state.start(now);
        self.stats.reset();
        self.field.clear_all();
        self.spawner.clear();
        self.effects.clear_particles();
        self.emit(GameEvent::ScoreChanged(self.state.score));
        self.emit(GameEvent::ComboChanged(0));

        self.music.restart(now, &mut self.audio);
        if self.pause_menu_visible {
            self.hide_pause_menu();
        }
        self.update_start_button("Game Running", true);
        self.cue(SoundCue::SongStart);
        self.last_update = Some(now);
        info!(
            "Game started: {} ({} BPM) on {} (speed {}).",
            self.music.current_song().map_or("<none>", |s| s.display_name.as_str()),
            self.music.current_bpm(),
            self.state.difficulty,
            self.state.settings().scroll_speed
        );
    }

    fn pause_game(&mut self, now: Instant) {
        if !self.state.is_playing {
            return;
        }
        self.cue(SoundCue::ButtonClick);
        self.state.pause();
        self.music.pause(now, &mut self.audio);
        self.cue(SoundCue::GamePause);
        self.show_pause_menu();
        info!("Game paused at score {}.", self.state.score);
    }

    fn resume_game(&mut self, now: Instant) {
        if self.state.is_playing || !self.state.has_played() || self.end_screen_visible {
            return;
        }
        self.cue(SoundCue::ButtonClick);
        self.hide_pause_menu();
        self.state.start(now);
        self.music.resume(now, &mut self.audio);
        self.cue(SoundCue::GameResume);
        self.update_start_button("Game Running", true);
        self.last_update = Some(now);
    }

    fn show_song_selection(&mut self, now: Instant) {
        self.cue(SoundCue::ButtonClick);
        if self.end_screen_visible {
            self.hide_end_screen();
        }
        self.music.stop(now, &mut self.audio);
        self.state.reset();
        self.field.clear_all();
        self.spawner.clear();
        self.show_pause_menu();
        self.emit(GameEvent::ScoreChanged(self.state.score));
        self.update_start_button("Start", !self.music.is_loaded());
    }

    fn load_song(&mut self, index: usize) -> bool {
        let Some(song) = self.catalog.get(index).cloned() else {
            warn!("No song at index {}.", index);
            return false;
        };
        self.selected_song = Some(index);
        let loaded = self.music.load(&song, &self.audio_dir, &mut self.audio);
        self.emit(GameEvent::SongSelected { index, display_name: song.display_name });
        loaded
    }

    fn select_song(&mut self, index: usize) {
        if self.state.is_playing {
            warn!("Ignoring song change while playing.");
            return;
        }
        if index >= self.catalog.len() {
            warn!("No song at index {}.", index);
            return;
        }
        let loaded = self.load_song(index);
        self.cue(SoundCue::ButtonClick);
        if loaded {
            self.update_start_button("Start", false);
        } else {
            self.update_start_button("Music Unavailable", true);
        }
    }

    fn change_difficulty(&mut self, difficulty: Difficulty) {
        self.cue(SoundCue::ButtonClick);
        self.state.set_difficulty(difficulty);
        self.cue(SoundCue::DifficultyChange);
        self.emit(GameEvent::DifficultyChanged(difficulty));
        info!(
            "Difficulty set to: {} (Speed: {})",
            difficulty,
            difficulty.settings().scroll_speed
        );
    }

    fn change_volume(&mut self, volume: f32) {
        self.music.set_volume(volume, &mut self.audio);
        self.emit(GameEvent::VolumeChanged(self.music.volume()));
    }

    fn toggle_debug(&mut self) {
        self.cue(SoundCue::ButtonClick);
        let enabled = self.state.toggle_debug();
        info!("Debug mode {}.", if enabled { "on" } else { "off" });
        self.emit(GameEvent::DebugToggled(enabled));
    }

    fn handle_key_down(&mut self, lane: Lane, now: Instant) {
        self.state.set_key_active(lane, true);
        self.effects.set_hit_marker(lane, true);
        if self.state.is_playing {
            let (field, mut ctx) = self.field_ctx();
            let landed = field.handle_key_press(lane, now, &mut ctx);
            if self.state.debug_mode && !landed {
                debug!("Press on lane {} found no note.", lane);
            }
        }
    }

    fn handle_key_up(&mut self, lane: Lane) {
        self.state.set_key_active(lane, false);
        self.effects.set_hit_marker(lane, false);
    }

    /// Resolves a menu key against where the game currently is.
    pub fn menu_command(&self, key: MenuKey) -> Option<Command> {
        let playing = self.state.is_playing;
        let paused = self.state.has_played() && !playing;
        match key {
            MenuKey::Confirm if self.end_screen_visible => Some(Command::PlayAgain),
            MenuKey::Confirm if paused => Some(Command::ResumeGame),
            MenuKey::Confirm if !playing => Some(Command::StartGame),
            MenuKey::Back if playing => Some(Command::PauseGame),
            MenuKey::Back if paused && !self.end_screen_visible => Some(Command::ResumeGame),
            MenuKey::Restart if !playing => Some(Command::RestartGame),
            MenuKey::NewSong if !playing => Some(Command::ShowSongSelection),
            MenuKey::Difficulty(d) => Some(Command::ChangeDifficulty(d)),
            MenuKey::PrevSong | MenuKey::NextSong if !playing && !self.catalog.is_empty() => {
                let len = self.catalog.len();
                let current = self.selected_song.unwrap_or(0);
                let next = if key == MenuKey::NextSong {
                    (current + 1) % len
                } else {
                    (current + len - 1) % len
                };
                Some(Command::SelectSong(next))
            }
            MenuKey::ToggleDebug => Some(Command::ToggleDebug),
            MenuKey::VolumeUp => Some(Command::ChangeVolume(self.music.volume() + VOLUME_STEP)),
            MenuKey::VolumeDown => Some(Command::ChangeVolume(self.music.volume() - VOLUME_STEP)),
            _ => None,
        }
    }

    // --- Frame tick ---

    /// Advances one frame. Does nothing beyond clock bookkeeping unless a run is active.
    pub fn update(&mut self, now: Instant) {
        let dt = match self.last_update {
            Some(last) => now.saturating_duration_since(last).as_secs_f32(),
            None => 1.0 / REFERENCE_FPS,
        };
        self.last_update = Some(now);
        if !self.state.is_playing {
            return;
        }
        let frame_scale = dt.min(MAX_DELTA_TIME) * REFERENCE_FPS;
        let scroll_speed = self.state.settings().scroll_speed;

        {
            let (field, mut ctx) = self.field_ctx();
            field.update_notes(scroll_speed, frame_scale, now, &mut ctx);
        }
        self.effects.update_frets(scroll_speed, frame_scale);
        self.detect_beats_and_spawn(now);
        self.spawner.release_due(now, &mut self.field);
        self.effects.update_particles(frame_scale, &mut self.rng);
        {
            let (field, mut ctx) = self.field_ctx();
            field.handle_long_notes(&mut ctx);
        }
        self.check_song_end(now);
        self.log_status(dt);
        self.flush_cues();
    }

    fn detect_beats_and_spawn(&mut self, now: Instant) {
        if !self.music.is_loaded() || !self.music.is_playing() {
            return;
        }
        if !self.state.is_buffer_time_passed(GAME_START_BUFFER, now) {
            return;
        }
        let settings = self.state.settings();
        if self.music.detect_beat(now, &mut self.rng) {
            if self.rng.random::<f32>() < settings.beat_spawn_chance {
                self.spawner
                    .spawn_notes_on_beat(&settings, now, &mut self.rng, &mut self.field);
            }
            self.emit(GameEvent::BeatPulse);
        }
        self.spawner
            .spawn_random_note(&settings, &mut self.rng, &mut self.field);
    }

    fn check_song_end(&mut self, now: Instant) {
        if !self.state.is_playing || !self.music.has_ended(now, &self.audio) {
            return;
        }
        info!(
            "Song has ended. Score {}, max combo {}, accuracy {:.1}%.",
            self.state.score,
            self.stats.max_combo,
            self.stats.accuracy() * 100.0
        );
        self.cue(SoundCue::SongEnd);
        self.state.pause();
        self.music.stop(now, &mut self.audio);
        self.update_start_button("Song Over", true);
        self.show_end_screen();
    }

    fn log_status(&mut self, dt: f32) {
        self.status_timer += dt;
        if self.status_timer < STATUS_LOG_INTERVAL {
            return;
        }
        self.status_timer = 0.0;
        info!(
            "Score: {} | Combo: {} (max {}) | Notes: {} (+{} queued) | Perfect: {} | Misses: {}",
            self.state.score,
            self.stats.combo,
            self.stats.max_combo,
            self.field.len(),
            self.spawner.pending().len(),
            self.stats.perfect_hits,
            self.stats.misses
        );
    }

    // --- Accessors ---

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn field(&self) -> &NoteField {
        &self.field
    }

    pub fn effects(&self) -> &Effects {
        &self.effects
    }

    pub fn music(&self) -> &MusicPlayer {
        &self.music
    }

    #[cfg(test)]
    pub fn selected_song(&self) -> Option<usize> {
        self.selected_song
    }

    #[cfg(test)]
    pub fn audio(&self) -> &A {
        &self.audio
    }

    #[cfg(test)]
    pub fn end_screen_visible(&self) -> bool {
        self.end_screen_visible
    }

    #[cfg(test)]
    pub fn pause_menu_visible(&self) -> bool {
        self.pause_menu_visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HIT_POSITION, HIT_SCORE};
    use crate::core::audio::testing::{AudioCall, RecordingAudio};
    use crate::game::song::builtin_songs;
    use rand::SeedableRng;
    use std::time::Duration;

    fn session_with(audio: RecordingAudio) -> Session<RecordingAudio> {
        let catalog = SongCatalog::new(builtin_songs(), Vec::new());
        let mut session = Session::new(audio, &Profile::default(), catalog, StdRng::seed_from_u64(17));
        session.init();
        session.drain_events();
        session
    }

    fn session() -> Session<RecordingAudio> {
        session_with(RecordingAudio::default())
    }

    fn cues(events: &[GameEvent]) -> Vec<SoundCue> {
        events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Sfx(cue) => Some(*cue),
                _ => None,
            })
            .collect()
    }

    fn place_note(session: &mut Session<RecordingAudio>, lane: Lane, z: f32) {
        let id = session.field.create_note(lane, false);
        if let Some(note) = session.field.note_mut(id) {
            note.position.z = z;
        }
    }

    #[test]
    fn init_loads_the_first_song_and_shows_the_menu() {
        let catalog = SongCatalog::new(builtin_songs(), Vec::new());
        let mut session =
            Session::new(RecordingAudio::default(), &Profile::default(), catalog, StdRng::seed_from_u64(1));
        session.init();
        let events = session.drain_events();
        assert!(session.music().is_loaded());
        assert_eq!(session.selected_song(), Some(0));
        assert!(events.contains(&GameEvent::PauseMenu { visible: true }));
        assert!(events.contains(&GameEvent::StartButton { label: "Start", disabled: false }));
        assert_eq!(cues(&events), vec![SoundCue::MenuOpen]);
    }

    #[test]
    fn start_is_refused_without_music() {
        let mut session = session_with(RecordingAudio { missing_music: true, ..Default::default() });
        session.dispatch(Command::StartGame, Instant::now());
        let events = session.drain_events();
        assert!(!session.state().is_playing);
        assert!(events.iter().any(|e| matches!(e, GameEvent::Alert(_))));
    }

    #[test]
    fn start_resets_and_plays_from_the_top() {
        let mut session = session();
        let now = Instant::now();
        session.dispatch(Command::StartGame, now);
        let events = session.drain_events();
        assert!(session.state().is_playing);
        assert!(session.music().is_playing());
        assert!(!session.pause_menu_visible());
        assert!(events.contains(&GameEvent::StartButton { label: "Game Running", disabled: true }));
        assert_eq!(
            cues(&events),
            vec![SoundCue::ButtonClick, SoundCue::MenuClose, SoundCue::SongStart]
        );
        assert!(session.audio().calls.contains(&AudioCall::PlayMusic { from_start: true }));
    }

    #[test]
    fn pause_and_resume_round_trip() {
        let mut session = session();
        let t0 = Instant::now();
        session.dispatch(Command::StartGame, t0);
        session.dispatch(Command::PauseGame, t0 + Duration::from_secs(1));
        assert!(!session.state().is_playing);
        assert!(!session.music().is_playing());
        assert!(session.pause_menu_visible());
        assert_eq!(session.menu_command(MenuKey::Back), Some(Command::ResumeGame));

        session.drain_events();
        session.dispatch(Command::ResumeGame, t0 + Duration::from_secs(2));
        let events = session.drain_events();
        assert!(session.state().is_playing);
        assert_eq!(
            cues(&events),
            vec![SoundCue::ButtonClick, SoundCue::MenuClose, SoundCue::GameResume]
        );
        // Resume restarts the spawn buffer.
        assert!(!session.state().is_buffer_time_passed(GAME_START_BUFFER, t0 + Duration::from_secs(4)));
    }

    #[test]
    fn resume_needs_a_started_game() {
        let mut session = session();
        session.dispatch(Command::ResumeGame, Instant::now());
        assert!(!session.state().is_playing);
    }

    #[test]
    fn key_press_hits_only_while_playing() {
        let mut session = session();
        let t0 = Instant::now();
        place_note(&mut session, Lane::D, HIT_POSITION);
        session.dispatch(Command::KeyDown(Lane::D), t0);
        assert_eq!(session.state().score, 0);
        assert_eq!(session.effects().hit_marker_color(Lane::D), Lane::D.color());
        session.dispatch(Command::KeyUp(Lane::D), t0);

        session.dispatch(Command::StartGame, t0);
        place_note(&mut session, Lane::D, HIT_POSITION);
        session.drain_events();
        session.dispatch(Command::KeyDown(Lane::D), t0);
        assert_eq!(session.state().score, HIT_SCORE);
        assert_eq!(session.stats().combo, 1);
        let events = session.drain_events();
        assert!(events.contains(&GameEvent::ScoreChanged(HIT_SCORE)));
        assert!(session.audio().played_sfx().contains(&SoundCue::NotePerfect.key()));
    }

    #[test]
    fn no_spawns_during_the_start_buffer() {
        let mut session = session();
        let t0 = Instant::now();
        session.dispatch(Command::StartGame, t0);
        for frame in 1..150u64 {
            session.update(t0 + Duration::from_millis(frame * 16));
        }
        assert!(session.field().is_empty());
    }

    #[test]
    fn notes_spawn_and_score_stays_monotonic_over_a_run() {
        let mut session = session();
        let t0 = Instant::now();
        session.dispatch(Command::ChangeDifficulty(Difficulty::Hard), t0);
        session.dispatch(Command::StartGame, t0);
        let mut last_score = 0;
        let mut spawned = false;
        for frame in 1..1500u64 {
            let now = t0 + Duration::from_millis(frame * 16);
            session.update(now);
            spawned |= !session.field().is_empty();
            let lane = Lane::ALL[frame as usize % 5];
            if frame % 4 == 0 {
                session.dispatch(Command::KeyDown(lane), now);
            } else {
                session.dispatch(Command::KeyUp(lane), now);
            }
            assert!(session.state().score >= last_score);
            last_score = session.state().score;
        }
        assert!(spawned);
        let events = session.drain_events();
        assert!(events.contains(&GameEvent::BeatPulse));
    }

    #[test]
    fn song_end_shows_the_end_screen() {
        let mut session = session_with(RecordingAudio {
            music_length: Duration::from_secs(2),
            ..Default::default()
        });
        let t0 = Instant::now();
        session.dispatch(Command::StartGame, t0);
        session.drain_events();
        session.update(t0 + Duration::from_secs(3));
        let events = session.drain_events();
        assert!(!session.state().is_playing);
        assert!(session.end_screen_visible());
        assert!(events.contains(&GameEvent::EndScreen { visible: true, final_score: 0 }));
        assert_eq!(cues(&events), vec![SoundCue::SongEnd, SoundCue::SongComplete]);
        assert_eq!(session.menu_command(MenuKey::Confirm), Some(Command::PlayAgain));

        session.dispatch(Command::PlayAgain, t0 + Duration::from_secs(4));
        assert!(session.state().is_playing);
        assert!(!session.end_screen_visible());
    }

    #[test]
    fn restart_from_the_end_screen_clears_it() {
        let mut session = session_with(RecordingAudio {
            music_length: Duration::from_secs(2),
            ..Default::default()
        });
        let t0 = Instant::now();
        session.dispatch(Command::StartGame, t0);
        session.update(t0 + Duration::from_secs(3));
        assert!(session.end_screen_visible());

        let restart = session.menu_command(MenuKey::Restart);
        assert_eq!(restart, Some(Command::RestartGame));
        session.drain_events();
        session.dispatch(Command::RestartGame, t0 + Duration::from_secs(4));
        let events = session.drain_events();
        assert!(session.state().is_playing);
        assert!(!session.end_screen_visible());
        assert!(events.contains(&GameEvent::EndScreen { visible: false, final_score: 0 }));

        session.dispatch(Command::PauseGame, t0 + Duration::from_secs(5));
        assert_eq!(session.menu_command(MenuKey::Back), Some(Command::ResumeGame));
        assert_eq!(session.menu_command(MenuKey::Confirm), Some(Command::ResumeGame));
        session.dispatch(Command::ResumeGame, t0 + Duration::from_secs(6));
        assert!(session.state().is_playing);
    }

    #[test]
    fn song_change_is_ignored_mid_run() {
        let mut session = session();
        let t0 = Instant::now();
        session.dispatch(Command::StartGame, t0);
        session.drain_events();
        session.dispatch(Command::SelectSong(1), t0);
        let events = session.drain_events();
        assert_eq!(session.selected_song(), Some(0));
        assert_eq!(session.music().current_bpm(), builtin_songs()[0].bpm);
        assert!(session.music().is_playing());
        assert!(!events.iter().any(|e| matches!(e, GameEvent::SongSelected { .. })));
        assert_eq!(session.menu_command(MenuKey::NextSong), None);
    }

    #[test]
    fn queued_rapid_notes_wait_out_a_pause() {
        let mut session = session();
        let t0 = Instant::now();
        session.dispatch(Command::StartGame, t0);
        session.spawner.queue(Lane::F, t0 + Duration::from_millis(100));
        session.dispatch(Command::PauseGame, t0 + Duration::from_millis(50));

        session.update(t0 + Duration::from_secs(1));
        assert!(session.field().is_empty());
        assert_eq!(session.spawner.pending().len(), 1);

        let resumed = t0 + Duration::from_secs(2);
        session.dispatch(Command::ResumeGame, resumed);
        session.update(resumed + Duration::from_millis(16));
        assert!(session.spawner.pending().is_empty());
        assert_eq!(session.field().len(), 1);
        assert_eq!(session.field().notes()[0].lane, Lane::F);
    }

    #[test]
    fn song_selection_drops_queued_notes() {
        let mut session = session();
        let t0 = Instant::now();
        session.dispatch(Command::StartGame, t0);
        session.spawner.queue(Lane::A, t0 + Duration::from_millis(100));
        session.spawner.queue(Lane::A, t0 + Duration::from_millis(200));
        session.dispatch(Command::PauseGame, t0);
        session.dispatch(Command::ShowSongSelection, t0);
        assert!(session.spawner.pending().is_empty());

        session.dispatch(Command::StartGame, t0 + Duration::from_secs(1));
        session.update(t0 + Duration::from_millis(1300));
        assert!(session.field().is_empty());
    }

    #[test]
    fn song_selection_resets_and_reloads() {
        let mut session = session();
        let t0 = Instant::now();
        session.dispatch(Command::StartGame, t0);
        session.dispatch(Command::PauseGame, t0);
        session.dispatch(Command::ShowSongSelection, t0);
        assert!(!session.state().has_played());
        assert_eq!(session.menu_command(MenuKey::NextSong), Some(Command::SelectSong(1)));
        assert_eq!(session.menu_command(MenuKey::PrevSong), Some(Command::SelectSong(1)));

        session.drain_events();
        session.dispatch(Command::SelectSong(1), t0);
        let events = session.drain_events();
        assert_eq!(session.selected_song(), Some(1));
        assert_eq!(session.music().current_bpm(), 115.0);
        assert!(events.contains(&GameEvent::SongSelected { index: 1, display_name: "If You".to_string() }));
        assert!(events.contains(&GameEvent::StartButton { label: "Start", disabled: false }));
    }

    #[test]
    fn unavailable_song_disables_start() {
        let mut session = session();
        session.audio.missing_music = true;
        session.dispatch(Command::SelectSong(1), Instant::now());
        let events = session.drain_events();
        assert!(events.contains(&GameEvent::StartButton { label: "Music Unavailable", disabled: true }));
        assert!(!session.music().is_loaded());
    }

    #[test]
    fn volume_and_difficulty_commands() {
        let mut session = session();
        let now = Instant::now();
        session.dispatch(Command::ChangeVolume(0.9), now);
        assert_eq!(session.music().volume(), 0.9);
        assert_eq!(
            session.menu_command(MenuKey::VolumeUp),
            Some(Command::ChangeVolume(0.9 + VOLUME_STEP))
        );
        session.dispatch(Command::ChangeVolume(3.0), now);
        assert_eq!(session.music().volume(), 1.0);

        session.dispatch(Command::ChangeDifficulty(Difficulty::Easy), now);
        assert_eq!(session.state().difficulty, Difficulty::Easy);
        let events = session.drain_events();
        assert!(cues(&events).contains(&SoundCue::DifficultyChange));
        assert!(events.contains(&GameEvent::VolumeChanged(1.0)));
    }
}
