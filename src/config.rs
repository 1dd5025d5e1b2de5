use std::time::Duration;

// Window
pub const WINDOW_TITLE: &str = "Fretline";
pub const WINDOW_WIDTH: u32 = 1280;
pub const WINDOW_HEIGHT: u32 = 720;

// Asset Paths
pub const PROFILE_INI_PATH: &str = "save/fretline.ini";
pub const DEFAULT_AUDIO_DIR: &str = "assets/audio";
pub const DEFAULT_SFX_DIR: &str = "assets/audio/sfx";
pub const DEFAULT_MUSIC_XML_PATH: &str = "assets/music.xml";

// Fretboard Geometry (world units)
pub const LANE_WIDTH: f32 = 1.1;
pub const LANE_SPACING: f32 = 0.2;
pub const LANE_COUNT: usize = 5;
pub const TOTAL_WIDTH: f32 = (LANE_WIDTH + LANE_SPACING) * LANE_COUNT as f32 - LANE_SPACING;
pub const HIT_POSITION: f32 = 10.0;
pub const NUM_FRETS: usize = 7;
pub const FRETBOARD_LENGTH: f32 = 45.0;
pub const NOTE_SPAWN_Z: f32 = -FRETBOARD_LENGTH / 2.0;
pub const NOTE_Y: f32 = 0.28;
pub const FRET_Y: f32 = 0.26;

// Hit Zone
pub const HIT_WINDOW: f32 = 2.0; // half-width of the hit zone, also where a pass becomes a miss
pub const PERFECT_WINDOW: f32 = 0.5;
pub const NOTE_REMOVAL_Z: f32 = HIT_POSITION + FRETBOARD_LENGTH / 2.0;

// Timing
pub const GAME_START_BUFFER: Duration = Duration::from_millis(3000);
pub const RAPID_NOTE_DELAY: Duration = Duration::from_millis(100);
pub const BEAT_INDICATOR_DURATION: Duration = Duration::from_millis(100);
pub const LONG_NOTE_DURATION: Duration = Duration::from_millis(1000);
pub const MUSIC_LOAD_TIMEOUT: Duration = Duration::from_millis(5000);
pub const BEAT_VARIATION: f32 = 0.1; // full width, i.e. +/-5% of the beat interval
pub const REFERENCE_FPS: f32 = 60.0;

// Scoring
pub const HIT_SCORE: u64 = 50;
pub const LONG_NOTE_COMPLETE_SCORE: u64 = 50;
pub const LONG_NOTE_HOLD_TICK_SCORE: u64 = 1;
pub const LONG_NOTE_RELEASE_SCORE: u64 = 25;

// Spawn Odds
pub const BEAT_LONG_NOTE_CHANCE: f32 = 0.15;
pub const RANDOM_LONG_NOTE_CHANCE: f32 = 0.1;
pub const RANDOM_SPAWN_RATE_SCALE: f32 = 0.01;
pub const CHORD_MIN_NOTES: usize = 2;
pub const CHORD_MAX_NOTES: usize = 3;
pub const RAPID_MIN_NOTES: usize = 2;
pub const RAPID_MAX_NOTES: usize = 3;
pub const DEFAULT_XML_BPM: f32 = 120.0;

// Lane Colors
pub const LANE_COLOR_A: u32 = 0x00ff00; // green
pub const LANE_COLOR_S: u32 = 0xff0000; // red
pub const LANE_COLOR_D: u32 = 0xffff00; // yellow
pub const LANE_COLOR_F: u32 = 0x0000ff; // blue
pub const LANE_COLOR_G: u32 = 0xffa500; // orange
pub const HIT_MARKER_IDLE_COLOR: u32 = 0x464646;

// Particles
pub const HIT_EFFECT_PARTICLES: usize = 50;
pub const PARTICLE_LIFE_DECAY: f32 = 0.02;
pub const PARTICLE_FIRE_START_COLOR: u32 = 0xffa500;
pub const PARTICLE_FIRE_END_COLOR: u32 = 0xff0000;

// Volumes
pub const DEFAULT_MUSIC_VOLUME: f32 = 0.5;
pub const DEFAULT_SFX_VOLUME: f32 = 0.7;
pub const DEFAULT_MASTER_VOLUME: f32 = 1.0;
pub const VOLUME_STEP: f32 = 0.05;

// Misc
pub const MAX_DELTA_TIME: f32 = 0.1;
pub const STATUS_LOG_INTERVAL: f32 = 1.0;
