use crate::config::{
    DEFAULT_AUDIO_DIR, DEFAULT_MASTER_VOLUME, DEFAULT_MUSIC_VOLUME, DEFAULT_MUSIC_XML_PATH,
    DEFAULT_SFX_DIR, DEFAULT_SFX_VOLUME, PROFILE_INI_PATH,
};
use crate::game::state::Difficulty;
use configparser::ini::Ini;
use log::{info, warn};
use once_cell::sync::Lazy;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

// --- Profile Data ---
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub difficulty: Difficulty,
    pub music_volume: f32,
    pub sfx_volume: f32,
    pub master_volume: f32,
    pub sfx_enabled: bool,
    pub debug: bool,
    pub audio_dir: PathBuf,
    pub sfx_dir: PathBuf,
    pub music_xml: PathBuf,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            music_volume: DEFAULT_MUSIC_VOLUME,
            sfx_volume: DEFAULT_SFX_VOLUME,
            master_volume: DEFAULT_MASTER_VOLUME,
            sfx_enabled: true,
            debug: false,
            audio_dir: PathBuf::from(DEFAULT_AUDIO_DIR),
            sfx_dir: PathBuf::from(DEFAULT_SFX_DIR),
            music_xml: PathBuf::from(DEFAULT_MUSIC_XML_PATH),
        }
    }
}

// Global static for the current profile.
static PROFILE: Lazy<Mutex<Profile>> = Lazy::new(|| Mutex::new(Profile::default()));

fn to_ini(profile: &Profile) -> Ini {
    let mut conf = Ini::new();
    conf.set("Options", "Difficulty", Some(profile.difficulty.as_str().to_string()));
    conf.set("Options", "MusicVolume", Some(format!("{:.2}", profile.music_volume)));
    conf.set("Options", "SfxVolume", Some(format!("{:.2}", profile.sfx_volume)));
    conf.set("Options", "MasterVolume", Some(format!("{:.2}", profile.master_volume)));
    conf.set("Options", "SfxEnabled", Some(if profile.sfx_enabled { "1" } else { "0" }.to_string()));
    conf.set("Options", "Debug", Some(if profile.debug { "1" } else { "0" }.to_string()));
    conf.set("Paths", "AudioDir", Some(profile.audio_dir.display().to_string()));
    conf.set("Paths", "SfxDir", Some(profile.sfx_dir.display().to_string()));
    conf.set("Paths", "MusicXml", Some(profile.music_xml.display().to_string()));
    conf
}

fn read_volume(conf: &Ini, key: &str, default: f32) -> f32 {
    conf.get("Options", key)
        .and_then(|v| v.trim().parse::<f32>().ok())
        .map_or(default, |v| v.clamp(0.0, 1.0))
}

fn read_flag(conf: &Ini, key: &str, default: bool) -> bool {
    conf.get("Options", key)
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map_or(default, |v| v != 0)
}

fn from_ini(conf: &Ini) -> Profile {
    let defaults = Profile::default();
    let difficulty = match conf.get("Options", "Difficulty") {
        Some(raw) => raw.parse().unwrap_or_else(|e: String| {
            warn!("{}; falling back to {}.", e, defaults.difficulty);
            defaults.difficulty
        }),
        None => defaults.difficulty,
    };
    let path = |key: &str, default: &PathBuf| {
        conf.get("Paths", key)
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| default.clone(), PathBuf::from)
    };

    Profile {
        difficulty,
        music_volume: read_volume(conf, "MusicVolume", defaults.music_volume),
        sfx_volume: read_volume(conf, "SfxVolume", defaults.sfx_volume),
        master_volume: read_volume(conf, "MasterVolume", defaults.master_volume),
        sfx_enabled: read_flag(conf, "SfxEnabled", defaults.sfx_enabled),
        debug: read_flag(conf, "Debug", defaults.debug),
        audio_dir: path("AudioDir", &defaults.audio_dir),
        sfx_dir: path("SfxDir", &defaults.sfx_dir),
        music_xml: path("MusicXml", &defaults.music_xml),
    }
}

/// Writes `profile` to `path`, creating parent directories as needed.
pub fn save_to(path: &Path, profile: &Profile) -> Result<(), std::io::Error> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    to_ini(profile).write(path)
}

/// Reads the profile at `path`. A missing file is created with defaults; anything
/// unreadable falls back to defaults.
pub fn load_from(path: &Path) -> Profile {
    if !path.exists() {
        info!("Profile not found, creating defaults in '{}'.", path.display());
        if let Err(e) = save_to(path, &Profile::default()) {
            warn!("Failed to create default profile file: {}", e);
        }
        return Profile::default();
    }

    let mut conf = Ini::new();
    match conf.load(path) {
        Ok(_) => from_ini(&conf),
        Err(e) => {
            warn!("Failed to load '{}' ({}), using defaults.", path.display(), e);
            Profile::default()
        }
    }
}

pub fn load() {
    let loaded = load_from(Path::new(PROFILE_INI_PATH));
    info!(
        "Profile loaded: difficulty {}, music {:.0}%, sfx {:.0}%.",
        loaded.difficulty,
        loaded.music_volume * 100.0,
        loaded.sfx_volume * 100.0
    );
    *PROFILE.lock().unwrap() = loaded;
}

/// Returns a copy of the currently loaded profile data.
pub fn get() -> Profile {
    PROFILE.lock().unwrap().clone()
}

/// Applies `f` to the live profile and writes it back to disk.
pub fn update(f: impl FnOnce(&mut Profile)) {
    let snapshot = {
        let mut profile = PROFILE.lock().unwrap();
        f(&mut profile);
        profile.clone()
    };
    if let Err(e) = save_to(Path::new(PROFILE_INI_PATH), &snapshot) {
        warn!("Failed to save profile: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save/fretline.ini");
        assert_eq!(load_from(&path), Profile::default());
        assert!(path.exists());
        assert_eq!(load_from(&path), Profile::default());
    }

    #[test]
    fn saved_options_are_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fretline.ini");
        let profile = Profile {
            difficulty: Difficulty::Hard,
            music_volume: 0.25,
            sfx_enabled: false,
            debug: true,
            music_xml: PathBuf::from("songs/music.xml"),
            ..Profile::default()
        };
        save_to(&path, &profile).unwrap();
        assert_eq!(load_from(&path), profile);
    }

    #[test]
    fn bad_values_fall_back_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fretline.ini");
        fs::write(
            &path,
            "[Options]\nDifficulty=nightmare\nMusicVolume=4.0\nSfxVolume=abc\nDebug=1\n[Paths]\nAudioDir=\n",
        )
        .unwrap();
        let profile = load_from(&path);
        assert_eq!(profile.difficulty, Difficulty::Medium);
        assert_eq!(profile.music_volume, 1.0);
        assert_eq!(profile.sfx_volume, DEFAULT_SFX_VOLUME);
        assert!(profile.debug);
        assert_eq!(profile.audio_dir, PathBuf::from(DEFAULT_AUDIO_DIR));
    }
}
