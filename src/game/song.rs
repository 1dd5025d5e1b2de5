use crate::config::DEFAULT_XML_BPM;
use log::{info, warn};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq)]
pub struct Song {
    /// File name of the track, relative to the audio directory for built-ins.
    pub name: String,
    pub bpm: f32,
    pub display_name: String,
    /// `class` attribute for songs that came from the music catalog.
    pub song_class: Option<String>,
    /// Explicit location for catalog songs, resolved against the catalog's directory.
    pub location: Option<PathBuf>,
}

impl Song {
    pub fn new(name: &str, bpm: f32, display_name: &str) -> Self {
        Self {
            name: name.to_string(),
            bpm,
            display_name: display_name.to_string(),
            song_class: None,
            location: None,
        }
    }

    pub fn resolve_path(&self, audio_dir: &Path) -> PathBuf {
        self.location
            .clone()
            .unwrap_or_else(|| audio_dir.join(&self.name))
    }
}

pub fn builtin_songs() -> Vec<Song> {
    vec![
        Song::new("tarzan.ogg", 130.0, "Tarzan"),
        Song::new("if-you.ogg", 115.0, "If You"),
    ]
}

static CAPITAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Z])").expect("static regex"));

/// Turns a camelCase class name into a display name: "ifYouLeave" -> "If You Leave".
pub fn display_name_from_class(class: &str) -> String {
    let spaced = CAPITAL.replace_all(class, " $1");
    let mut chars = spaced.chars();
    let titled = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    titled.trim().to_string()
}

struct PendingArrangement {
    class: Option<String>,
    bpm: Option<f32>,
    src: Option<String>,
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, String> {
    let attr = e
        .try_get_attribute(name)
        .map_err(|err| format!("Bad attribute '{}': {}", name, err))?;
    match attr {
        Some(attr) => attr
            .unescape_value()
            .map(|v| Some(v.into_owned()))
            .map_err(|err| format!("Bad value for '{}': {}", name, err)),
        None => Ok(None),
    }
}

fn finish(pending: PendingArrangement, songs: &mut Vec<Song>) {
    match (pending.class, pending.src) {
        (Some(class), Some(src)) if !class.is_empty() && !src.is_empty() => {
            songs.push(Song {
                name: src,
                bpm: pending.bpm.unwrap_or(DEFAULT_XML_BPM),
                display_name: display_name_from_class(&class),
                song_class: Some(class),
                location: None,
            });
        }
        (class, _) => warn!("Skipping arrangement {:?} without a class or track src.", class),
    }
}

/// Extracts every `<arrangement class=".."><track src=".."/></arrangement>` in the document.
pub fn parse_music_xml(xml: &str) -> Result<Vec<Song>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut songs = Vec::new();
    let mut pending: Option<PendingArrangement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"arrangement" => {
                pending = Some(PendingArrangement {
                    class: attribute(&e, "class")?,
                    bpm: attribute(&e, "bpm")?.and_then(|v| v.trim().parse().ok()),
                    src: None,
                });
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"arrangement" => {
                finish(
                    PendingArrangement { class: attribute(&e, "class")?, bpm: None, src: None },
                    &mut songs,
                );
            }
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"track" => {
                if let Some(p) = pending.as_mut().filter(|p| p.src.is_none()) {
                    p.src = attribute(&e, "src")?;
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"arrangement" => {
                if let Some(p) = pending.take() {
                    finish(p, &mut songs);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(format!("Malformed music XML: {}", e)),
        }
    }

    Ok(songs)
}

/// Reads the music catalog. Any failure is logged and yields an empty list.
pub fn load_catalog(path: &Path) -> Vec<Song> {
    let xml = match fs::read_to_string(path) {
        Ok(xml) => xml,
        Err(e) => {
            warn!("Failed to read music catalog {:?}: {}", path, e);
            return Vec::new();
        }
    };
    match parse_music_xml(&xml) {
        Ok(mut songs) => {
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            for song in &mut songs {
                song.location = Some(base.join(&song.name));
            }
            info!("Loaded {} songs from {:?}.", songs.len(), path);
            songs
        }
        Err(e) => {
            warn!("Failed to parse music catalog {:?}: {}", path, e);
            Vec::new()
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SongCatalog {
    songs: Vec<Song>,
}

impl SongCatalog {
    /// Built-ins first, then catalog songs whose file is not already listed.
    pub fn new(builtin: Vec<Song>, extra: Vec<Song>) -> Self {
        let mut songs = builtin;
        for song in extra {
            if !songs.iter().any(|s| s.name == song.name) {
                songs.push(song);
            }
        }
        Self { songs }
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn get(&self, index: usize) -> Option<&Song> {
        self.songs.get(index)
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}
