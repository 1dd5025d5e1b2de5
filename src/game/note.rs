use crate::config::{
    self, HIT_POSITION, HIT_WINDOW, LANE_SPACING, LANE_WIDTH, NOTE_SPAWN_Z, NOTE_Y, TOTAL_WIDTH,
};
use cgmath::Vector3;
use std::fmt;
use std::time::Instant;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Lane {
    A = 0,
    S = 1,
    D = 2,
    F = 3,
    G = 4,
}

impl Lane {
    pub const ALL: [Lane; config::LANE_COUNT] = [Lane::A, Lane::S, Lane::D, Lane::F, Lane::G];

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[allow(dead_code)]
    pub fn from_index(index: usize) -> Option<Lane> {
        Self::ALL.get(index).copied()
    }

    /// Maps a typed character to its lane, ignoring case.
    #[allow(dead_code)]
    pub fn from_char(c: char) -> Option<Lane> {
        match c.to_ascii_uppercase() {
            'A' => Some(Lane::A),
            'S' => Some(Lane::S),
            'D' => Some(Lane::D),
            'F' => Some(Lane::F),
            'G' => Some(Lane::G),
            _ => None,
        }
    }

    pub const fn label(self) -> char {
        match self {
            Lane::A => 'A',
            Lane::S => 'S',
            Lane::D => 'D',
            Lane::F => 'F',
            Lane::G => 'G',
        }
    }

    /// Horizontal center of the lane on the fretboard.
    pub fn x(self) -> f32 {
        match self {
            Lane::A => -TOTAL_WIDTH / 2.0 + LANE_WIDTH / 2.0,
            Lane::S => -TOTAL_WIDTH / 2.0 + LANE_WIDTH * 1.5 + LANE_SPACING,
            Lane::D => 0.0,
            Lane::F => TOTAL_WIDTH / 2.0 - LANE_WIDTH * 1.5 - LANE_SPACING,
            Lane::G => TOTAL_WIDTH / 2.0 - LANE_WIDTH / 2.0,
        }
    }

    pub const fn color(self) -> u32 {
        match self {
            Lane::A => config::LANE_COLOR_A,
            Lane::S => config::LANE_COLOR_S,
            Lane::D => config::LANE_COLOR_D,
            Lane::F => config::LANE_COLOR_F,
            Lane::G => config::LANE_COLOR_G,
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoteId(pub u64);

#[derive(Clone, Debug)]
pub struct Note {
    pub id: NoteId,
    pub lane: Lane,
    pub position: Vector3<f32>,
    pub is_long_note: bool,
    pub is_being_hit: bool,
    pub was_hit: bool,
    pub miss_registered: bool,
    pub long_note_started_at: Option<Instant>,
}

impl Note {
    pub fn spawn(id: NoteId, lane: Lane, is_long_note: bool) -> Self {
        Self {
            id,
            lane,
            position: Vector3::new(lane.x(), NOTE_Y, NOTE_SPAWN_Z),
            is_long_note,
            is_being_hit: false,
            was_hit: false,
            miss_registered: false,
            long_note_started_at: None,
        }
    }

    #[inline(always)]
    pub fn distance_to_hit_line(&self) -> f32 {
        (self.position.z - HIT_POSITION).abs()
    }

    #[inline(always)]
    pub fn in_hit_zone(&self) -> bool {
        self.distance_to_hit_line() < HIT_WINDOW
    }

    /// True once the note has scrolled past the far edge of the hit zone.
    #[inline(always)]
    pub fn is_past_hit_zone(&self) -> bool {
        self.position.z > HIT_POSITION + HIT_WINDOW
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_positions_are_symmetric() {
        assert!((Lane::A.x() + 2.6).abs() < 1e-5);
        assert!((Lane::S.x() + 1.3).abs() < 1e-5);
        assert_eq!(Lane::D.x(), 0.0);
        assert!((Lane::F.x() - 1.3).abs() < 1e-5);
        assert!((Lane::G.x() - 2.6).abs() < 1e-5);
    }

    #[test]
    fn lane_from_char_ignores_case() {
        assert_eq!(Lane::from_char('a'), Some(Lane::A));
        assert_eq!(Lane::from_char('G'), Some(Lane::G));
        assert_eq!(Lane::from_char('h'), None);
        for lane in Lane::ALL {
            assert_eq!(Lane::from_index(lane.index()), Some(lane));
        }
    }

    #[test]
    fn spawned_note_starts_at_back_of_board() {
        let note = Note::spawn(NoteId(7), Lane::F, true);
        assert_eq!(note.position.z, NOTE_SPAWN_Z);
        assert_eq!(note.position.y, NOTE_Y);
        assert!(!note.in_hit_zone());
        assert!(!note.is_past_hit_zone());
    }

    #[test]
    fn hit_zone_is_exclusive_at_the_edge() {
        let mut note = Note::spawn(NoteId(1), Lane::A, false);
        note.position.z = HIT_POSITION - HIT_WINDOW;
        assert!(!note.in_hit_zone());
        note.position.z = HIT_POSITION - 1.99;
        assert!(note.in_hit_zone());
        note.position.z = HIT_POSITION + HIT_WINDOW + 0.01;
        assert!(note.is_past_hit_zone());
    }
}
