use crate::config::{
    BEAT_LONG_NOTE_CHANCE, CHORD_MAX_NOTES, CHORD_MIN_NOTES, LANE_COUNT, RANDOM_LONG_NOTE_CHANCE,
    RANDOM_SPAWN_RATE_SCALE, RAPID_MAX_NOTES, RAPID_MIN_NOTES, RAPID_NOTE_DELAY,
};
use crate::game::note::{Lane, NoteId};
use crate::game::notefield::NoteField;
use crate::game::state::DifficultySettings;
use rand::Rng;
use std::time::Instant;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NotePattern {
    Single,
    Chord,
    Rapid,
}

/// A rapid-sequence note waiting for its slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PendingSpawn {
    pub due: Instant,
    pub lane: Lane,
}

pub fn random_lane<R: Rng>(rng: &mut R) -> Lane {
    Lane::ALL[rng.random_range(0..LANE_COUNT)]
}

/// Always a single note, then a chord and a rapid run on their own rolls,
/// capped at `notes_per_beat` patterns.
pub fn determine_pattern<R: Rng>(settings: &DifficultySettings, rng: &mut R) -> Vec<NotePattern> {
    let mut patterns = vec![NotePattern::Single];
    if rng.random::<f32>() < settings.chord_chance {
        patterns.push(NotePattern::Chord);
    }
    if rng.random::<f32>() < settings.rapid_chance {
        patterns.push(NotePattern::Rapid);
    }
    patterns.truncate(settings.notes_per_beat);
    patterns
}

#[derive(Debug, Default)]
pub struct Spawner {
    pending: Vec<PendingSpawn>,
}

impl Spawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops queued rapid notes.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn pending(&self) -> &[PendingSpawn] {
        &self.pending
    }

    #[cfg(test)]
    pub fn queue(&mut self, lane: Lane, due: Instant) {
        self.pending.push(PendingSpawn { due, lane });
    }

    /// Spawns one beat's worth of notes. Returns the notes created immediately; the
    /// tail of a rapid run is queued.
    pub fn spawn_notes_on_beat<R: Rng>(
        &mut self,
        settings: &DifficultySettings,
        now: Instant,
        rng: &mut R,
        field: &mut NoteField,
    ) -> Vec<NoteId> {
        let mut created = Vec::new();
        for pattern in determine_pattern(settings, rng) {
            match pattern {
                NotePattern::Single => {
                    let lane = random_lane(rng);
                    let is_long = rng.random::<f32>() < BEAT_LONG_NOTE_CHANCE;
                    created.push(field.create_note(lane, is_long));
                }
                NotePattern::Chord => created.extend(self.spawn_chord(rng, field)),
                NotePattern::Rapid => created.extend(self.spawn_rapid(now, rng, field)),
            }
        }
        created
    }

    fn spawn_chord<R: Rng>(&mut self, rng: &mut R, field: &mut NoteField) -> Vec<NoteId> {
        let count = rng
            .random_range(CHORD_MIN_NOTES..=CHORD_MAX_NOTES)
            .min(LANE_COUNT);
        let mut lanes: Vec<Lane> = Vec::with_capacity(count);
        while lanes.len() < count {
            let lane = random_lane(rng);
            if !lanes.contains(&lane) {
                lanes.push(lane);
            }
        }
        lanes
            .into_iter()
            .map(|lane| field.create_note(lane, false))
            .collect()
    }

    fn spawn_rapid<R: Rng>(&mut self, now: Instant, rng: &mut R, field: &mut NoteField) -> Vec<NoteId> {
        let lane = random_lane(rng);
        let count = rng.random_range(RAPID_MIN_NOTES..=RAPID_MAX_NOTES);
        for i in 1..count {
            self.pending.push(PendingSpawn {
                due: now + RAPID_NOTE_DELAY * i as u32,
                lane,
            });
        }
        vec![field.create_note(lane, false)]
    }

    /// Off-beat filler. Two gates: a scaled per-tick roll, then the raw spawn chance.
    pub fn spawn_random_note<R: Rng>(
        &mut self,
        settings: &DifficultySettings,
        rng: &mut R,
        field: &mut NoteField,
    ) -> Option<NoteId> {
        if rng.random::<f32>() >= settings.note_spawn_chance * RANDOM_SPAWN_RATE_SCALE {
            return None;
        }
        if rng.random::<f32>() >= settings.note_spawn_chance {
            return None;
        }
        let lane = random_lane(rng);
        let is_long = rng.random::<f32>() < RANDOM_LONG_NOTE_CHANCE;
        Some(field.create_note(lane, is_long))
    }

    /// Creates every queued note whose slot has come up.
    pub fn release_due(&mut self, now: Instant, field: &mut NoteField) -> Vec<NoteId> {
        let mut created = Vec::new();
        self.pending.retain(|spawn| {
            if spawn.due <= now {
                created.push(field.create_note(spawn.lane, false));
                false
            } else {
                true
            }
        });
        created
    }
}
