use crate::config::{
    HIT_SCORE, LONG_NOTE_COMPLETE_SCORE, LONG_NOTE_DURATION, LONG_NOTE_HOLD_TICK_SCORE,
    LONG_NOTE_RELEASE_SCORE, NOTE_REMOVAL_Z,
};
use crate::game::effects::Effects;
use crate::game::events::GameEvent;
use crate::game::judgment::{self, HitGrade, Stats};
use crate::game::note::{Lane, Note, NoteId};
use crate::game::sfx::{self, SoundCue};
use crate::game::state::GameState;
use log::debug;
use rand::RngCore;
use std::time::Instant;

/// The pieces of session state a note field operation may touch.
pub struct FieldContext<'a> {
    pub state: &'a mut GameState,
    pub stats: &'a mut Stats,
    pub effects: &'a mut Effects,
    pub rng: &'a mut dyn RngCore,
    pub events: &'a mut Vec<GameEvent>,
}

impl FieldContext<'_> {
    fn cue(&mut self, cue: SoundCue) {
        self.events.push(GameEvent::Sfx(cue));
    }

    fn score(&mut self, points: u64) {
        self.state.add_score(points);
        self.events.push(GameEvent::ScoreChanged(self.state.score));
    }

    fn hit(&mut self, note: &Note, grade: HitGrade) {
        self.effects
            .create_hit_effect(note.position, note.lane.color(), &mut self.rng);
        self.cue(match grade {
            HitGrade::Perfect => SoundCue::NotePerfect,
            HitGrade::Good => SoundCue::NoteHit,
        });
        self.stats.register_hit(grade);
        self.events.push(GameEvent::ComboChanged(self.stats.combo));
        if let Some(cue) = sfx::combo_cue(self.stats.combo) {
            self.cue(cue);
        }
    }

    fn miss(&mut self) {
        self.cue(SoundCue::NoteMiss);
        if self.stats.register_miss() {
            self.cue(SoundCue::StreakBreak);
            self.events.push(GameEvent::ComboChanged(0));
        }
    }
}

#[derive(Debug, Default)]
pub struct NoteField {
    notes: Vec<Note>,
    next_id: u64,
}

impl NoteField {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub(crate) fn note_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.iter_mut().find(|n| n.id == id)
    }

    pub fn clear_all(&mut self) {
        self.notes.clear();
    }

    pub fn create_note(&mut self, lane: Lane, is_long_note: bool) -> NoteId {
        let id = NoteId(self.next_id);
        self.next_id += 1;
        let note = Note::spawn(id, lane, is_long_note);
        debug!(
            "Created {} note {} in lane {} at z={:.2}",
            if is_long_note { "long" } else { "short" },
            id.0,
            lane,
            note.position.z
        );
        self.notes.push(note);
        id
    }

    /// Removes a note. A note can only be removed once; later calls return `None`.
    pub fn remove_note(&mut self, id: NoteId) -> Option<Note> {
        let index = self.notes.iter().position(|n| n.id == id)?;
        Some(self.notes.remove(index))
    }

    /// Advances every note by one frame, judges notes that slipped past the hit zone,
    /// scores held long notes, and drops notes that left the board.
    pub fn update_notes(&mut self, scroll_speed: f32, frame_scale: f32, now: Instant, ctx: &mut FieldContext<'_>) {
        let mut finished = Vec::new();

        for note in &mut self.notes {
            note.position.z += scroll_speed * frame_scale;

            if note.is_past_hit_zone() && !note.was_hit && !note.is_being_hit && !note.miss_registered {
                note.miss_registered = true;
                debug!("Missed note {} in lane {}", note.id.0, note.lane);
                ctx.miss();
            }

            if note.is_long_note && note.is_being_hit {
                let held_since = note.long_note_started_at.unwrap_or(now);
                if now.saturating_duration_since(held_since) >= LONG_NOTE_DURATION {
                    note.is_being_hit = false;
                    note.was_hit = true;
                    ctx.hit(note, HitGrade::Perfect);
                    ctx.stats.long_notes_completed += 1;
                    ctx.score(LONG_NOTE_COMPLETE_SCORE);
                    finished.push(note.id);
                    continue;
                }
                ctx.score(LONG_NOTE_HOLD_TICK_SCORE);
            }

            if note.position.z > NOTE_REMOVAL_Z {
                finished.push(note.id);
            }
        }

        for id in finished {
            self.remove_note(id);
        }
    }

    /// First note of `lane` inside the hit zone that is not already held.
    pub fn find_note_in_hit_zone(&self, lane: Lane) -> Option<NoteId> {
        self.notes
            .iter()
            .find(|n| n.lane == lane && n.in_hit_zone() && !n.is_being_hit)
            .map(|n| n.id)
    }

    /// Returns true if the press landed on a note.
    pub fn handle_key_press(&mut self, lane: Lane, now: Instant, ctx: &mut FieldContext<'_>) -> bool {
        let Some(id) = self.find_note_in_hit_zone(lane) else {
            return false;
        };
        let is_long = self.get(id).is_some_and(|n| n.is_long_note);
        if is_long {
            self.start_long_note(id, now);
        } else {
            self.hit_note(id, ctx);
        }
        true
    }

    fn start_long_note(&mut self, id: NoteId, now: Instant) {
        if let Some(note) = self.note_mut(id) {
            note.is_being_hit = true;
            note.long_note_started_at = Some(now);
            debug!("Holding long note {} in lane {}", id.0, note.lane);
        }
    }

    fn hit_note(&mut self, id: NoteId, ctx: &mut FieldContext<'_>) {
        let Some(mut note) = self.remove_note(id) else {
            return;
        };
        let Some(grade) = judgment::grade_for_distance(note.distance_to_hit_line()) else {
            return;
        };
        note.was_hit = true;
        ctx.hit(&note, grade);
        ctx.score(HIT_SCORE);
    }

    /// Ends every held long note whose key is no longer down. Released notes score the
    /// partial bonus and leave the combo alone.
    pub fn handle_long_notes(&mut self, ctx: &mut FieldContext<'_>) {
        let released: Vec<NoteId> = self
            .notes
            .iter()
            .filter(|n| n.is_long_note && n.is_being_hit && !ctx.state.is_key_active(n.lane))
            .map(|n| n.id)
            .collect();
        for id in released {
            if self.remove_note(id).is_some() {
                ctx.stats.long_notes_released += 1;
                ctx.score(LONG_NOTE_RELEASE_SCORE);
            }
        }
    }
}
