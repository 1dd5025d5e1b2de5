use crate::config::{HIT_WINDOW, PERFECT_WINDOW};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HitGrade {
    Perfect,
    Good,
}

/// Grades a key press by how far the note sits from the hit line.
pub fn grade_for_distance(distance: f32) -> Option<HitGrade> {
    if distance < PERFECT_WINDOW {
        Some(HitGrade::Perfect)
    } else if distance < HIT_WINDOW {
        Some(HitGrade::Good)
    } else {
        None
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ComboTier {
    Two,
    Three,
    Five,
    Ten,
    Twenty,
}

pub fn combo_tier(combo: u32) -> Option<ComboTier> {
    match combo {
        20.. => Some(ComboTier::Twenty),
        10..=19 => Some(ComboTier::Ten),
        5..=9 => Some(ComboTier::Five),
        3..=4 => Some(ComboTier::Three),
        2 => Some(ComboTier::Two),
        _ => None,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub combo: u32,
    pub max_combo: u32,
    pub perfect_hits: u32,
    pub good_hits: u32,
    pub misses: u32,
    pub long_notes_completed: u32,
    pub long_notes_released: u32,
}

impl Stats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn register_hit(&mut self, grade: HitGrade) {
        self.combo = self.combo.saturating_add(1);
        self.max_combo = self.max_combo.max(self.combo);
        match grade {
            HitGrade::Perfect => self.perfect_hits = self.perfect_hits.saturating_add(1),
            HitGrade::Good => self.good_hits = self.good_hits.saturating_add(1),
        }
    }

    /// Counts a miss and clears the combo. Returns true if a streak was broken.
    pub fn register_miss(&mut self) -> bool {
        self.misses = self.misses.saturating_add(1);
        let broke_streak = self.combo > 0;
        self.combo = 0;
        broke_streak
    }

    pub fn total_hits(&self) -> u32 {
        self.perfect_hits + self.good_hits
    }

    pub fn accuracy(&self) -> f32 {
        let judged = self.total_hits() + self.misses;
        if judged == 0 {
            return 0.0;
        }
        self.total_hits() as f32 / judged as f32
    }
}
