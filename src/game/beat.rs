use crate::config::BEAT_VARIATION;
use rand::Rng;
use std::time::{Duration, Instant};

/// Clock-driven beat source. There is no audio analysis: beats fall every `60 / bpm`
/// seconds with a little random variation so spawns do not feel mechanical.
#[derive(Clone, Debug)]
pub struct BeatDetector {
    bpm: f32,
    last_beat: Option<Instant>,
    is_beat: bool,
}

impl BeatDetector {
    pub fn new(bpm: f32) -> Self {
        Self { bpm, last_beat: None, is_beat: false }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm;
    }

    pub fn reset(&mut self) {
        self.last_beat = None;
        self.is_beat = false;
    }

    pub fn beat_interval(&self) -> Duration {
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Duration::MAX;
        }
        Duration::from_secs_f32(60.0 / self.bpm)
    }

    /// Returns true when a beat falls on this tick.
    pub fn detect<R: Rng>(&mut self, now: Instant, rng: &mut R) -> bool {
        let interval = self.beat_interval();
        if interval == Duration::MAX {
            self.is_beat = false;
            return false;
        }

        let since_last = match self.last_beat {
            Some(last) => now.saturating_duration_since(last),
            // No beat yet: the first tick counts as one.
            None => Duration::MAX,
        };

        let variation = (rng.random::<f32>() - 0.5) * BEAT_VARIATION;
        let adjusted = interval.mul_f32(1.0 + variation);

        if since_last > adjusted {
            self.last_beat = Some(now);
            self.is_beat = true;
        } else {
            self.is_beat = false;
        }
        self.is_beat
    }

    #[allow(dead_code)]
    pub fn is_beat(&self) -> bool {
        self.is_beat
    }
}
