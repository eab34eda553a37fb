//! Simulated heart rate values to write to the control point.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use heartlink_types::{HeartRate, MAX_BPM, MIN_BPM};

/// Default resting heart rate the simulator centres on.
pub const DEFAULT_BASE_BPM: u16 = 75;

/// Default spread around the base heart rate.
pub const DEFAULT_JITTER_BPM: u16 = 10;

/// Generates heart rates uniformly in `base ± jitter`, clamped to the valid range.
///
/// ```
/// use heartlink_core::HeartRateSimulator;
///
/// let mut sim = HeartRateSimulator::fixed(72);
/// assert_eq!(sim.next_bpm().bpm(), 72);
/// ```
#[derive(Debug, Clone)]
pub struct HeartRateSimulator {
    base_bpm: u16,
    jitter_bpm: u16,
    rng: StdRng,
}

impl Default for HeartRateSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_BPM, DEFAULT_JITTER_BPM)
    }
}

impl HeartRateSimulator {
    /// Create a simulator seeded from the thread RNG.
    pub fn new(base_bpm: u16, jitter_bpm: u16) -> Self {
        Self::with_rng(base_bpm, jitter_bpm, StdRng::from_rng(&mut rand::rng()))
    }

    /// Create a reproducible simulator.
    pub fn seeded(base_bpm: u16, jitter_bpm: u16, seed: u64) -> Self {
        Self::with_rng(base_bpm, jitter_bpm, StdRng::seed_from_u64(seed))
    }

    /// A simulator that always yields `bpm` (clamped).
    pub fn fixed(bpm: u16) -> Self {
        Self::new(bpm, 0)
    }

    fn with_rng(base_bpm: u16, jitter_bpm: u16, rng: StdRng) -> Self {
        Self {
            base_bpm: base_bpm.clamp(MIN_BPM, MAX_BPM),
            jitter_bpm,
            rng,
        }
    }

    pub fn base_bpm(&self) -> u16 {
        self.base_bpm
    }

    pub fn jitter_bpm(&self) -> u16 {
        self.jitter_bpm
    }

    /// Change the centre and spread without reseeding.
    pub fn retune(&mut self, base_bpm: u16, jitter_bpm: u16) {
        self.base_bpm = base_bpm.clamp(MIN_BPM, MAX_BPM);
        self.jitter_bpm = jitter_bpm;
    }

    /// Inclusive range the next value is drawn from.
    pub fn range(&self) -> (u16, u16) {
        let low = self.base_bpm.saturating_sub(self.jitter_bpm).max(MIN_BPM);
        let high = self.base_bpm.saturating_add(self.jitter_bpm).min(MAX_BPM);
        (low, high)
    }

    /// Draw the next simulated heart rate.
    pub fn next_bpm(&mut self) -> HeartRate {
        let (low, high) = self.range();
        HeartRate::saturating(self.rng.random_range(low..=high))
    }
}
