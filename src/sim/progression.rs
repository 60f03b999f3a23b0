//! Difficulty curve and level progression
//!
//! Every difficulty value is a pure function of the level. Speed and ammo
//! grow with log10(level); the spawn interval shrinks toward a floor it
//! never reaches. The score needed for the next level rides the same curve.

use serde::{Deserialize, Serialize};

use super::state::Installation;
use crate::tuning::Tuning;

#[inline]
fn log_level(level: u32) -> f64 {
    f64::from(level.max(1)).log10()
}

/// Threat speed (px/s) at a level
pub fn speed(level: u32, tuning: &Tuning) -> f64 {
    f64::from(tuning.base_speed) + f64::from(tuning.speed_log_coeff) * log_level(level)
}

/// Milliseconds between spawns at a level
pub fn spawn_interval_ms(level: u32, tuning: &Tuning) -> f64 {
    f64::from(tuning.spawn_numerator_ms)
        / (1.0 + f64::from(tuning.spawn_log_coeff) * log_level(level))
        + f64::from(tuning.spawn_floor_ms)
}

/// Launches per installation at a level
pub fn max_ammo(level: u32, tuning: &Tuning) -> u32 {
    let extra = (f64::from(tuning.ammo_log_coeff) * log_level(level))
        .floor()
        .max(0.0);
    tuning.base_ammo.saturating_add(extra as u32)
}

/// Relative difficulty: normalized speed times spawns per second
pub fn difficulty_factor(level: u32, tuning: &Tuning) -> f64 {
    let relative_speed = if tuning.base_speed > 0.0 {
        speed(level, tuning) / f64::from(tuning.base_speed)
    } else {
        1.0
    };
    let interval = spawn_interval_ms(level, tuning).max(f64::EPSILON);
    (relative_speed / 2.0) * (1000.0 / interval)
}

/// Score required within a level to reach the next one
pub fn score_threshold(level: u32, tuning: &Tuning) -> u64 {
    let threshold = (f64::from(tuning.base_score) * difficulty_factor(level, tuning)).floor();
    if threshold.is_finite() {
        (threshold as u64).max(1)
    } else {
        1
    }
}

/// Score and difficulty for the current run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionState {
    pub level: u32,
    pub score: u64,
    pub score_at_level_start: u64,
    pub threshold: u64,
    pub speed: f32,
    pub max_ammo: u32,
    pub spawn_interval_ms: f32,
}

impl ProgressionState {
    pub fn new(level: u32, tuning: &Tuning) -> Self {
        let mut state = Self {
            level: level.max(1),
            score: 0,
            score_at_level_start: 0,
            threshold: 0,
            speed: 0.0,
            max_ammo: 0,
            spawn_interval_ms: 0.0,
        };
        state.recompute(tuning);
        state
    }

    fn recompute(&mut self, tuning: &Tuning) {
        self.threshold = score_threshold(self.level, tuning);
        self.speed = speed(self.level, tuning) as f32;
        self.max_ammo = max_ammo(self.level, tuning);
        self.spawn_interval_ms = spawn_interval_ms(self.level, tuning) as f32;
    }

    pub fn award(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
    }

    pub fn score_in_level(&self) -> u64 {
        self.score.saturating_sub(self.score_at_level_start)
    }

    pub fn score_to_next_level(&self) -> u64 {
        self.threshold.saturating_sub(self.score_in_level())
    }

    /// Fraction of the way to the next level, 0..=1
    pub fn level_progress(&self) -> f32 {
        if self.threshold == 0 {
            return 1.0;
        }
        (self.score_in_level() as f32 / self.threshold as f32).min(1.0)
    }

    pub fn ready_to_level_up(&self) -> bool {
        self.score_in_level() >= self.threshold
    }

    /// Advance one level: new baseline and difficulty, partial repair of
    /// every installation, then full resupply of the ones standing.
    pub fn level_up(&mut self, tuning: &Tuning, installations: &mut [Installation]) {
        self.level = self.level.saturating_add(1);
        self.score_at_level_start = self.score;
        self.recompute(tuning);

        for inst in installations.iter_mut() {
            inst.repair(tuning.repair_amount);
            if !inst.destroyed {
                inst.refill(self.max_ammo);
            }
        }

        log::info!(
            "Level {}: threshold={}, speed={:.1}, spawn_interval={:.0}ms, max_ammo={}",
            self.level,
            self.threshold,
            self.speed,
            self.spawn_interval_ms,
            self.max_ammo
        );
    }

    /// Level up if the threshold is met. Returns true on a transition.
    pub fn check_level_up(&mut self, tuning: &Tuning, installations: &mut [Installation]) -> bool {
        if self.ready_to_level_up() {
            self.level_up(tuning, installations);
            true
        } else {
            false
        }
    }
}
