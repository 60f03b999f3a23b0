//! Wall-clock to fixed-step conversion
//!
//! The host calls [`FrameClock::substeps`] once per display refresh with a
//! millisecond timestamp. Gaps are clamped, and [`FrameClock::reset`] drops
//! the baseline so the first frame after a pause simulates nothing.

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameClock {
    last_ms: Option<f64>,
    accumulator: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous timestamp and any banked time
    pub fn reset(&mut self) {
        self.last_ms = None;
        self.accumulator = 0.0;
    }

    /// Seconds since the previous call, clamped to `0..=MAX_FRAME_DT`.
    /// The first call after a reset returns 0.
    pub fn elapsed(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_ms {
            Some(last) if now_ms.is_finite() => ((now_ms - last) / 1000.0) as f32,
            _ => 0.0,
        };
        if now_ms.is_finite() {
            self.last_ms = Some(now_ms);
        }
        dt.clamp(0.0, MAX_FRAME_DT)
    }

    /// Number of fixed `SIM_DT` steps to run this frame
    pub fn substeps(&mut self, now_ms: f64) -> u32 {
        self.accumulator += self.elapsed(now_ms);
        let mut steps = 0;
        while self.accumulator >= SIM_DT && steps < MAX_SUBSTEPS {
            self.accumulator -= SIM_DT;
            steps += 1;
        }
        if steps == MAX_SUBSTEPS {
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_is_zero() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.elapsed(12_345.0), 0.0);
        assert!((clock.elapsed(12_361.0) - 0.016).abs() < 1e-6);
    }

    #[test]
    fn test_large_gap_is_clamped() {
        let mut clock = FrameClock::new();
        clock.elapsed(0.0);
        assert_eq!(clock.elapsed(10_000.0), MAX_FRAME_DT);
        // Clock going backwards never produces negative time
        assert_eq!(clock.elapsed(5_000.0), 0.0);
    }

    #[test]
    fn test_reset_zeroes_baseline() {
        let mut clock = FrameClock::new();
        clock.substeps(0.0);
        clock.substeps(40.0);
        clock.reset();
        assert_eq!(clock.substeps(60_000.0), 0);
        assert_eq!(clock.substeps(60_040.0), 2);
    }

    #[test]
    fn test_substeps_accumulate_remainder() {
        let mut clock = FrameClock::new();
        clock.substeps(0.0);
        let total: u32 = (1..=60).map(|i| clock.substeps(i as f64 * 10.0)).sum();
        // 600ms at 60Hz
        assert!((35..=36).contains(&total));
    }
}
