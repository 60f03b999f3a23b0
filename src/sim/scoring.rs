//! Kill scoring strategies
//!
//! Two ways of rewarding cascades, selectable through [`ScoringMode`]:
//! exponential by chain depth, or a combo counter per blast that rewards
//! multi-kills from a single detonation.

use serde::{Deserialize, Serialize};

/// What the scorer knows about a kill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillContext {
    /// Base points for the threat kind
    pub base_points: u64,
    /// Chain depth of the blast that made the kill
    pub chain_depth: u32,
    /// 1 for the blast's first kill, 2 for the second, ...
    pub combo_index: u32,
}

/// Scoring strategy interface
pub trait ScoringStrategy {
    fn points(&self, kill: &KillContext) -> u64;
}

/// `base * 2^chain_depth`
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainDepthScoring;

impl ScoringStrategy for ChainDepthScoring {
    fn points(&self, kill: &KillContext) -> u64 {
        let multiplier = 1u64.checked_shl(kill.chain_depth).unwrap_or(u64::MAX);
        kill.base_points.saturating_mul(multiplier)
    }
}

/// `base * combo_index`
#[derive(Debug, Clone, Copy, Default)]
pub struct ComboScoring;

impl ScoringStrategy for ComboScoring {
    fn points(&self, kill: &KillContext) -> u64 {
        kill.base_points.saturating_mul(u64::from(kill.combo_index.max(1)))
    }
}

/// Configured scoring strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScoringMode {
    #[default]
    ChainDepth,
    Combo,
}

impl ScoringMode {
    pub fn strategy(self) -> &'static dyn ScoringStrategy {
        match self {
            ScoringMode::ChainDepth => &ChainDepthScoring,
            ScoringMode::Combo => &ComboScoring,
        }
    }

    pub fn points(self, kill: &KillContext) -> u64 {
        self.strategy().points(kill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kill(base_points: u64, chain_depth: u32, combo_index: u32) -> KillContext {
        KillContext {
            base_points,
            chain_depth,
            combo_index,
        }
    }

    #[test]
    fn test_chain_depth_doubles_per_generation() {
        let mode = ScoringMode::ChainDepth;
        assert_eq!(mode.points(&kill(1, 0, 1)), 1);
        assert_eq!(mode.points(&kill(1, 2, 1)), 4);
        assert_eq!(mode.points(&kill(5, 3, 7)), 40);
    }

    #[test]
    fn test_chain_depth_saturates() {
        assert_eq!(ScoringMode::ChainDepth.points(&kill(3, 200, 1)), u64::MAX);
    }

    #[test]
    fn test_combo_counts_kills_in_one_blast() {
        let mode = ScoringMode::Combo;
        assert_eq!(mode.points(&kill(1, 4, 1)), 1);
        assert_eq!(mode.points(&kill(1, 4, 3)), 3);
        assert_eq!(mode.points(&kill(5, 0, 2)), 10);
        assert_eq!(mode.points(&kill(5, 0, 0)), 5);
    }
}
