//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod clock;
pub mod collision;
pub mod progression;
pub mod quadtree;
pub mod scoring;
pub mod state;
pub mod tick;

pub use clock::FrameClock;
pub use collision::{BlastOutcome, DirectImpact, blast_damage, falloff};
pub use progression::ProgressionState;
pub use quadtree::Quadtree;
pub use scoring::{ChainDepthScoring, ComboScoring, KillContext, ScoringMode, ScoringStrategy};
pub use state::{
    ActiveEffects, Blast, BlastOrigin, BlastParams, EntityId, GameEvent, GamePhase, GameState,
    Hud, Installation, Pickup, PickupKind, Projectile, RunStats, Snapshot, Threat, ThreatKind,
};
pub use tick::{TickInput, autopilot_target, is_terminal, tick};
