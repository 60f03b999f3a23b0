//! Data-driven game balance
//!
//! Every gameplay constant lives here so that a partial JSON file can
//! override just the values being tuned. Missing keys keep their defaults.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{FIELD_HEIGHT, FIELD_WIDTH};
use crate::sim::scoring::ScoringMode;

/// Failure loading a tuning file
#[derive(Debug)]
pub enum TuningError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for TuningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TuningError::Io(e) => write!(f, "failed to read tuning file: {e}"),
            TuningError::Parse(e) => write!(f, "failed to parse tuning file: {e}"),
        }
    }
}

impl std::error::Error for TuningError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TuningError::Io(e) => Some(e),
            TuningError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for TuningError {
    fn from(e: std::io::Error) -> Self {
        TuningError::Io(e)
    }
}

impl From<serde_json::Error> for TuningError {
    fn from(e: serde_json::Error) -> Self {
        TuningError::Parse(e)
    }
}

/// Game balance parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Play field ===
    pub field_width: f32,
    pub field_height: f32,
    /// Threats whose lower edge passes `field_height - ground_band` are checked for direct hits
    pub ground_band: f32,

    // === Installations ===
    pub installation_count: u32,
    pub installation_width: f32,
    pub installation_height: f32,
    pub installation_max_health: f32,
    /// Absolute health restored to every installation on level-up
    pub repair_amount: f32,
    /// Launch height above the field bottom
    pub launch_offset: f32,

    // === Difficulty curve ===
    /// Threat speed at level 1 (px/s)
    pub base_speed: f32,
    /// speed(level) = base_speed + speed_log_coeff * log10(level)
    pub speed_log_coeff: f32,
    /// spawn_interval(level) = spawn_numerator_ms / (1 + spawn_log_coeff * log10(level)) + spawn_floor_ms
    pub spawn_numerator_ms: f32,
    pub spawn_log_coeff: f32,
    pub spawn_floor_ms: f32,
    /// max_ammo(level) = base_ammo + floor(ammo_log_coeff * log10(level))
    pub base_ammo: u32,
    pub ammo_log_coeff: f32,
    /// score_threshold(level) = base_score * difficulty_factor(level)
    pub base_score: f32,

    // === Threats ===
    pub standard_health: f32,
    pub heavy_health: f32,
    pub standard_radius: f32,
    pub heavy_radius: f32,
    /// Chance a spawned threat is heavy
    pub heavy_chance: f64,
    pub standard_speed_range: (f32, f32),
    pub heavy_speed_range: (f32, f32),
    /// Direct-hit damage = remaining health * multiplier
    pub standard_impact_multiplier: f32,
    pub heavy_impact_multiplier: f32,

    // === Projectiles ===
    /// Projectile speed = current threat speed * factor
    pub projectile_speed_factor: f32,

    // === Blasts ===
    /// Radial growth rate shared by all blasts (px/s)
    pub blast_expansion_rate: f32,
    pub player_blast_radius: f32,
    pub player_blast_damage: f32,
    pub standard_chain_radius: f32,
    pub standard_chain_damage: f32,
    pub heavy_chain_radius: f32,
    pub heavy_chain_damage: f32,
    /// Installation damage at a heavy chain blast's center = heavy_health * multiplier
    pub heavy_chain_installation_multiplier: f32,
    pub standard_impact_blast_radius: f32,
    pub heavy_impact_blast_radius: f32,

    // === Scoring ===
    pub scoring_mode: ScoringMode,
    pub standard_points: u64,
    pub heavy_points: u64,
    /// Seconds of running time between passive score ticks (0 disables)
    pub passive_score_interval: f32,
    pub low_ammo_threshold: u32,

    // === Pickups ===
    /// Chance a spawn slot produces a pickup instead of a threat
    pub pickup_chance: f64,
    pub pickup_speed: f32,
    pub pickup_radius: f32,
    pub pickup_duration: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            field_width: FIELD_WIDTH,
            field_height: FIELD_HEIGHT,
            ground_band: 50.0,

            installation_count: 3,
            installation_width: 100.0,
            installation_height: 10.0,
            installation_max_health: 10_000.0,
            repair_amount: 2_500.0,
            launch_offset: 20.0,

            base_speed: 60.0,
            speed_log_coeff: 60.0,
            spawn_numerator_ms: 500.0,
            spawn_log_coeff: 2.0,
            spawn_floor_ms: 100.0,
            base_ammo: 20,
            ammo_log_coeff: 1.0,
            base_score: 100.0,

            standard_health: 100.0,
            heavy_health: 500.0,
            standard_radius: FIELD_WIDTH / 500.0,
            heavy_radius: FIELD_WIDTH / 333.0,
            heavy_chance: 0.1,
            standard_speed_range: (0.9, 1.1),
            heavy_speed_range: (0.6, 0.8),
            standard_impact_multiplier: 10.0,
            heavy_impact_multiplier: 20.0,

            projectile_speed_factor: 5.0,

            blast_expansion_rate: 300.0,
            player_blast_radius: 135.0,
            player_blast_damage: 10_000.0,
            standard_chain_radius: 100.0,
            standard_chain_damage: 5_000.0,
            heavy_chain_radius: 120.0,
            heavy_chain_damage: 7_500.0,
            heavy_chain_installation_multiplier: 20.0,
            standard_impact_blast_radius: 75.0,
            heavy_impact_blast_radius: 150.0,

            scoring_mode: ScoringMode::ChainDepth,
            standard_points: 1,
            heavy_points: 5,
            passive_score_interval: 0.5,
            low_ammo_threshold: 10,

            pickup_chance: 0.03,
            pickup_speed: 40.0,
            pickup_radius: 12.0,
            pickup_duration: 10.0,
        }
    }
}

impl Tuning {
    /// Parse tuning overrides from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load tuning overrides from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&text)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
