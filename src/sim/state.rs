//! Game state and core simulation types
//!
//! The tick driver is the only code that adds or removes entries in the
//! master collections held by [`GameState`]. Everything else mutates
//! per-entity fields in place and reports outcomes back.

use std::collections::BTreeSet;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::progression::ProgressionState;
use crate::tuning::Tuning;
use crate::{Rect, safe_direction};

/// Stable entity identifier (monotonically increasing per game)
pub type EntityId = u32;

/// Lifecycle of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for `start_game`
    NotStarted,
    /// Active gameplay
    Running,
    /// Nothing advances
    Paused,
    /// Terminal until restart
    GameOver,
}

/// Threat types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThreatKind {
    #[default]
    Standard,
    /// Slow, tough, and its chain blast hurts installations
    Heavy,
}

impl ThreatKind {
    pub fn max_health(self, tuning: &Tuning) -> f32 {
        match self {
            ThreatKind::Standard => tuning.standard_health,
            ThreatKind::Heavy => tuning.heavy_health,
        }
    }

    pub fn radius(self, tuning: &Tuning) -> f32 {
        match self {
            ThreatKind::Standard => tuning.standard_radius,
            ThreatKind::Heavy => tuning.heavy_radius,
        }
    }

    pub fn base_points(self, tuning: &Tuning) -> u64 {
        match self {
            ThreatKind::Standard => tuning.standard_points,
            ThreatKind::Heavy => tuning.heavy_points,
        }
    }

    /// Multiplier applied to remaining health on a direct installation hit
    pub fn impact_multiplier(self, tuning: &Tuning) -> f32 {
        match self {
            ThreatKind::Standard => tuning.standard_impact_multiplier,
            ThreatKind::Heavy => tuning.heavy_impact_multiplier,
        }
    }

    pub fn speed_range(self, tuning: &Tuning) -> (f32, f32) {
        match self {
            ThreatKind::Standard => tuning.standard_speed_range,
            ThreatKind::Heavy => tuning.heavy_speed_range,
        }
    }
}

/// A descending threat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threat {
    pub id: EntityId,
    pub kind: ThreatKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub health: f32,
    pub max_health: f32,
}

impl Threat {
    /// Create a threat heading from `start` toward `end` at `speed` px/s
    pub fn new(
        id: EntityId,
        kind: ThreatKind,
        start: Vec2,
        end: Vec2,
        speed: f32,
        tuning: &Tuning,
    ) -> Self {
        let max_health = kind.max_health(tuning).max(0.0);
        Self {
            id,
            kind,
            pos: start,
            vel: safe_direction(start, end) * speed,
            radius: kind.radius(tuning),
            health: max_health,
            max_health,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.pos += self.vel * dt;
    }

    /// Subtract damage. Returns true only on the call that destroys the threat.
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        if self.is_destroyed() || !amount.is_finite() || amount <= 0.0 {
            return false;
        }
        self.health = (self.health - amount).clamp(0.0, self.max_health);
        self.is_destroyed()
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.health <= 0.0
    }

    pub fn bounds(&self) -> Rect {
        Rect::around_circle(self.pos, self.radius)
    }
}

/// A player-launched interceptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: EntityId,
    /// Index of the launching installation
    pub installation: usize,
    pub origin: Vec2,
    pub target: Vec2,
    pub pos: Vec2,
    pub speed: f32,
    /// Double blast radius, captured at launch
    pub big_blast: bool,
}

impl Projectile {
    /// Move toward the target. Returns the impact point on the step that arrives.
    pub fn advance(&mut self, dt: f32) -> Option<Vec2> {
        let to_target = self.target - self.pos;
        let distance = to_target.length();
        let step = self.speed * dt;
        if distance <= step {
            self.pos = self.target;
            return Some(self.target);
        }
        self.pos += to_target / distance * step;
        None
    }
}

/// What produced a blast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlastOrigin {
    /// Projectile detonation
    Player,
    /// Secondary blast from a destroyed threat
    Chain(ThreatKind),
    /// Threat striking an installation
    Impact(ThreatKind),
}

/// Parameters for a new blast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlastParams {
    pub origin: BlastOrigin,
    pub max_radius: f32,
    /// Damage to a threat at the blast center
    pub max_damage: f32,
    pub chain_depth: u32,
    pub damages_installations: bool,
    /// Damage to an installation at the blast center
    pub base_damage: f32,
}

impl BlastParams {
    pub fn player(tuning: &Tuning, big_blast: bool) -> Self {
        let scale = if big_blast { 2.0 } else { 1.0 };
        Self {
            origin: BlastOrigin::Player,
            max_radius: tuning.player_blast_radius * scale,
            max_damage: tuning.player_blast_damage,
            chain_depth: 0,
            damages_installations: false,
            base_damage: 0.0,
        }
    }

    /// Secondary blast left behind by a destroyed threat
    pub fn chain(tuning: &Tuning, threat: &Threat, parent_depth: u32) -> Self {
        let chain_depth = parent_depth.saturating_add(1);
        match threat.kind {
            ThreatKind::Standard => Self {
                origin: BlastOrigin::Chain(ThreatKind::Standard),
                max_radius: tuning.standard_chain_radius,
                max_damage: tuning.standard_chain_damage,
                chain_depth,
                damages_installations: false,
                base_damage: 0.0,
            },
            ThreatKind::Heavy => Self {
                origin: BlastOrigin::Chain(ThreatKind::Heavy),
                max_radius: tuning.heavy_chain_radius,
                max_damage: tuning.heavy_chain_damage,
                chain_depth,
                damages_installations: true,
                base_damage: threat.max_health * tuning.heavy_chain_installation_multiplier,
            },
        }
    }

    /// Blast at a direct-hit point, carrying the impact damage to neighbours
    pub fn impact(tuning: &Tuning, kind: ThreatKind, damage: f32) -> Self {
        let max_radius = match kind {
            ThreatKind::Standard => tuning.standard_impact_blast_radius,
            ThreatKind::Heavy => tuning.heavy_impact_blast_radius,
        };
        Self {
            origin: BlastOrigin::Impact(kind),
            max_radius,
            max_damage: tuning.standard_chain_damage,
            chain_depth: 0,
            damages_installations: true,
            base_damage: damage,
        }
    }
}

/// Expanding area-damage effect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blast {
    pub id: EntityId,
    pub center: Vec2,
    pub origin: BlastOrigin,
    pub radius: f32,
    pub max_radius: f32,
    pub elapsed: f32,
    pub duration: f32,
    pub chain_depth: u32,
    pub damages_installations: bool,
    pub max_damage: f32,
    pub base_damage: f32,
    /// Threats already damaged by this blast
    pub hit_threats: BTreeSet<EntityId>,
    /// Installations already damaged by this blast
    pub hit_installations: BTreeSet<usize>,
    /// Kills credited to this blast (combo counter)
    pub kills: u32,
}

impl Blast {
    /// Duration is derived from the shared expansion rate, so every blast
    /// grows at the same px/s regardless of size.
    pub fn new(id: EntityId, center: Vec2, params: BlastParams, expansion_rate: f32) -> Self {
        let max_radius = params.max_radius.max(0.0);
        let duration = if expansion_rate > 0.0 {
            max_radius / expansion_rate
        } else {
            0.0
        };
        Self {
            id,
            center,
            origin: params.origin,
            radius: 0.0,
            max_radius,
            elapsed: 0.0,
            duration,
            chain_depth: params.chain_depth,
            damages_installations: params.damages_installations,
            max_damage: params.max_damage.max(0.0),
            base_damage: params.base_damage.max(0.0),
            hit_threats: BTreeSet::new(),
            hit_installations: BTreeSet::new(),
            kills: 0,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
        self.radius = if self.duration > 0.0 {
            (self.elapsed / self.duration).min(1.0) * self.max_radius
        } else {
            self.max_radius
        };
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn is_player(&self) -> bool {
        self.origin == BlastOrigin::Player
    }

    pub fn bounds(&self) -> Rect {
        Rect::around_circle(self.center, self.radius)
    }
}

/// A ground installation (silo)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
    pub index: usize,
    pub rect: Rect,
    pub launch_point: Vec2,
    pub health: f32,
    pub max_health: f32,
    /// Remaining launches
    pub ammo: u32,
    pub destroyed: bool,
}

impl Installation {
    pub fn new(index: usize, rect: Rect, launch_point: Vec2, max_health: f32, ammo: u32) -> Self {
        let max_health = max_health.max(0.0);
        Self {
            index,
            rect,
            launch_point,
            health: max_health,
            max_health,
            ammo,
            destroyed: max_health <= 0.0,
        }
    }

    /// Standard layout: `count` installations evenly spread along the bottom edge
    pub fn layout(tuning: &Tuning, ammo: u32) -> Vec<Self> {
        let count = tuning.installation_count.max(1);
        let h = tuning.installation_height;
        (0..count)
            .map(|i| {
                let cx = tuning.field_width * (2 * i + 1) as f32 / (2 * count) as f32;
                let rect = Rect::from_xywh(
                    cx - tuning.installation_width / 2.0,
                    tuning.field_height - 2.0 * h,
                    tuning.installation_width,
                    h,
                );
                let launch = Vec2::new(cx, tuning.field_height - tuning.launch_offset);
                Installation::new(i as usize, rect, launch, tuning.installation_max_health, ammo)
            })
            .collect()
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        self.rect.center().x
    }

    pub fn can_launch(&self) -> bool {
        !self.destroyed && self.ammo > 0
    }

    /// Apply damage. Returns true only on the call that destroys it.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.destroyed || !amount.is_finite() || amount <= 0.0 {
            return false;
        }
        self.health = (self.health - amount).clamp(0.0, self.max_health);
        if self.health <= 0.0 {
            self.destroyed = true;
            log::info!("Installation {} destroyed", self.index);
            return true;
        }
        false
    }

    /// Restore a fixed amount of health, reviving a destroyed installation
    pub fn repair(&mut self, amount: f32) {
        if !amount.is_finite() || amount <= 0.0 || self.health >= self.max_health {
            return;
        }
        self.health = (self.health + amount).min(self.max_health);
        if self.destroyed && self.health > 0.0 {
            self.destroyed = false;
            log::info!("Installation {} back online", self.index);
        }
    }

    pub fn refill(&mut self, max_ammo: u32) {
        self.ammo = max_ammo;
    }

    pub fn reset(&mut self, max_ammo: u32) {
        self.health = self.max_health;
        self.destroyed = self.max_health <= 0.0;
        self.ammo = max_ammo;
    }
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    /// Player blasts launched while active have double radius
    BigBlast,
    /// Threats move at half speed
    SlowThreats,
    /// Launches don't consume ammo
    FreeFire,
}

impl PickupKind {
    pub const ALL: [PickupKind; 3] = [
        PickupKind::BigBlast,
        PickupKind::SlowThreats,
        PickupKind::FreeFire,
    ];
}

/// A pickup entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub id: EntityId,
    pub kind: PickupKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
}

impl Pickup {
    pub fn advance(&mut self, dt: f32) {
        self.pos += self.vel * dt;
    }
}

/// Active power-up timers (simulated seconds remaining)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveEffects {
    pub big_blast: f32,
    pub slow_threats: f32,
    pub free_fire: f32,
}

impl ActiveEffects {
    pub fn activate(&mut self, kind: PickupKind, duration: f32) {
        let slot = self.slot_mut(kind);
        *slot = slot.max(duration);
    }

    pub fn is_active(&self, kind: PickupKind) -> bool {
        match kind {
            PickupKind::BigBlast => self.big_blast > 0.0,
            PickupKind::SlowThreats => self.slow_threats > 0.0,
            PickupKind::FreeFire => self.free_fire > 0.0,
        }
    }

    pub fn tick(&mut self, dt: f32) {
        for kind in PickupKind::ALL {
            let slot = self.slot_mut(kind);
            *slot = (*slot - dt).max(0.0);
        }
    }

    fn slot_mut(&mut self, kind: PickupKind) -> &mut f32 {
        match kind {
            PickupKind::BigBlast => &mut self.big_blast,
            PickupKind::SlowThreats => &mut self.slow_threats,
            PickupKind::FreeFire => &mut self.free_fire,
        }
    }
}

/// Notifications for audio/visual collaborators, drained by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    ProjectileLaunched { id: EntityId, installation: usize, target: Vec2 },
    BlastSpawned { id: EntityId, center: Vec2, origin: BlastOrigin, chain_depth: u32 },
    ThreatDestroyed { id: EntityId, kind: ThreatKind, pos: Vec2, points: u64, chain_depth: u32 },
    ThreatEscaped { id: EntityId },
    InstallationHit { installation: usize, damage: f32 },
    InstallationDestroyed { installation: usize },
    PickupCollected { kind: PickupKind },
    LevelUp { level: u32 },
    GameOver { score: u64, level: u32 },
}

/// Per-run counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub kills: u32,
    pub projectiles_fired: u32,
    pub threats_escaped: u32,
    pub direct_hits: u32,
}

impl RunStats {
    /// Kills per projectile fired, 0 when nothing was fired
    pub fn kill_ratio(&self) -> f32 {
        if self.projectiles_fired == 0 {
            0.0
        } else {
            self.kills as f32 / self.projectiles_fired as f32
        }
    }
}

/// Values the HUD collaborator displays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hud {
    pub score: u64,
    pub level: u32,
    pub kills: u32,
    pub projectiles_fired: u32,
    pub kill_ratio: f32,
    pub next_level_in: u64,
    pub level_progress: f32,
    /// Per installation, 0 while destroyed
    pub ammo: Vec<u32>,
    pub max_ammo: u32,
    pub low_ammo_warning: bool,
    pub installation_down_warning: bool,
}

/// Read-only view of the world for presentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub phase: GamePhase,
    pub time: f64,
    pub hud: Hud,
    pub installations: Vec<Installation>,
    pub threats: Vec<Threat>,
    pub projectiles: Vec<Projectile>,
    pub blasts: Vec<Blast>,
    pub pickups: Vec<Pickup>,
    pub effects: ActiveEffects,
}

/// Complete game state (deterministic for a given seed and input sequence)
#[derive(Debug, Clone)]
pub struct GameState {
    pub seed: u64,
    pub tuning: Tuning,
    pub rng: Pcg32,
    pub phase: GamePhase,
    pub progression: ProgressionState,
    /// Simulated running time (seconds)
    pub time: f64,
    /// Milliseconds accumulated toward the next spawn
    pub spawn_timer_ms: f32,
    /// Seconds accumulated toward the next passive score tick
    pub passive_timer: f32,
    /// Seconds until the autopilot may fire again
    pub autopilot_cooldown: f32,
    pub installations: Vec<Installation>,
    /// Active threats (sorted by id for determinism)
    pub threats: Vec<Threat>,
    pub projectiles: Vec<Projectile>,
    pub blasts: Vec<Blast>,
    pub pickups: Vec<Pickup>,
    pub effects: ActiveEffects,
    pub stats: RunStats,
    pub events: Vec<GameEvent>,
    next_id: EntityId,
}

impl GameState {
    /// Create a game waiting to be started
    pub fn new(seed: u64, tuning: Tuning) -> Self {
        let progression = ProgressionState::new(1, &tuning);
        let installations = Installation::layout(&tuning, progression.max_ammo);
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase: GamePhase::NotStarted,
            progression,
            time: 0.0,
            spawn_timer_ms: 0.0,
            passive_timer: 0.0,
            autopilot_cooldown: 0.0,
            installations,
            threats: Vec::new(),
            projectiles: Vec::new(),
            blasts: Vec::new(),
            pickups: Vec::new(),
            effects: ActiveEffects::default(),
            stats: RunStats::default(),
            events: Vec::new(),
            next_id: 1,
            tuning,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn clear_world(&mut self) {
        self.threats.clear();
        self.projectiles.clear();
        self.blasts.clear();
        self.pickups.clear();
        self.events.clear();
        self.effects = ActiveEffects::default();
        self.stats = RunStats::default();
        self.time = 0.0;
        self.passive_timer = 0.0;
        self.autopilot_cooldown = 0.0;
        self.next_id = 1;
    }

    /// (Re)start at the chosen level with default collections
    pub fn start_game(&mut self, starting_level: u32) {
        self.clear_world();
        self.progression = ProgressionState::new(starting_level, &self.tuning);
        self.installations = Installation::layout(&self.tuning, self.progression.max_ammo);
        // First threat arrives on the first tick
        self.spawn_timer_ms = self.progression.spawn_interval_ms;
        self.phase = GamePhase::Running;
        log::info!(
            "Game started: seed={}, level={}, threshold={}",
            self.seed,
            self.progression.level,
            self.progression.threshold
        );
    }

    /// Toggle Running/Paused. Other phases are left alone.
    pub fn pause_toggle(&mut self) -> GamePhase {
        self.phase = match self.phase {
            GamePhase::Running => GamePhase::Paused,
            GamePhase::Paused => GamePhase::Running,
            other => other,
        };
        log::debug!("Phase now {:?}", self.phase);
        self.phase
    }

    /// Back to the pre-start state
    pub fn reset_game(&mut self) {
        self.clear_world();
        self.progression = ProgressionState::new(1, &self.tuning);
        self.installations = Installation::layout(&self.tuning, self.progression.max_ammo);
        self.spawn_timer_ms = 0.0;
        self.phase = GamePhase::NotStarted;
        log::info!("Game reset");
    }

    /// Fire from the nearest installation that can launch.
    ///
    /// Ignored unless running; ties go to the first installation in
    /// left-to-right order. Returns the new projectile's id.
    pub fn request_launch(&mut self, target: Vec2) -> Option<EntityId> {
        if self.phase != GamePhase::Running || !target.is_finite() {
            return None;
        }

        let mut best: Option<(usize, f32)> = None;
        for (i, inst) in self.installations.iter().enumerate() {
            if !inst.can_launch() {
                continue;
            }
            let d = (target.x - inst.center_x()).abs();
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        let (index, _) = best?;

        let free_fire = self.effects.is_active(PickupKind::FreeFire);
        let big_blast = self.effects.is_active(PickupKind::BigBlast);
        let speed = self.progression.speed * self.tuning.projectile_speed_factor;
        let id = self.next_entity_id();
        let inst = &mut self.installations[index];
        if !free_fire {
            inst.ammo -= 1;
        }
        let origin = inst.launch_point;

        self.projectiles.push(Projectile {
            id,
            installation: index,
            origin,
            target,
            pos: origin,
            speed,
            big_blast,
        });
        self.stats.projectiles_fired += 1;
        self.events.push(GameEvent::ProjectileLaunched {
            id,
            installation: index,
            target,
        });
        Some(id)
    }

    /// Insert a blast into the master collection
    pub fn spawn_blast(&mut self, center: Vec2, params: BlastParams) -> EntityId {
        let id = self.next_entity_id();
        let blast = Blast::new(id, center, params, self.tuning.blast_expansion_rate);
        self.events.push(GameEvent::BlastSpawned {
            id,
            center,
            origin: params.origin,
            chain_depth: params.chain_depth,
        });
        self.blasts.push(blast);
        id
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Total launches left across operational installations
    pub fn total_ammo(&self) -> u32 {
        self.installations
            .iter()
            .filter(|i| !i.destroyed)
            .map(|i| i.ammo)
            .sum()
    }

    pub fn hud(&self) -> Hud {
        let operational = self.installations.iter().filter(|i| !i.destroyed).count();
        let destroyed = self.installations.len() - operational;
        Hud {
            score: self.progression.score,
            level: self.progression.level,
            kills: self.stats.kills,
            projectiles_fired: self.stats.projectiles_fired,
            kill_ratio: self.stats.kill_ratio(),
            next_level_in: self.progression.score_to_next_level(),
            level_progress: self.progression.level_progress(),
            ammo: self
                .installations
                .iter()
                .map(|i| if i.destroyed { 0 } else { i.ammo })
                .collect(),
            max_ammo: self.progression.max_ammo,
            low_ammo_warning: operational > 0
                && self.total_ammo() <= self.tuning.low_ammo_threshold,
            installation_down_warning: destroyed > 0 && destroyed < self.installations.len(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            time: self.time,
            hud: self.hud(),
            installations: self.installations.clone(),
            threats: self.threats.clone(),
            projectiles: self.projectiles.clone(),
            blasts: self.blasts.clone(),
            pickups: self.pickups.clone(),
            effects: self.effects.clone(),
        }
    }

    /// Ensure collections are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.threats.sort_by_key(|t| t.id);
        self.projectiles.sort_by_key(|p| p.id);
        self.blasts.sort_by_key(|b| b.id);
        self.pickups.sort_by_key(|p| p.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn running_state() -> GameState {
        let mut state = GameState::new(7, Tuning::default());
        state.start_game(1);
        state
    }

    #[test]
    fn test_layout_matches_field() {
        let tuning = Tuning::default();
        let inst = Installation::layout(&tuning, 20);
        assert_eq!(inst.len(), 3);
        assert!((inst[0].center_x() - 1280.0 / 6.0).abs() < 1e-3);
        assert!((inst[1].center_x() - 640.0).abs() < 1e-3);
        assert!((inst[2].center_x() - 1280.0 * 5.0 / 6.0).abs() < 1e-3);
        assert_eq!(inst[1].rect, Rect::from_xywh(590.0, 700.0, 100.0, 10.0));
        assert_eq!(inst[1].launch_point, Vec2::new(640.0, 700.0));
    }

    #[test]
    fn test_threat_damage_is_one_way() {
        let tuning = Tuning::default();
        let mut threat = Threat::new(1, ThreatKind::Standard, Vec2::ZERO, Vec2::Y, 60.0, &tuning);
        assert!(!threat.apply_damage(40.0));
        assert!(threat.apply_damage(100.0));
        assert_eq!(threat.health, 0.0);
        assert!(!threat.apply_damage(10.0), "destroy reported once");
        assert!(!threat.apply_damage(f32::NAN));
        assert_eq!(threat.health, 0.0);
    }

    #[test]
    fn test_threat_zero_length_direction_falls_back() {
        let tuning = Tuning::default();
        let p = Vec2::new(100.0, 1.0);
        let threat = Threat::new(1, ThreatKind::Heavy, p, p, 60.0, &tuning);
        assert_eq!(threat.vel, Vec2::new(0.0, 60.0));
        assert_eq!(threat.max_health, 500.0);
    }

    #[test]
    fn test_projectile_lands_exactly_on_target() {
        let mut p = Projectile {
            id: 1,
            installation: 0,
            origin: Vec2::new(0.0, 100.0),
            target: Vec2::new(0.0, 0.0),
            pos: Vec2::new(0.0, 100.0),
            speed: 300.0,
            big_blast: false,
        };
        let mut landed = None;
        for _ in 0..30 {
            if let Some(point) = p.advance(1.0 / 60.0) {
                landed = Some(point);
                break;
            }
            assert!(p.pos.y > 0.0, "never overshoots");
        }
        assert_eq!(landed, Some(Vec2::ZERO));
        assert_eq!(p.pos, Vec2::ZERO);
    }

    #[test]
    fn test_blast_grows_at_shared_rate() {
        let tuning = Tuning::default();
        let mut small = Blast::new(1, Vec2::ZERO, BlastParams::player(&tuning, false), 300.0);
        let mut big = Blast::new(2, Vec2::ZERO, BlastParams::player(&tuning, true), 300.0);
        small.advance(0.1);
        big.advance(0.1);
        assert!((small.radius - 30.0).abs() < 1e-3);
        assert!((big.radius - 30.0).abs() < 1e-3);
        assert!((big.duration - 2.0 * small.duration).abs() < 1e-5);

        small.advance(10.0);
        assert_eq!(small.radius, small.max_radius);
        assert!(small.is_finished());
    }

    #[test]
    fn test_installation_repair_revives() {
        let tuning = Tuning::default();
        let mut inst = Installation::layout(&tuning, 20).remove(0);
        assert!(inst.take_damage(1e9));
        assert!(inst.destroyed);
        assert!(!inst.take_damage(10.0));
        inst.repair(2500.0);
        assert!(!inst.destroyed);
        assert_eq!(inst.health, 2500.0);
        inst.repair(1e9);
        assert_eq!(inst.health, inst.max_health);
    }

    #[test]
    fn test_launch_uses_nearest_installation() {
        let mut state = running_state();
        let id = state.request_launch(Vec2::new(1200.0, 100.0)).unwrap();
        let p = state.projectiles.iter().find(|p| p.id == id).unwrap();
        assert_eq!(p.installation, 2);
        assert_eq!(state.installations[2].ammo, state.progression.max_ammo - 1);
        assert_eq!(state.stats.projectiles_fired, 1);
    }

    #[test]
    fn test_launch_tie_goes_to_first() {
        let mut state = running_state();
        state.installations = [100.0, 300.0]
            .iter()
            .enumerate()
            .map(|(i, &cx)| {
                Installation::new(
                    i,
                    Rect::from_xywh(cx - 50.0, 700.0, 100.0, 10.0),
                    Vec2::new(cx, 700.0),
                    10_000.0,
                    20,
                )
            })
            .collect();
        let id = state.request_launch(Vec2::new(200.0, 100.0)).unwrap();
        assert_eq!(state.projectiles.iter().find(|p| p.id == id).unwrap().installation, 0);
    }

    #[test]
    fn test_launch_skips_empty_and_destroyed() {
        let mut state = running_state();
        state.installations[2].ammo = 0;
        state.installations[1].take_damage(1e9);
        let id = state.request_launch(Vec2::new(1200.0, 100.0)).unwrap();
        assert_eq!(state.projectiles.iter().find(|p| p.id == id).unwrap().installation, 0);
    }

    #[test]
    fn test_launch_without_eligible_installation_is_noop() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, tuning.clone());
        state.start_game(1);
        state.installations = vec![Installation::new(
            0,
            Rect::from_xywh(490.0, 700.0, 100.0, 10.0),
            Vec2::new(540.0, 700.0),
            tuning.installation_max_health,
            0,
        )];
        let before = state.projectiles.len();
        assert_eq!(state.request_launch(Vec2::new(540.0, 100.0)), None);
        assert_eq!(state.projectiles.len(), before);
        assert_eq!(state.stats.projectiles_fired, 0);
    }

    #[test]
    fn test_launch_ignored_unless_running() {
        let mut state = GameState::new(1, Tuning::default());
        assert_eq!(state.request_launch(Vec2::new(100.0, 100.0)), None);
        state.start_game(1);
        state.pause_toggle();
        assert_eq!(state.request_launch(Vec2::new(100.0, 100.0)), None);
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn test_free_fire_and_big_blast_captured_at_launch() {
        let mut state = running_state();
        state.effects.activate(PickupKind::FreeFire, 5.0);
        state.effects.activate(PickupKind::BigBlast, 5.0);
        let ammo = state.installations[1].ammo;
        state.request_launch(Vec2::new(640.0, 100.0)).unwrap();
        assert_eq!(state.installations[1].ammo, ammo);
        assert!(state.projectiles[0].big_blast);

        state.effects.tick(10.0);
        assert!(!state.effects.is_active(PickupKind::BigBlast));
        assert!(state.projectiles[0].big_blast, "tag survives effect expiry");
    }

    #[test]
    fn test_pause_toggle_only_affects_running() {
        let mut state = GameState::new(1, Tuning::default());
        assert_eq!(state.pause_toggle(), GamePhase::NotStarted);
        state.start_game(1);
        assert_eq!(state.pause_toggle(), GamePhase::Paused);
        assert_eq!(state.pause_toggle(), GamePhase::Running);
        state.phase = GamePhase::GameOver;
        assert_eq!(state.pause_toggle(), GamePhase::GameOver);
    }

    #[test]
    fn test_hud_warnings() {
        let mut state = running_state();
        assert!(!state.hud().low_ammo_warning);
        assert!(!state.hud().installation_down_warning);
        state.installations[0].take_damage(1e9);
        for inst in &mut state.installations {
            inst.ammo = 3;
        }
        let hud = state.hud();
        assert!(hud.installation_down_warning);
        assert!(hud.low_ammo_warning);
    }

    #[test]
    fn test_hud_ammo_hides_destroyed_installations() {
        let mut state = running_state();
        state.installations[1].take_damage(1e9);
        assert_eq!(state.installations[1].ammo, 20);
        assert_eq!(state.hud().ammo, vec![20, 0, 20]);
        assert_eq!(state.total_ammo(), 40);

        // A repaired installation shows its ammo again
        state.installations[1].repair(2500.0);
        assert_eq!(state.hud().ammo, vec![20, 20, 20]);
    }

    proptest! {
        #[test]
        fn prop_threat_health_stays_clamped(hits in prop::collection::vec(-1e4f32..1e5, 0..20)) {
            let tuning = Tuning::default();
            let mut threat = Threat::new(1, ThreatKind::Heavy, Vec2::ZERO, Vec2::Y, 60.0, &tuning);
            let mut destroyed_reports = 0;
            for h in hits {
                if threat.apply_damage(h) {
                    destroyed_reports += 1;
                }
                prop_assert!(threat.health >= 0.0 && threat.health <= threat.max_health);
            }
            prop_assert!(destroyed_reports <= 1);
        }

        #[test]
        fn prop_installation_health_stays_clamped(
            ops in prop::collection::vec((any::<bool>(), 0.0f32..20_000.0), 0..30)
        ) {
            let tuning = Tuning::default();
            let mut inst = Installation::layout(&tuning, 20).remove(0);
            for (damage, amount) in ops {
                if damage { inst.take_damage(amount); } else { inst.repair(amount); }
                prop_assert!(inst.health >= 0.0 && inst.health <= inst.max_health);
                prop_assert_eq!(inst.destroyed, inst.health <= 0.0);
            }
        }
    }
}
