//! Fixed timestep simulation tick
//!
//! Stages run in a fixed order because each reads what the previous wrote:
//! spawn scheduling, motion, direct impacts and escapes, blast resolution,
//! scoring and level-up, then the terminal check.

use glam::Vec2;
use rand::Rng;

use super::collision::{self, BlastOutcome, DirectImpact};
use super::state::{
    BlastParams, GameEvent, GamePhase, GameState, Pickup, PickupKind, Threat, ThreatKind,
};
use crate::Rect;
use crate::consts::MAX_FRAME_DT;

/// Seconds between autopilot launches
const AUTOPILOT_INTERVAL: f32 = 0.6;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Launch requests (target points) applied before the world advances
    pub launches: Vec<Vec2>,
    /// Pause toggle. The toggling step itself simulates no time.
    pub pause: bool,
    /// Demo mode - fire at the most urgent threat automatically
    pub autopilot: bool,
}

/// Advance the game state by one step of `dt` seconds
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.pause {
        state.pause_toggle();
        return;
    }

    // Don't tick unless running
    if state.phase != GamePhase::Running {
        return;
    }

    let dt = if dt.is_finite() {
        dt.clamp(0.0, MAX_FRAME_DT)
    } else {
        0.0
    };

    for &target in &input.launches {
        state.request_launch(target);
    }
    if input.autopilot {
        run_autopilot(state, dt);
    }

    state.time += f64::from(dt);
    state.effects.tick(dt);

    schedule_spawns(state, dt);
    advance_entities(state, dt);
    apply_direct_impacts(state);
    cull_out_of_bounds(state);

    let index = collision::build_threat_index(&state.threats, field_rect(state));
    let outcome = collision::resolve_blasts(
        &mut state.blasts,
        &mut state.threats,
        &mut state.installations,
        &state.pickups,
        &index,
        &state.tuning,
    );
    apply_blast_outcome(state, outcome);
    state.blasts.retain(|b| !b.is_finished());

    award_passive_score(state, dt);
    if state
        .progression
        .check_level_up(&state.tuning, &mut state.installations)
    {
        state.events.push(GameEvent::LevelUp {
            level: state.progression.level,
        });
    }

    if is_terminal(state) {
        state.phase = GamePhase::GameOver;
        state.events.push(GameEvent::GameOver {
            score: state.progression.score,
            level: state.progression.level,
        });
        log::info!(
            "Game over: score={}, level={}, kills={}, fired={}",
            state.progression.score,
            state.progression.level,
            state.stats.kills,
            state.stats.projectiles_fired
        );
    }

    // Ensure deterministic ordering
    state.normalize_order();
}

fn field_rect(state: &GameState) -> Rect {
    Rect::from_xywh(0.0, 0.0, state.tuning.field_width, state.tuning.field_height)
}

/// No way back: every installation gone, or nothing left to fire while
/// threats remain and no projectile or blast can still change that.
pub fn is_terminal(state: &GameState) -> bool {
    let all_destroyed = state.installations.iter().all(|i| i.destroyed);
    let no_launches_left = state
        .installations
        .iter()
        .all(|i| i.destroyed || i.ammo == 0);

    all_destroyed
        || (no_launches_left
            && state.projectiles.is_empty()
            && state.blasts.is_empty()
            && !state.threats.is_empty())
}

/// Uniform sample that tolerates empty or inverted ranges
fn sample_range(rng: &mut impl Rng, lo: f32, hi: f32) -> f32 {
    if hi > lo { rng.random_range(lo..hi) } else { lo }
}

fn schedule_spawns(state: &mut GameState, dt: f32) {
    let interval = state.progression.spawn_interval_ms.max(1.0);
    state.spawn_timer_ms += dt * 1000.0;
    while state.spawn_timer_ms >= interval {
        state.spawn_timer_ms -= interval;
        if state.rng.random_bool(state.tuning.pickup_chance.clamp(0.0, 1.0)) {
            spawn_pickup(state);
        } else {
            spawn_threat(state);
        }
    }
}

fn spawn_threat(state: &mut GameState) {
    let width = state.tuning.field_width;
    let height = state.tuning.field_height;
    let start_x = sample_range(&mut state.rng, 10.0, width - 10.0);
    let end_x = sample_range(&mut state.rng, 0.0, width);
    let kind = if state.rng.random_bool(state.tuning.heavy_chance.clamp(0.0, 1.0)) {
        ThreatKind::Heavy
    } else {
        ThreatKind::Standard
    };
    let (lo, hi) = kind.speed_range(&state.tuning);
    let speed = state.progression.speed * sample_range(&mut state.rng, lo, hi);

    let id = state.next_entity_id();
    let threat = Threat::new(
        id,
        kind,
        Vec2::new(start_x, 1.0),
        Vec2::new(end_x, height),
        speed,
        &state.tuning,
    );
    log::trace!("spawned {:?} threat {} at x={:.0}", kind, id, start_x);
    state.threats.push(threat);
}

fn spawn_pickup(state: &mut GameState) {
    let radius = state.tuning.pickup_radius;
    let x = sample_range(&mut state.rng, radius, state.tuning.field_width - radius);
    let kind = PickupKind::ALL[state.rng.random_range(0..PickupKind::ALL.len())];
    let id = state.next_entity_id();
    state.pickups.push(Pickup {
        id,
        kind,
        pos: Vec2::new(x, 1.0),
        vel: Vec2::new(0.0, state.tuning.pickup_speed),
        radius,
    });
    log::debug!("spawned {:?} pickup {}", kind, id);
}

fn advance_entities(state: &mut GameState, dt: f32) {
    let threat_dt = if state.effects.is_active(PickupKind::SlowThreats) {
        dt * 0.5
    } else {
        dt
    };
    for threat in &mut state.threats {
        threat.advance(threat_dt);
    }
    for pickup in &mut state.pickups {
        pickup.advance(dt);
    }
    // Growth happens before new detonations so fresh blasts start at radius 0
    for blast in &mut state.blasts {
        blast.advance(dt);
    }

    let mut detonations = Vec::new();
    state.projectiles.retain_mut(|p| match p.advance(dt) {
        Some(point) => {
            detonations.push((point, p.big_blast));
            false
        }
        None => true,
    });
    for (point, big_blast) in detonations {
        let params = BlastParams::player(&state.tuning, big_blast);
        state.spawn_blast(point, params);
    }
}

fn apply_direct_impacts(state: &mut GameState) {
    let impacts: Vec<DirectImpact> =
        collision::resolve_direct_impacts(&state.threats, &mut state.installations, &state.tuning);
    if impacts.is_empty() {
        return;
    }

    state
        .threats
        .retain(|t| !impacts.iter().any(|i| i.threat_id == t.id));

    for impact in impacts {
        state.stats.direct_hits += 1;
        state.events.push(GameEvent::InstallationHit {
            installation: impact.installation,
            damage: impact.damage,
        });
        if impact.destroyed {
            state.events.push(GameEvent::InstallationDestroyed {
                installation: impact.installation,
            });
        }
        let params = BlastParams::impact(&state.tuning, impact.kind, impact.damage);
        let id = state.spawn_blast(impact.pos, params);
        // The struck installation already took the direct hit
        if let Some(blast) = state.blasts.iter_mut().find(|b| b.id == id) {
            blast.hit_installations.insert(impact.installation);
        }
    }
}

fn cull_out_of_bounds(state: &mut GameState) {
    let height = state.tuning.field_height;
    let mut escaped = Vec::new();
    state.threats.retain(|t| {
        if collision::has_escaped(t, height) {
            escaped.push(t.id);
            false
        } else {
            true
        }
    });
    for id in escaped {
        state.stats.threats_escaped += 1;
        state.events.push(GameEvent::ThreatEscaped { id });
    }
    state.pickups.retain(|p| p.pos.y - p.radius <= height);
}

fn apply_blast_outcome(state: &mut GameState, outcome: BlastOutcome) {
    for kill in &outcome.kills {
        state.progression.award(kill.points);
        state.stats.kills += 1;
        state.events.push(GameEvent::ThreatDestroyed {
            id: kill.threat_id,
            kind: kill.kind,
            pos: kill.pos,
            points: kill.points,
            chain_depth: kill.chain_depth,
        });
    }
    state.threats.retain(|t| !t.is_destroyed());

    for (center, params) in outcome.chain_blasts {
        state.spawn_blast(center, params);
    }

    for hit in outcome.installation_hits {
        state.events.push(GameEvent::InstallationHit {
            installation: hit.installation,
            damage: hit.damage,
        });
        if hit.destroyed {
            state.events.push(GameEvent::InstallationDestroyed {
                installation: hit.installation,
            });
        }
    }

    if !outcome.pickups_collected.is_empty() {
        let duration = state.tuning.pickup_duration;
        let mut collected = Vec::new();
        state.pickups.retain(|p| {
            if outcome.pickups_collected.contains(&p.id) {
                collected.push(p.kind);
                false
            } else {
                true
            }
        });
        for kind in collected {
            state.effects.activate(kind, duration);
            state.events.push(GameEvent::PickupCollected { kind });
            log::info!("Pickup collected: {:?}", kind);
        }
    }
}

fn award_passive_score(state: &mut GameState, dt: f32) {
    let interval = state.tuning.passive_score_interval;
    if interval <= 0.0 {
        return;
    }
    state.passive_timer += dt;
    while state.passive_timer >= interval {
        state.passive_timer -= interval;
        let standing = state.installations.iter().filter(|i| !i.destroyed).count();
        state.progression.award(standing as u64);
    }
}

/// Point the autopilot would fire at: where the lowest threat will be when
/// an interceptor from its nearest installation arrives.
pub fn autopilot_target(state: &GameState) -> Option<Vec2> {
    let threat = state
        .threats
        .iter()
        .filter(|t| !t.is_destroyed())
        .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))?;
    let launcher = state
        .installations
        .iter()
        .filter(|i| i.can_launch())
        .min_by(|a, b| {
            (a.center_x() - threat.pos.x)
                .abs()
                .total_cmp(&(b.center_x() - threat.pos.x).abs())
        })?;

    let projectile_speed = state.progression.speed * state.tuning.projectile_speed_factor;
    if projectile_speed <= 0.0 {
        return Some(threat.pos);
    }
    let flight = launcher.launch_point.distance(threat.pos) / projectile_speed;
    Some(threat.pos + threat.vel * flight)
}

fn run_autopilot(state: &mut GameState, dt: f32) {
    state.autopilot_cooldown = (state.autopilot_cooldown - dt).max(0.0);
    if state.autopilot_cooldown > 0.0 {
        return;
    }
    // Hold fire while a player blast is still working
    if state.blasts.iter().any(|b| b.is_player()) || !state.projectiles.is_empty() {
        return;
    }
    if let Some(target) = autopilot_target(state) {
        if state.request_launch(target).is_some() {
            state.autopilot_cooldown = AUTOPILOT_INTERVAL;
        }
    }
}
