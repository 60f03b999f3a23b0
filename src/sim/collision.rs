//! Collision detection and damage resolution
//!
//! Blasts damage threats with a squared falloff measured against the blast's
//! full extent, so a hit at the center deals full damage and a hit at the
//! edge deals none no matter how far the blast has grown. Each blast damages
//! a given threat or installation at most once.
//!
//! The resolver only mutates entity fields. Removals and new blasts are
//! reported back to the tick driver, which owns the collections.

use glam::Vec2;

use super::quadtree::Quadtree;
use super::scoring::KillContext;
use super::state::{Blast, BlastParams, EntityId, Installation, Pickup, Threat, ThreatKind};
use crate::Rect;
use crate::tuning::Tuning;

/// Squared linear falloff: 1 at distance 0, 0 at or beyond `extent`
#[inline]
pub fn falloff(distance: f32, extent: f32) -> f32 {
    if extent <= 0.0 || !distance.is_finite() {
        return 0.0;
    }
    let t = (1.0 - distance.max(0.0) / extent).max(0.0);
    t * t
}

/// Damage dealt at `distance` by a blast peaking at `max_damage`
#[inline]
pub fn blast_damage(max_damage: f32, distance: f32, extent: f32) -> f32 {
    max_damage * falloff(distance, extent)
}

/// Direct-hit test of a threat's bounding circle against an installation:
/// lower edge at or below the roof and horizontal extents overlapping.
pub fn threat_hits_installation(pos: Vec2, radius: f32, rect: &Rect) -> bool {
    pos.y + radius >= rect.min.y && pos.x - radius <= rect.max.x && pos.x + radius >= rect.min.x
}

/// Build the per-tick spatial index over live threats
pub fn build_threat_index(threats: &[Threat], field: Rect) -> Quadtree<EntityId> {
    Quadtree::build(
        field,
        threats
            .iter()
            .filter(|t| !t.is_destroyed())
            .map(|t| (t.bounds(), t.id)),
    )
}

/// A threat destroyed by a blast
#[derive(Debug, Clone, PartialEq)]
pub struct Kill {
    pub threat_id: EntityId,
    pub kind: ThreatKind,
    pub pos: Vec2,
    pub blast_id: EntityId,
    pub chain_depth: u32,
    pub combo_index: u32,
    pub points: u64,
}

/// Damage dealt to an installation
#[derive(Debug, Clone, PartialEq)]
pub struct InstallationHit {
    pub installation: usize,
    pub damage: f32,
    /// This hit destroyed it
    pub destroyed: bool,
}

/// Everything the blast sweep asks the tick driver to apply
#[derive(Debug, Clone, Default)]
pub struct BlastOutcome {
    pub kills: Vec<Kill>,
    /// Secondary blasts to spawn (center, parameters)
    pub chain_blasts: Vec<(Vec2, BlastParams)>,
    pub installation_hits: Vec<InstallationHit>,
    pub pickups_collected: Vec<EntityId>,
}

/// Sweep every active blast against the threat index, installations and pickups
pub fn resolve_blasts(
    blasts: &mut [Blast],
    threats: &mut [Threat],
    installations: &mut [Installation],
    pickups: &[Pickup],
    index: &Quadtree<EntityId>,
    tuning: &Tuning,
) -> BlastOutcome {
    let mut outcome = BlastOutcome::default();

    for blast in blasts.iter_mut() {
        resolve_blast_threats(blast, threats, index, tuning, &mut outcome);

        if blast.damages_installations {
            resolve_blast_installations(blast, installations, &mut outcome);
        }

        if blast.is_player() {
            for pickup in pickups {
                if outcome.pickups_collected.contains(&pickup.id) {
                    continue;
                }
                if blast.center.distance(pickup.pos) < blast.radius + pickup.radius {
                    outcome.pickups_collected.push(pickup.id);
                }
            }
        }
    }

    outcome
}

fn resolve_blast_threats(
    blast: &mut Blast,
    threats: &mut [Threat],
    index: &Quadtree<EntityId>,
    tuning: &Tuning,
    outcome: &mut BlastOutcome,
) {
    if blast.radius <= 0.0 {
        return;
    }

    for id in index.query(&blast.bounds()) {
        if blast.hit_threats.contains(&id) {
            continue;
        }
        let Ok(i) = threats.binary_search_by_key(&id, |t| t.id) else {
            continue;
        };
        let threat = &mut threats[i];
        if threat.is_destroyed() {
            continue;
        }

        let distance = blast.center.distance(threat.pos);
        if distance >= blast.radius + threat.radius {
            continue;
        }

        blast.hit_threats.insert(id);
        let damage = blast_damage(blast.max_damage, distance, blast.max_radius + threat.radius);
        log::trace!("blast {} hit threat {} for {:.0}", blast.id, id, damage);

        if threat.apply_damage(damage) {
            blast.kills += 1;
            let points = tuning.scoring_mode.points(&KillContext {
                base_points: threat.kind.base_points(tuning),
                chain_depth: blast.chain_depth,
                combo_index: blast.kills,
            });
            outcome.kills.push(Kill {
                threat_id: id,
                kind: threat.kind,
                pos: threat.pos,
                blast_id: blast.id,
                chain_depth: blast.chain_depth,
                combo_index: blast.kills,
                points,
            });
            outcome
                .chain_blasts
                .push((threat.pos, BlastParams::chain(tuning, threat, blast.chain_depth)));
        }
    }
}

fn resolve_blast_installations(
    blast: &mut Blast,
    installations: &mut [Installation],
    outcome: &mut BlastOutcome,
) {
    for inst in installations.iter_mut() {
        if inst.destroyed || blast.hit_installations.contains(&inst.index) {
            continue;
        }
        // Installations are rectangles: measure to the nearest point on them
        let closest = inst.rect.closest_point(blast.center);
        let distance = closest.distance(blast.center);
        if distance >= blast.radius {
            continue;
        }

        blast.hit_installations.insert(inst.index);
        let damage = blast_damage(blast.base_damage, distance, blast.max_radius);
        let destroyed = inst.take_damage(damage);
        outcome.installation_hits.push(InstallationHit {
            installation: inst.index,
            damage,
            destroyed,
        });
    }
}

/// A threat that struck an installation directly
#[derive(Debug, Clone, PartialEq)]
pub struct DirectImpact {
    pub threat_id: EntityId,
    pub kind: ThreatKind,
    pub pos: Vec2,
    pub installation: usize,
    pub damage: f32,
    pub destroyed: bool,
}

/// Direct hits for threats inside the ground band. Damage is applied here;
/// the tick driver removes the threats and spawns the impact blasts.
pub fn resolve_direct_impacts(
    threats: &[Threat],
    installations: &mut [Installation],
    tuning: &Tuning,
) -> Vec<DirectImpact> {
    let ground = tuning.field_height - tuning.ground_band;
    let mut impacts = Vec::new();

    for threat in threats {
        if threat.is_destroyed() || threat.pos.y + threat.radius <= ground {
            continue;
        }
        let Some(inst) = installations
            .iter_mut()
            .find(|i| !i.destroyed && threat_hits_installation(threat.pos, threat.radius, &i.rect))
        else {
            continue;
        };

        let damage = threat.health * threat.kind.impact_multiplier(tuning);
        let destroyed = inst.take_damage(damage);
        log::debug!(
            "{:?} threat {} struck installation {} for {:.0}",
            threat.kind,
            threat.id,
            inst.index,
            damage
        );
        impacts.push(DirectImpact {
            threat_id: threat.id,
            kind: threat.kind,
            pos: threat.pos,
            installation: inst.index,
            damage,
            destroyed,
        });
    }

    impacts
}

/// True once a threat has fallen entirely below the field
#[inline]
pub fn has_escaped(threat: &Threat, field_height: f32) -> bool {
    threat.pos.y - threat.radius > field_height
}
