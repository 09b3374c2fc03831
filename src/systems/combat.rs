use glam::Vec3;
use hecs::{Entity, World};
use tracing::debug;

use crate::components::{
    footprints_overlap, Character, CombatMessage, Difficulty, HitInformation, TargetInfo,
};
use crate::config::AgentConfig;
use crate::engine::input::AgentSense;
use crate::states::events::CharacterEvent;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Read-only copy of what other characters may know about one combatant.
#[derive(Clone, Copy, Debug)]
struct Combatant {
    entity: Entity,
    position: Vec3,
    forward: Vec3,
    radius: f32,
    is_player: bool,
    alive: bool,
    is_parried: bool,
}

impl Combatant {
    fn info(&self) -> TargetInfo {
        TargetInfo {
            entity: self.entity,
            position: self.position,
            radius: self.radius,
        }
    }
}

fn snapshot(world: &World) -> Vec<Combatant> {
    world
        .query::<&Character>()
        .iter()
        .map(|(entity, character)| {
            let ctx = &character.ctx;
            Combatant {
                entity,
                position: ctx.motion.position,
                forward: ctx.motion.forward(),
                radius: ctx.config.movement.radius,
                is_player: ctx.is_player(),
                alive: !ctx.resources.is_dead(),
                is_parried: ctx.targeting.is_parried,
            }
        })
        .collect()
}

fn flat(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    flat(b - a).length()
}

/// Living characters on the other side.
fn opponents<'a>(all: &'a [Combatant], me: &'a Combatant) -> impl Iterator<Item = &'a Combatant> + 'a {
    all.iter()
        .filter(move |c| c.entity != me.entity && c.is_player != me.is_player && c.alive)
}

fn nearest<'a>(me: &Combatant, candidates: impl Iterator<Item = &'a Combatant>) -> Option<&'a Combatant> {
    candidates.min_by(|a, b| {
        flat_distance(me.position, a.position).total_cmp(&flat_distance(me.position, b.position))
    })
}

// ---------------------------------------------------------------------------
// Targeting
// ---------------------------------------------------------------------------

fn sense_toward(
    me: &Combatant,
    target: Option<&Combatant>,
    config: &AgentConfig,
    difficulty: Difficulty,
) -> AgentSense {
    let Some(target) = target else {
        return AgentSense {
            has_reached_destination: true,
            is_far_from_destination: false,
            heading: Vec3::ZERO,
        };
    };

    let distance = flat_distance(me.position, target.position);
    let padding = target.radius + config.reach_offset;
    let reached = distance <= config.stopping_distance + padding;
    let far = !reached && distance >= config.far_distance(difficulty.value()) + padding;
    AgentSense {
        has_reached_destination: reached,
        is_far_from_destination: far,
        heading: flat(target.position - me.position).normalize_or_zero(),
    }
}

/// Refresh every character's target, overlap, stab opportunity and agent sense.
pub fn targeting_system(world: &mut World) {
    let combatants = snapshot(world);

    for (entity, (character, difficulty)) in
        world.query_mut::<(&mut Character, Option<&Difficulty>)>()
    {
        let Some(me) = combatants.iter().find(|c| c.entity == entity) else {
            continue;
        };
        let ctx = &mut character.ctx;
        let combat = &ctx.config.combat;

        let in_range = opponents(&combatants, me).filter(|c| {
            flat_distance(me.position, c.position) <= combat.target_detection_radius
        });
        let closest = nearest(me, in_range).filter(|_| me.alive);
        let wants_target = !me.is_player || ctx.targeting.lock_on;

        ctx.targeting.target = closest.filter(|_| wants_target).map(Combatant::info);
        ctx.targeting.overlapping_target = ctx
            .targeting
            .target
            .is_some_and(|t| footprints_overlap(me.position, me.radius, t.position, t.radius));

        let threshold = 1.0 - combat.parry_stab_dot_offset;
        let stabbable = opponents(&combatants, me).filter(|c| {
            c.is_parried
                && flat_distance(me.position, c.position) <= combat.parry_stab_radius
                && c.forward.dot(flat(me.position - c.position).normalize_or_zero()) >= threshold
        });
        ctx.targeting.reachable_parried = nearest(me, stabbable).map(Combatant::info);

        if let Some(stabber) = ctx.targeting.stabber.as_mut() {
            if let Some(source) = combatants.iter().find(|c| c.entity == stabber.entity) {
                stabber.position = source.position;
            }
        }

        let difficulty = difficulty.copied().unwrap_or(Difficulty::new(0.0));
        let sense = sense_toward(me, closest, &ctx.config.agent, difficulty);
        if let Some(agent) = ctx.control.agent_mut() {
            *agent = sense;
        }
    }
}

// ---------------------------------------------------------------------------
// Hit detection
// ---------------------------------------------------------------------------

struct Strike {
    attacker: Entity,
    attacker_position: Vec3,
    victim: Entity,
    damage: i32,
}

/// Resolve open weapon windows against opponents in reach and arc.
/// Each opponent is struck at most once per window.
pub fn hit_detection_system(world: &mut World) {
    let combatants = snapshot(world);

    // Phase 1: collect strikes.
    let mut strikes: Vec<Strike> = Vec::new();
    for (entity, character) in world.query_mut::<&mut Character>() {
        if !character.ctx.hit_receiver.weapon_active {
            continue;
        }
        let Some(me) = combatants.iter().find(|c| c.entity == entity) else {
            continue;
        };

        let ctx = &mut character.ctx;
        let (reach, arc) = (ctx.config.combat.weapon_reach, ctx.config.combat.weapon_arc_dot);
        for victim in opponents(&combatants, me) {
            if ctx.hit_receiver.struck.contains(&victim.entity) {
                continue;
            }
            let offset = flat(victim.position - me.position);
            if offset.length() > reach + victim.radius {
                continue;
            }
            let toward = offset.normalize_or_zero();
            if toward != Vec3::ZERO && me.forward.dot(toward) < arc {
                continue;
            }

            ctx.hit_receiver.struck.push(victim.entity);
            strikes.push(Strike {
                attacker: entity,
                attacker_position: me.position,
                victim: victim.entity,
                damage: ctx.resources.damage(),
            });
        }
    }

    // Phase 2: apply them.
    for strike in strikes {
        let parried = match world.get::<&mut Character>(strike.victim) {
            Ok(mut victim) => {
                if victim.ctx.hit_receiver.is_parrying {
                    true
                } else {
                    if victim.ctx.hit_receiver.can_take_damage() {
                        let to_attacker =
                            flat(strike.attacker_position - victim.ctx.motion.position)
                                .normalize_or_zero();
                        let hit = HitInformation::from_facing(
                            strike.damage,
                            victim.ctx.motion.forward(),
                            to_attacker,
                        );
                        debug!(victim = ?strike.victim, "hit: {hit}");
                        victim.receive_hit(hit);
                    }
                    false
                }
            }
            Err(_) => {
                debug!(victim = ?strike.victim, "struck character no longer exists");
                false
            }
        };

        if parried {
            if let Ok(mut attacker) = world.get::<&mut Character>(strike.attacker) {
                debug!(attacker = ?strike.attacker, "attack parried");
                attacker.deliver(CharacterEvent::GotParried);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Message routing
// ---------------------------------------------------------------------------

/// Deliver every queued [`CombatMessage`] to its recipient.
pub fn combat_message_system(world: &mut World) {
    let mut messages: Vec<CombatMessage> = Vec::new();
    for (_entity, character) in world.query_mut::<&mut Character>() {
        messages.append(&mut character.ctx.outbox);
    }

    for message in messages {
        match message {
            CombatMessage::ParryStabbed { victim, stabber } => {
                match world.get::<&mut Character>(victim) {
                    Ok(mut character) => character.deliver(CharacterEvent::ParryStabbed(stabber)),
                    Err(_) => debug!(?victim, "parry stab victim no longer exists"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combatant(world: &mut World, position: Vec3, is_player: bool) -> Combatant {
        Combatant {
            entity: world.reserve_entity(),
            position,
            forward: Vec3::Z,
            radius: 0.5,
            is_player,
            alive: true,
            is_parried: false,
        }
    }

    #[test]
    fn test_sense_reached_and_far() {
        let mut world = World::new();
        let config = AgentConfig::default();
        let difficulty = Difficulty::new(0.0);
        let me = combatant(&mut world, Vec3::ZERO, false);

        let near = combatant(&mut world, Vec3::new(0.0, 0.0, 2.0), true);
        let sense = sense_toward(&me, Some(&near), &config, difficulty);
        assert!(sense.has_reached_destination);
        assert!(!sense.is_far_from_destination);

        let distant = combatant(&mut world, Vec3::new(0.0, 0.0, 8.0), true);
        let sense = sense_toward(&me, Some(&distant), &config, difficulty);
        assert!(!sense.has_reached_destination);
        assert!(sense.is_far_from_destination);
        assert!((sense.heading - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_opponents_skip_allies_and_dead() {
        let mut world = World::new();
        let me = combatant(&mut world, Vec3::ZERO, true);
        let ally = combatant(&mut world, Vec3::X, true);
        let mut dead = combatant(&mut world, Vec3::X, false);
        dead.alive = false;
        let enemy = combatant(&mut world, Vec3::Z, false);

        let all = [me, ally, dead, enemy];
        let found: Vec<Entity> = opponents(&all, &me).map(|c| c.entity).collect();
        assert_eq!(found, vec![enemy.entity]);
    }
}
