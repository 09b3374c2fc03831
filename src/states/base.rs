//! Behavior shared by every state: hit reaction, stamina gating, gravity
//! and rotation helpers.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};
use tracing::debug;

use crate::components::CharacterContext;
use crate::engine::input::Action;
use crate::states::events::{CharacterEvent, EventKey, Registration};
use crate::states::StateId;

/// Outcome of polling for a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Poll {
    /// Nothing decided; later checks may run.
    Pass,
    /// Skip the rest of this poll's checks. Independent polls still run.
    Hold,
    /// Request this state.
    Go(StateId),
}

// ---------------------------------------------------------------------------
// Base lifecycle
// ---------------------------------------------------------------------------

/// Per-activation part every state embeds.
#[derive(Debug, Default)]
pub struct BaseState {
    pub has_died: bool,
}

impl BaseState {
    pub fn enter(&mut self, ctx: &mut CharacterContext, registration: &mut Registration<'_>) {
        self.has_died = false;
        if ctx.motion.grounded {
            ctx.motion.action_rotation_window = ctx.config.movement.action_rotation_choice_time;
        }
        registration.subscribe(EventKey::Death);
        registration.subscribe(EventKey::HitTaken);
    }

    pub fn tick(&mut self, ctx: &mut CharacterContext) {
        if ctx.motion.grounded {
            ctx.motion.jump_cooldown -= ctx.dt;
        }
    }

    /// Default death and hit reaction. Airborne non-lethal hits are absorbed.
    pub fn on_event(&mut self, event: &CharacterEvent, ctx: &mut CharacterContext) -> Option<StateId> {
        match event {
            CharacterEvent::Death => {
                self.has_died = true;
                None
            }
            CharacterEvent::HitTaken(hit) => {
                if self.has_died || ctx.resources.is_dead() {
                    Some(StateId::Death)
                } else if ctx.motion.grounded {
                    request_transition(ctx, StateId::Hit)
                } else {
                    debug!(entity = ?ctx.entity, %hit, "airborne hit absorbed");
                    None
                }
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Transition requests
// ---------------------------------------------------------------------------

/// Resolve a request for `target`, applying the attack switch and stamina
/// gating. Returns the state to enter, or `None` to stay.
pub fn request_transition(ctx: &CharacterContext, target: StateId) -> Option<StateId> {
    if target == StateId::Attack && !ctx.config.combat.attacks_enabled {
        debug!(entity = ?ctx.entity, "attacks disabled; request ignored");
        return None;
    }

    let cost = target.stamina_cost(&ctx.config.stats, ctx.dt);
    if cost > 0.0 && ctx.resources.stamina() <= 0.0 {
        let recovery = recovery_state(ctx);
        debug!(
            entity = ?ctx.entity,
            requested = target.name(),
            redirected = recovery.name(),
            "out of stamina"
        );
        return Some(recovery);
    }

    Some(target)
}

pub fn resolve(ctx: &CharacterContext, poll: Poll) -> Option<StateId> {
    match poll {
        Poll::Go(target) => request_transition(ctx, target),
        Poll::Pass | Poll::Hold => None,
    }
}

/// Where an exhausted character goes instead of the state it asked for.
pub fn recovery_state(ctx: &CharacterContext) -> StateId {
    if ctx.is_player() && !ctx.control.is_moving() {
        StateId::Idle
    } else {
        StateId::Walk
    }
}

/// Pick the ground-motion state matching current input or agent distance.
pub fn ground_motion_state(ctx: &CharacterContext) -> StateId {
    match ctx.control.agent() {
        Some(sense) => {
            if sense.has_reached_destination {
                StateId::Idle
            } else {
                StateId::Walk
            }
        }
        None => {
            if !ctx.control.is_moving() {
                StateId::Idle
            } else if ctx.control.is_held(Action::Sprint) {
                StateId::Sprint
            } else {
                StateId::Walk
            }
        }
    }
}

pub fn ground_motion_transition(ctx: &CharacterContext) -> Option<StateId> {
    request_transition(ctx, ground_motion_state(ctx))
}

/// Attack, or ParryStab when a parried opponent is in reach.
pub fn attack_or_parry_stab(ctx: &CharacterContext) -> StateId {
    if ctx.targeting.reachable_parried.is_some() {
        StateId::ParryStab
    } else {
        StateId::Attack
    }
}

/// Grounded: reset the fall timeout. Airborne: count it down, then Fall.
pub fn fall_check(ctx: &mut CharacterContext) -> Poll {
    if ctx.motion.grounded {
        ctx.motion.fall_timeout = ctx.config.movement.fall_timeout;
        return Poll::Pass;
    }
    if ctx.motion.fall_timeout <= 0.0 {
        return Poll::Go(StateId::Fall);
    }
    ctx.motion.fall_timeout -= ctx.dt;
    Poll::Pass
}

// ---------------------------------------------------------------------------
// Gravity
// ---------------------------------------------------------------------------

pub fn apply_ground_gravity(ctx: &mut CharacterContext) {
    ctx.motion.vertical_velocity = ctx.config.movement.ground_gravity;
}

/// Accelerate downward, clamped at the terminal fall speed.
pub fn apply_air_gravity(ctx: &mut CharacterContext) {
    let movement = &ctx.config.movement;
    let v = ctx.motion.vertical_velocity + movement.air_gravity * ctx.dt;
    ctx.motion.vertical_velocity = v.max(movement.fall_speed_limit);
}

pub fn apply_gravity(ctx: &mut CharacterContext) {
    if ctx.motion.grounded {
        apply_ground_gravity(ctx);
    } else {
        apply_air_gravity(ctx);
    }
}

/// Move `current` toward `target` by a `rate * dt` fraction of the gap.
pub fn approach(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    current + (target - current) * (rate * dt).clamp(0.0, 1.0)
}

/// Horizontal direction at `speed` plus the current vertical velocity.
pub fn compose_velocity(ctx: &CharacterContext, direction: Vec3, speed: f32) -> Vec3 {
    direction.normalize_or_zero() * speed + Vec3::Y * ctx.motion.vertical_velocity
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Wrap an angle into `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}

/// Critically damped approach toward `target` along the shortest arc.
/// `smooth_time` of zero snaps; an infinite one leaves the angle unchanged.
pub fn smooth_damp_angle(
    current: f32,
    target: f32,
    velocity: &mut f32,
    smooth_time: f32,
    dt: f32,
) -> f32 {
    let target = current + wrap_angle(target - current);
    if smooth_time <= 0.0 {
        *velocity = 0.0;
        return target;
    }
    if !smooth_time.is_finite() || dt <= 0.0 {
        return current;
    }

    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);
    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let mut output = target + (change + temp) * decay;

    // No overshoot.
    if (target - current > 0.0) == (output > target) {
        output = target;
        *velocity = 0.0;
    }
    output
}

/// Yaw that faces from `from` toward `to`, if they are horizontally apart.
pub fn yaw_towards(from: Vec3, to: Vec3) -> Option<f32> {
    let d = to - from;
    let flat = Vec2::new(d.x, d.z);
    (flat.length_squared() > 1e-8).then(|| flat.x.atan2(flat.y))
}

/// World yaw for a movement input seen through the camera.
pub fn input_yaw(axis: Vec2, view_yaw: f32) -> f32 {
    axis.x.atan2(axis.y) + view_yaw
}

pub fn rotate_to_yaw(ctx: &mut CharacterContext, target: f32, smooth_time: f32) {
    let yaw = smooth_damp_angle(
        ctx.motion.yaw,
        target,
        &mut ctx.motion.rotation_velocity,
        smooth_time,
        ctx.dt,
    );
    ctx.motion.yaw = wrap_angle(yaw);
}

/// Face a world position, unless already standing on the target's footprint.
pub fn rotate_towards_position(ctx: &mut CharacterContext, position: Vec3) {
    if ctx.targeting.overlapping_target {
        return;
    }
    if let Some(yaw) = yaw_towards(ctx.motion.position, position) {
        let smoothing = ctx.config.movement.rotation_smoothness;
        rotate_to_yaw(ctx, yaw, smoothing);
    }
}

pub fn rotate_towards_target(ctx: &mut CharacterContext) {
    if let Some(position) = ctx.targeting.target_position() {
        rotate_towards_position(ctx, position);
    }
}

/// Snap to face the current target.
pub fn face_target_instantly(ctx: &mut CharacterContext) {
    let Some(position) = ctx.targeting.target_position() else {
        return;
    };
    if let Some(yaw) = yaw_towards(ctx.motion.position, position) {
        ctx.motion.yaw = yaw;
        ctx.motion.rotation_velocity = 0.0;
    }
}

/// Smoothing for air and roll rotation: snap while the action-rotation window
/// is open (consuming it), otherwise `otherwise`.
pub fn free_rotation_smoothing(ctx: &mut CharacterContext, otherwise: f32) -> f32 {
    if ctx.motion.action_rotation_window > 0.0 {
        ctx.motion.action_rotation_window -= ctx.dt;
        0.0
    } else {
        otherwise
    }
}

/// Turn a grounded player toward their movement input. No input keeps the
/// heading.
pub fn rotate_free(ctx: &mut CharacterContext, smoothing: f32) {
    let Some(input) = ctx.control.player() else {
        return;
    };
    let axis = input.move_axis();
    if axis == Vec2::ZERO {
        return;
    }
    let target = input_yaw(axis, input.view_yaw);
    rotate_to_yaw(ctx, target, smoothing);
}
