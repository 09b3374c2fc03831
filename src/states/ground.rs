use glam::Vec3;

use crate::components::CharacterContext;
use crate::engine::input::Action;
use crate::states::base::{
    self, apply_gravity, approach, attack_or_parry_stab, compose_velocity, fall_check, resolve,
    rotate_free, rotate_to_yaw, rotate_towards_target, yaw_towards, BaseState, Poll,
};
use crate::states::events::{CharacterEvent, EventKey, Registration};
use crate::states::{CharacterState, StateId};

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroundSpeed {
    Still,
    Walk,
    Sprint,
}

/// Which way a grounded player moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Heading {
    Forward,
    /// Strafe relative to facing while a combat target is set.
    StrafeWhenTargeting,
}

/// How a grounded character turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Facing {
    Target,
    TargetElseInput,
    Input,
}

#[derive(Clone, Copy, Debug)]
pub struct GroundPolicy {
    pub speed: GroundSpeed,
    pub heading: Heading,
    pub player_facing: Facing,
    pub agent_facing: Facing,
}

// ---------------------------------------------------------------------------
// Ground-motion family
// ---------------------------------------------------------------------------

/// Idle, Walk and Sprint.
pub struct GroundMotionState {
    id: StateId,
    policy: GroundPolicy,
    base: BaseState,
}

impl GroundMotionState {
    pub fn new(id: StateId, policy: GroundPolicy) -> Self {
        Self {
            id,
            policy,
            base: BaseState::default(),
        }
    }

    pub fn idle() -> Self {
        Self::new(
            StateId::Idle,
            GroundPolicy {
                speed: GroundSpeed::Still,
                heading: Heading::StrafeWhenTargeting,
                player_facing: Facing::Target,
                agent_facing: Facing::Target,
            },
        )
    }

    pub fn walk() -> Self {
        Self::new(
            StateId::Walk,
            GroundPolicy {
                speed: GroundSpeed::Walk,
                heading: Heading::StrafeWhenTargeting,
                player_facing: Facing::TargetElseInput,
                agent_facing: Facing::Target,
            },
        )
    }

    pub fn sprint() -> Self {
        Self::new(
            StateId::Sprint,
            GroundPolicy {
                speed: GroundSpeed::Sprint,
                heading: Heading::Forward,
                player_facing: Facing::Input,
                agent_facing: Facing::Target,
            },
        )
    }

    fn target_speed(&self, ctx: &CharacterContext) -> f32 {
        let movement = &ctx.config.movement;
        let speed = match self.policy.speed {
            GroundSpeed::Still => 0.0,
            GroundSpeed::Walk => movement.walk_speed,
            GroundSpeed::Sprint => movement.sprint_speed,
        };
        speed * ctx.control.move_magnitude()
    }

    fn direction(&self, ctx: &CharacterContext) -> Vec3 {
        let forward = ctx.motion.forward();
        if let Some(sense) = ctx.control.agent() {
            return if sense.heading == Vec3::ZERO {
                forward
            } else {
                sense.heading
            };
        }

        match (self.policy.heading, ctx.control.player()) {
            (Heading::StrafeWhenTargeting, Some(input)) if ctx.targeting.has_target() => {
                let strafe = ctx.motion.strafe(input.move_axis());
                if strafe == Vec3::ZERO {
                    forward
                } else {
                    strafe
                }
            }
            _ => forward,
        }
    }

    /// Grounded action input, highest priority first.
    fn poll_actions(ctx: &CharacterContext) -> Poll {
        let control = &ctx.control;
        if control.was_pressed(Action::Roll) {
            return Poll::Go(StateId::Roll);
        }
        if control.is_in_progress(Action::Roll) {
            return Poll::Hold;
        }
        if control.was_pressed(Action::Jump) && ctx.motion.jump_cooldown <= 0.0 {
            return Poll::Go(StateId::Jump);
        }
        if control.was_pressed(Action::Parry) {
            return Poll::Go(StateId::Parry);
        }
        if control.was_pressed(Action::Attack) {
            return Poll::Go(attack_or_parry_stab(ctx));
        }
        Poll::Pass
    }

    /// Idle/Walk/Sprint switching.
    fn poll_locomotion(&self, ctx: &CharacterContext) -> Poll {
        let control = &ctx.control;
        if let Some(sense) = control.agent() {
            return match self.id {
                StateId::Idle if !sense.has_reached_destination => Poll::Go(StateId::Walk),
                StateId::Walk if sense.is_far_from_destination => Poll::Go(StateId::Sprint),
                StateId::Walk if sense.has_reached_destination => Poll::Go(StateId::Idle),
                StateId::Sprint if !sense.is_far_from_destination => Poll::Go(StateId::Walk),
                _ => Poll::Pass,
            };
        }

        let moving = control.is_moving();
        match self.id {
            StateId::Idle if moving => Poll::Go(StateId::Walk),
            StateId::Idle if control.was_pressed(Action::BackStep) => Poll::Go(StateId::BackStep),
            StateId::Walk if !moving => Poll::Go(StateId::Idle),
            StateId::Walk if control.was_pressed(Action::Sprint) => Poll::Go(StateId::Sprint),
            StateId::Sprint if !moving => Poll::Go(StateId::Idle),
            StateId::Sprint if !control.is_held(Action::Sprint) => Poll::Go(StateId::Walk),
            _ => Poll::Pass,
        }
    }

    fn facing(&self, ctx: &CharacterContext) -> Facing {
        if ctx.is_player() {
            self.policy.player_facing
        } else {
            self.policy.agent_facing
        }
    }
}

impl CharacterState for GroundMotionState {
    fn id(&self) -> StateId {
        self.id
    }

    fn enter(&mut self, ctx: &mut CharacterContext, registration: &mut Registration<'_>) {
        self.base.enter(ctx, registration);
        if !ctx.is_player() {
            registration.subscribe(EventKey::AttackDelayElapsed);
        }
        if self.id == StateId::Sprint {
            registration.subscribe(EventKey::StaminaExhausted);
        }
    }

    fn tick(&mut self, ctx: &mut CharacterContext) {
        let delta = -self.id.stamina_cost(&ctx.config.stats, ctx.dt);
        ctx.update_stamina(delta);
        self.base.tick(ctx);
    }

    fn handle_transitions(&mut self, ctx: &mut CharacterContext) -> Option<StateId> {
        if let Poll::Go(fall) = fall_check(ctx) {
            return base::request_transition(ctx, fall);
        }

        // A held Roll only blocks the remaining actions; locomotion still runs.
        if ctx.motion.grounded && ctx.is_player() {
            if let Poll::Go(target) = Self::poll_actions(ctx) {
                return base::request_transition(ctx, target);
            }
        }

        resolve(ctx, self.poll_locomotion(ctx))
    }

    fn move_tick(&mut self, ctx: &mut CharacterContext) {
        let rate = ctx.config.movement.ground_speed_change_rate;
        let speed = approach(ctx.motion.horizontal_speed, self.target_speed(ctx), rate, ctx.dt);
        apply_gravity(ctx);
        let velocity = compose_velocity(ctx, self.direction(ctx), speed);
        ctx.apply_velocity(velocity);
    }

    fn rotate_tick(&mut self, ctx: &mut CharacterContext) {
        let smoothing = ctx.config.movement.rotation_smoothness;
        match self.facing(ctx) {
            Facing::Target => {
                if ctx.targeting.has_target() {
                    rotate_towards_target(ctx);
                } else if let Some(sense) = ctx.control.agent() {
                    // Agents without a target face where they walk.
                    let ahead = ctx.motion.position + sense.heading;
                    if let Some(yaw) = yaw_towards(ctx.motion.position, ahead) {
                        rotate_to_yaw(ctx, yaw, smoothing);
                    }
                }
            }
            Facing::TargetElseInput => {
                if ctx.targeting.has_target() {
                    rotate_towards_target(ctx);
                } else {
                    rotate_free(ctx, smoothing);
                }
            }
            Facing::Input => rotate_free(ctx, smoothing),
        }
    }

    fn on_event(&mut self, event: &CharacterEvent, ctx: &mut CharacterContext) -> Option<StateId> {
        match event {
            CharacterEvent::AttackDelayElapsed => base::request_transition(ctx, StateId::Attack),
            CharacterEvent::StaminaExhausted => Some(base::recovery_state(ctx)),
            _ => self.base.on_event(event, ctx),
        }
    }
}
