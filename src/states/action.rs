//! Temporary action states: Attack, BackStep, Parry, ParryStab, Parried,
//! ParriedStabbed, Roll and Hit.
//!
//! An action plays until its animation says otherwise. Three checkpoints
//! open the way out: `movement_cancelable` lets held movement take over,
//! `action_cancelable` resolves the input buffer, and `animation_end` returns
//! to Idle.

use glam::Vec3;
use tracing::debug;

use crate::components::{CharacterContext, CombatMessage};
use crate::engine::input::{Action, InputBuffer};
use crate::states::base::{
    apply_gravity, approach, attack_or_parry_stab, compose_velocity, face_target_instantly,
    fall_check, free_rotation_smoothing, input_yaw, resolve, rotate_to_yaw,
    rotate_towards_position, rotate_towards_target, BaseState, Poll,
};
use crate::states::events::{CharacterEvent, Checkpoint, EventKey, Partner, Registration};
use crate::states::{CharacterState, StateId};

/// Buffered actions in the order they win at the action-cancel checkpoint.
const BUFFER_PRIORITY: [(InputBuffer, StateId); 4] = [
    (InputBuffer::Attack, StateId::Attack),
    (InputBuffer::BackStep, StateId::BackStep),
    (InputBuffer::Parry, StateId::Parry),
    (InputBuffer::Roll, StateId::Roll),
];

/// Leaf-specific per-activation data.
#[derive(Debug)]
enum Leaf {
    Attack,
    BackStep {
        momentum_ended: bool,
    },
    Parry,
    ParryStab {
        victim: Option<Vec3>,
    },
    Parried,
    ParriedStabbed {
        pushed: bool,
        rotating: bool,
    },
    Roll {
        can_control_direction: bool,
        momentum_ended: bool,
    },
    Hit,
}

impl Leaf {
    fn for_state(id: StateId) -> Self {
        match id {
            StateId::BackStep => Self::BackStep {
                momentum_ended: false,
            },
            StateId::Parry => Self::Parry,
            StateId::ParryStab => Self::ParryStab { victim: None },
            StateId::Parried => Self::Parried,
            StateId::ParriedStabbed => Self::ParriedStabbed {
                pushed: false,
                rotating: true,
            },
            StateId::Roll => Self::Roll {
                can_control_direction: false,
                momentum_ended: false,
            },
            StateId::Hit => Self::Hit,
            _ => Self::Attack,
        }
    }
}

pub struct ActionState {
    id: StateId,
    base: BaseState,
    leaf: Leaf,
    input_buffer_enabled: bool,
    movement_cancelable: bool,
    action_cancelable: bool,
    animation_ended: bool,
}

impl ActionState {
    pub fn new(id: StateId) -> Self {
        Self {
            id,
            base: BaseState::default(),
            leaf: Leaf::for_state(id),
            input_buffer_enabled: !matches!(id, StateId::ParryStab | StateId::ParriedStabbed),
            movement_cancelable: false,
            action_cancelable: false,
            animation_ended: false,
        }
    }

    pub fn is_input_buffer_enabled(&self) -> bool {
        self.input_buffer_enabled
    }

    fn enter_leaf(&mut self, ctx: &mut CharacterContext, registration: &mut Registration<'_>) {
        self.leaf = Leaf::for_state(self.id);
        match &mut self.leaf {
            Leaf::Attack => registration.subscribe(EventKey::GotParried),
            Leaf::BackStep { .. } => registration.checkpoint(Checkpoint::AirMomentumEnd),
            Leaf::Roll { .. } => {
                registration.checkpoint(Checkpoint::CanControlDirection);
                registration.checkpoint(Checkpoint::AirMomentumEnd);
            }
            Leaf::Parried => registration.subscribe(EventKey::ParryStabbed),
            Leaf::ParriedStabbed { .. } => {
                registration.checkpoint(Checkpoint::StopRotatingTowardsStabber);
                registration.checkpoint(Checkpoint::StabHitTaken);
                registration.checkpoint(Checkpoint::PushStart);
                registration.checkpoint(Checkpoint::PushEnd);
                registration.checkpoint(Checkpoint::DeathCheck);
            }
            Leaf::ParryStab { victim } => match ctx.targeting.reachable_parried {
                Some(target) => {
                    *victim = Some(target.position);
                    let stabber = Partner {
                        entity: ctx.entity,
                        position: ctx.motion.position,
                        parry_stab_damage: ctx.resources.parry_stab_damage(),
                    };
                    ctx.outbox.push(CombatMessage::ParryStabbed {
                        victim: target.entity,
                        stabber,
                    });
                }
                None => debug!(entity = ?ctx.entity, "parry stab without a parried target"),
            },
            Leaf::Parry | Leaf::Hit => {}
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    fn checkpoint_transitions(&self, ctx: &CharacterContext) -> Poll {
        if self.animation_ended {
            return Poll::Go(StateId::Idle);
        }

        if self.action_cancelable && ctx.is_player() {
            if let poll @ Poll::Go(_) = self.action_cancel(ctx) {
                return poll;
            }
        }

        if self.movement_cancelable {
            return Self::movement_cancel(ctx);
        }

        Poll::Pass
    }

    fn action_cancel(&self, ctx: &CharacterContext) -> Poll {
        if self.input_buffer_enabled {
            let buffered = ctx.control.player().map_or(InputBuffer::None, |i| i.buffer());
            let hit = BUFFER_PRIORITY
                .iter()
                .find(|(latched, _)| *latched == buffered)
                .map(|(_, state)| *state);
            match hit {
                Some(StateId::Attack) => return Poll::Go(attack_or_parry_stab(ctx)),
                Some(state) => return Poll::Go(state),
                None => {}
            }
        }

        let control = &ctx.control;
        if control.was_pressed(Action::Roll) {
            return Poll::Go(StateId::Roll);
        }
        if control.is_in_progress(Action::Roll) {
            return Poll::Hold;
        }
        if control.was_pressed(Action::Attack) {
            return Poll::Go(StateId::Attack);
        }
        if control.was_pressed(Action::BackStep) {
            return Poll::Go(StateId::BackStep);
        }
        if control.was_pressed(Action::Parry) {
            return Poll::Go(StateId::Parry);
        }
        Poll::Pass
    }

    fn movement_cancel(ctx: &CharacterContext) -> Poll {
        if let Some(sense) = ctx.control.agent() {
            return if sense.has_reached_destination {
                Poll::Go(StateId::Idle)
            } else {
                Poll::Go(StateId::Walk)
            };
        }
        if ctx.control.is_held(Action::Sprint) {
            Poll::Go(StateId::Sprint)
        } else if ctx.control.is_moving() {
            Poll::Go(StateId::Walk)
        } else {
            Poll::Pass
        }
    }

    // -----------------------------------------------------------------------
    // Motion
    // -----------------------------------------------------------------------

    fn horizontal(&self, ctx: &CharacterContext) -> (Vec3, f32) {
        let movement = &ctx.config.movement;
        let (h, dt) = (ctx.motion.horizontal_speed, ctx.dt);
        let rate = movement.ground_speed_change_rate;
        let forward = ctx.motion.forward();

        match &self.leaf {
            Leaf::BackStep { momentum_ended } => {
                let speed = if *momentum_ended {
                    approach(h, 0.0, rate, dt)
                } else {
                    movement.back_step_speed
                };
                (-forward, speed)
            }
            Leaf::Roll { momentum_ended, .. } => {
                let speed = if *momentum_ended {
                    let target = if !ctx.control.is_moving() {
                        0.0
                    } else if ctx.control.is_held(Action::Sprint) {
                        movement.sprint_speed
                    } else {
                        movement.walk_speed
                    };
                    approach(h, target, rate, dt)
                } else {
                    movement.roll_speed
                };
                (forward, speed)
            }
            Leaf::ParriedStabbed { pushed, .. } => {
                let speed = if *pushed {
                    movement.push_speed
                } else {
                    approach(h, 0.0, rate, dt)
                };
                (-forward, speed)
            }
            Leaf::ParryStab { victim: Some(victim) } => {
                let offset = *victim - ctx.motion.position;
                let flat = Vec3::new(offset.x, 0.0, offset.z);
                let stopping = ctx.config.combat.parry_stab_stopping_distance;
                let speed = if flat.length() > stopping {
                    approach(h, movement.walk_speed, rate, dt)
                } else {
                    approach(h, 0.0, rate, dt)
                };
                (flat, speed)
            }
            _ => (forward, 0.0),
        }
    }

    fn rotate_roll(&self, ctx: &mut CharacterContext, can_control_direction: bool) {
        let Some(input) = ctx.control.player() else {
            return;
        };
        // With no movement yet this is the camera heading.
        let target = input_yaw(input.last_non_zero_move(), input.view_yaw);
        let locked = if can_control_direction {
            ctx.config.movement.rotation_smoothness
        } else {
            f32::INFINITY
        };
        let smooth_time = free_rotation_smoothing(ctx, locked);
        rotate_to_yaw(ctx, target, smooth_time);
    }
}

impl CharacterState for ActionState {
    fn id(&self) -> StateId {
        self.id
    }

    fn enter(&mut self, ctx: &mut CharacterContext, registration: &mut Registration<'_>) {
        self.movement_cancelable = false;
        self.action_cancelable = false;
        self.animation_ended = false;

        registration.checkpoint(Checkpoint::MovementCancelable);
        registration.checkpoint(Checkpoint::ActionCancelable);
        registration.checkpoint(Checkpoint::AnimationEnd);

        face_target_instantly(ctx);
        self.base.enter(ctx, registration);

        let cost = self.id.stamina_cost(&ctx.config.stats, ctx.dt);
        if cost > 0.0 {
            ctx.update_stamina(-cost);
        }

        self.enter_leaf(ctx, registration);
    }

    fn tick(&mut self, ctx: &mut CharacterContext) {
        self.base.tick(ctx);
    }

    fn handle_transitions(&mut self, ctx: &mut CharacterContext) -> Option<StateId> {
        match self.checkpoint_transitions(ctx) {
            Poll::Pass => {}
            poll => return resolve(ctx, poll),
        }

        match fall_check(ctx) {
            Poll::Go(fall) => resolve(ctx, Poll::Go(fall)),
            _ => None,
        }
    }

    fn move_tick(&mut self, ctx: &mut CharacterContext) {
        apply_gravity(ctx);
        let (direction, speed) = self.horizontal(ctx);
        let velocity = compose_velocity(ctx, direction, speed);
        ctx.apply_velocity(velocity);
    }

    fn rotate_tick(&mut self, ctx: &mut CharacterContext) {
        match &self.leaf {
            Leaf::Attack => rotate_towards_target(ctx),
            Leaf::ParryStab { victim: Some(victim) } => rotate_towards_position(ctx, *victim),
            Leaf::ParriedStabbed { rotating: true, .. } => {
                if let Some(stabber) = ctx.targeting.stabber {
                    rotate_towards_position(ctx, stabber.position);
                }
            }
            Leaf::Roll {
                can_control_direction,
                ..
            } => self.rotate_roll(ctx, *can_control_direction),
            _ => {}
        }
    }

    fn on_event(&mut self, event: &CharacterEvent, ctx: &mut CharacterContext) -> Option<StateId> {
        match (event, &mut self.leaf) {
            (CharacterEvent::Checkpoint(Checkpoint::MovementCancelable), _) => {
                self.movement_cancelable = true;
                None
            }
            (CharacterEvent::Checkpoint(Checkpoint::ActionCancelable), _) => {
                self.action_cancelable = true;
                None
            }
            (CharacterEvent::Checkpoint(Checkpoint::AnimationEnd), _) => {
                self.animation_ended = true;
                None
            }
            (CharacterEvent::GotParried, Leaf::Attack) => resolve(ctx, Poll::Go(StateId::Parried)),
            (CharacterEvent::ParryStabbed(_), Leaf::Parried) => {
                resolve(ctx, Poll::Go(StateId::ParriedStabbed))
            }
            (
                CharacterEvent::Checkpoint(Checkpoint::AirMomentumEnd),
                Leaf::BackStep { momentum_ended } | Leaf::Roll { momentum_ended, .. },
            ) => {
                *momentum_ended = true;
                None
            }
            (
                CharacterEvent::Checkpoint(Checkpoint::CanControlDirection),
                Leaf::Roll {
                    can_control_direction,
                    ..
                },
            ) => {
                *can_control_direction = true;
                None
            }
            (
                CharacterEvent::Checkpoint(checkpoint),
                Leaf::ParriedStabbed { pushed, rotating },
            ) if *checkpoint != Checkpoint::DeathCheck => {
                match checkpoint {
                    Checkpoint::StopRotatingTowardsStabber => *rotating = false,
                    Checkpoint::PushStart => *pushed = true,
                    Checkpoint::PushEnd => *pushed = false,
                    Checkpoint::StabHitTaken => match ctx.targeting.stabber {
                        Some(stabber) => {
                            ctx.notify(CharacterEvent::StabDamage(stabber.parry_stab_damage));
                        }
                        None => debug!(entity = ?ctx.entity, "stab landed with no recorded stabber"),
                    },
                    _ => {}
                }
                None
            }
            (CharacterEvent::Checkpoint(Checkpoint::DeathCheck), Leaf::ParriedStabbed { .. }) => {
                (self.base.has_died || ctx.resources.is_dead()).then_some(StateId::Death)
            }
            _ => self.base.on_event(event, ctx),
        }
    }
}
