use glam::{Vec2, Vec3};

use crate::components::CharacterContext;
use crate::engine::time::Timer;
use crate::states::base::{
    apply_air_gravity, approach, compose_velocity, free_rotation_smoothing, ground_motion_transition,
    input_yaw, rotate_to_yaw, rotate_towards_target, BaseState,
};
use crate::states::events::{CharacterEvent, Registration};
use crate::states::{CharacterState, StateId};

/// Launch speed that peaks at `height` under `gravity` (negative).
pub fn jump_launch_velocity(height: f32, gravity: f32) -> f32 {
    (height * -2.0 * gravity).sqrt()
}

/// Jump and Fall.
///
/// While airborne the character keeps limited horizontal control for a short
/// window, then its horizontal speed decays. Once it starts turning toward a
/// combat target mid-air it stays in that mode until landing.
pub struct AirMotionState {
    id: StateId,
    base: BaseState,
    used_combat_mode: bool,
    ground_detection: Timer,
}

impl AirMotionState {
    fn new(id: StateId) -> Self {
        Self {
            id,
            base: BaseState::default(),
            used_combat_mode: false,
            ground_detection: Timer::new(),
        }
    }

    pub fn jump() -> Self {
        Self::new(StateId::Jump)
    }

    pub fn fall() -> Self {
        Self::new(StateId::Fall)
    }

    fn should_combat_rotate(ctx: &CharacterContext) -> bool {
        ctx.targeting.has_target()
            && ctx.motion.horizontal_speed.round() <= ctx.config.movement.walk_speed
    }

    fn direction(&mut self, ctx: &CharacterContext) -> Vec3 {
        let forward = ctx.motion.forward();
        let combat = Self::should_combat_rotate(ctx) || self.used_combat_mode;
        if !combat || ctx.targeting.overlapping_target {
            return forward;
        }

        self.used_combat_mode = true;
        let axis = ctx
            .control
            .player()
            .map_or(Vec2::Y, |input| input.air_entry_move());
        let strafe = ctx.motion.strafe(axis);
        if strafe == Vec3::ZERO {
            forward
        } else {
            strafe
        }
    }

    fn rotate_free(ctx: &mut CharacterContext) {
        let Some(input) = ctx.control.player() else {
            return;
        };
        let axis = input.move_axis();
        // No input holds the current yaw but still uses up the snap window.
        let target = if axis == Vec2::ZERO {
            ctx.motion.yaw
        } else {
            input_yaw(axis, input.view_yaw)
        };

        let movement = &ctx.config.movement;
        let airborne = movement.rotation_smoothness * movement.air_rotation_multiplier
            + ctx.motion.horizontal_speed * movement.air_speed_rotation_influence;
        let smooth_time = free_rotation_smoothing(ctx, airborne);
        rotate_to_yaw(ctx, target, smooth_time);
    }
}

impl CharacterState for AirMotionState {
    fn id(&self) -> StateId {
        self.id
    }

    fn enter(&mut self, ctx: &mut CharacterContext, registration: &mut Registration<'_>) {
        self.used_combat_mode = false;

        if self.id == StateId::Jump {
            let movement = &ctx.config.movement;
            ctx.motion.jump_cooldown = movement.jump_cooldown;
            ctx.motion.vertical_velocity =
                jump_launch_velocity(movement.jump_height, movement.air_gravity);
            self.ground_detection.start(movement.jump_ground_detection_timeout);
            let cost = self.id.stamina_cost(&ctx.config.stats, ctx.dt);
            ctx.update_stamina(-cost);
        }

        self.base.enter(ctx, registration);
    }

    fn exit(&mut self, ctx: &mut CharacterContext) {
        if ctx.motion.grounded {
            ctx.motion.air_control_window = ctx.config.movement.air_control_duration;
        }
    }

    fn tick(&mut self, ctx: &mut CharacterContext) {
        self.base.tick(ctx);
    }

    fn handle_transitions(&mut self, ctx: &mut CharacterContext) -> Option<StateId> {
        match self.id {
            StateId::Jump => {
                if !self.ground_detection.is_running() && ctx.motion.grounded {
                    return ground_motion_transition(ctx);
                }
                let _expired = self.ground_detection.update(ctx.dt);
                None
            }
            _ => {
                if ctx.motion.grounded {
                    ground_motion_transition(ctx)
                } else {
                    None
                }
            }
        }
    }

    fn move_tick(&mut self, ctx: &mut CharacterContext) {
        let movement = &ctx.config.movement;
        let (min_air_speed, rate) = (movement.min_air_speed, movement.air_speed_change_rate);

        let target = if ctx.motion.air_control_window > 0.0 {
            ctx.motion.air_control_window -= ctx.dt;
            ctx.motion.horizontal_speed.max(min_air_speed) * ctx.control.move_magnitude()
        } else {
            0.0
        };
        let speed = approach(ctx.motion.horizontal_speed, target, rate, ctx.dt);

        apply_air_gravity(ctx);
        let direction = self.direction(ctx);
        let velocity = compose_velocity(ctx, direction, speed);
        ctx.apply_velocity(velocity);
    }

    fn rotate_tick(&mut self, ctx: &mut CharacterContext) {
        if Self::should_combat_rotate(ctx) {
            rotate_towards_target(ctx);
        } else if !self.used_combat_mode {
            Self::rotate_free(ctx);
        }
    }

    fn on_event(&mut self, event: &CharacterEvent, ctx: &mut CharacterContext) -> Option<StateId> {
        self.base.on_event(event, ctx)
    }
}
