use tracing::info;

use crate::components::CharacterContext;
use crate::states::base::{apply_gravity, approach, compose_velocity};
use crate::states::events::{CharacterEvent, Registration};
use crate::states::{CharacterState, StateId};

/// Terminal. Nothing leaves it; the body slides to a stop under gravity.
#[derive(Default)]
pub struct DeathState;

impl DeathState {
    pub fn new() -> Self {
        Self
    }
}

impl CharacterState for DeathState {
    fn id(&self) -> StateId {
        StateId::Death
    }

    fn enter(&mut self, ctx: &mut CharacterContext, _registration: &mut Registration<'_>) {
        info!(entity = ?ctx.entity, "character died");
        ctx.attack_delay = None;
    }

    fn tick(&mut self, _ctx: &mut CharacterContext) {}

    fn handle_transitions(&mut self, _ctx: &mut CharacterContext) -> Option<StateId> {
        None
    }

    fn move_tick(&mut self, ctx: &mut CharacterContext) {
        let rate = ctx.config.movement.ground_speed_change_rate;
        let speed = approach(ctx.motion.horizontal_speed, 0.0, rate, ctx.dt);
        apply_gravity(ctx);
        let velocity = compose_velocity(ctx, ctx.motion.forward(), speed);
        ctx.apply_velocity(velocity);
    }

    fn rotate_tick(&mut self, _ctx: &mut CharacterContext) {}

    fn on_event(&mut self, _event: &CharacterEvent, _ctx: &mut CharacterContext) -> Option<StateId> {
        None
    }
}
