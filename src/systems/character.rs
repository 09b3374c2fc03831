use hecs::{Entity, World};
use tracing::{debug, trace};

use crate::components::{Character, Name};
use crate::states::events::StateEvent;

/// A state change observed on one character, kept by the arena for summaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub entity: Entity,
    pub tick: u64,
    pub event: StateEvent,
}

/// Enter Idle on every character whose machine has not started yet.
pub fn initialize_characters(world: &mut World) {
    for (_entity, character) in world.query_mut::<&mut Character>() {
        if character.state().is_none() {
            character.initialize();
        }
    }
}

/// Clear last tick's button edges. Held buttons and the buffer survive.
pub fn begin_input_frame(world: &mut World) {
    for (_entity, character) in world.query_mut::<&mut Character>() {
        if let Some(input) = character.ctx.control.player_mut() {
            input.begin_frame();
        }
    }
}

/// Advance every character's machine by one fixed step.
pub fn character_tick_system(world: &mut World, dt: f32) {
    for (_entity, character) in world.query_mut::<&mut Character>() {
        character.tick(dt);
    }
}

/// Collect each machine's entered/exited notifications.
pub fn state_event_system(world: &mut World, tick: u64) -> Vec<Transition> {
    let mut transitions = Vec::new();
    for (entity, (character, name)) in world.query_mut::<(&mut Character, Option<&Name>)>() {
        let label = name.map_or("?", |n| n.0.as_str());
        for event in character.drain_state_events() {
            match event {
                StateEvent::Entered(state) if !character.ctx.is_player() => {
                    let speed = state.agent_speed(&character.ctx.config.movement);
                    debug!(who = label, state = state.name(), trigger = state.animation_trigger(), speed, "entered");
                }
                StateEvent::Entered(state) => {
                    debug!(who = label, state = state.name(), trigger = state.animation_trigger(), "entered");
                }
                StateEvent::Exited(state) => trace!(who = label, state = state.name(), "exited"),
            }
            transitions.push(Transition { entity, tick, event });
        }
    }
    transitions
}
