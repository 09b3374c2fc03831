use std::fmt;
use std::sync::Arc;

use clap::ValueEnum;
use glam::{Vec2, Vec3};
use hecs::{Entity, World};
use tracing::info;

use crate::components::{Character, Difficulty, FlatGround, MovementIntegrator, Name};
use crate::config::SimulationConfig;
use crate::engine::input::{Action, PlayerInput};
use crate::engine::time::TickClock;
use crate::scene::prefabs::{spawn_agent, spawn_player};
use crate::states::StateId;
use crate::systems::{
    animation_system, begin_input_frame, character_tick_system, combat_message_system,
    hit_detection_system, initialize_characters, state_event_system, targeting_system,
    AnimationClips, Transition,
};

/// Distance between the two fighters at spawn.
const SPAWN_GAP: f32 = 6.0;

// ---------------------------------------------------------------------------
// Pilots
// ---------------------------------------------------------------------------

/// What a scripted player gets to look at before choosing its input.
#[derive(Clone, Copy, Debug)]
pub struct PilotView {
    pub tick: u64,
    pub state: Option<StateId>,
    pub stamina: f32,
    pub opponent_state: Option<StateId>,
    pub opponent_distance: Option<f32>,
}

/// Drives the player's buttons once per tick.
pub trait Pilot {
    fn drive(&mut self, view: &PilotView, input: &mut PlayerInput);
}

/// Leaves the player untouched.
pub struct NoInput;

impl Pilot for NoInput {
    fn drive(&mut self, _view: &PilotView, _input: &mut PlayerInput) {}
}

const TAPPED: [Action; 5] = [Action::Attack, Action::BackStep, Action::Parry, Action::Roll, Action::Jump];

/// Release-and-press so the edge registers even if the button was left down.
fn tap(input: &mut PlayerInput, action: Action) {
    input.release(action);
    input.press(action);
}

fn release_taps(input: &mut PlayerInput) {
    for action in TAPPED {
        input.release(action);
    }
}

fn is_free(state: Option<StateId>) -> bool {
    matches!(state, Some(StateId::Idle | StateId::Walk))
}

/// Closes the gap, swings whenever free and parries incoming swings.
struct Duelist;

impl Pilot for Duelist {
    fn drive(&mut self, view: &PilotView, input: &mut PlayerInput) {
        release_taps(input);
        let distance = view.opponent_distance.unwrap_or(f32::INFINITY);

        if distance > 2.2 {
            input.set_move(Vec2::Y);
        } else {
            input.set_move(Vec2::ZERO);
        }

        if !is_free(view.state) {
            return;
        }
        if view.opponent_state == Some(StateId::Attack) {
            tap(input, Action::Parry);
        } else if distance <= 2.2 && view.tick % 45 == 0 {
            tap(input, Action::Attack);
        }
    }
}

/// Runs away, sprinting whenever there is stamina to spend.
struct Sprinter;

impl Pilot for Sprinter {
    fn drive(&mut self, view: &PilotView, input: &mut PlayerInput) {
        input.set_move(-Vec2::Y);
        if view.state == Some(StateId::Walk) && view.stamina > 0.0 {
            tap(input, Action::Sprint);
        } else if !input.is_held(Action::Sprint) {
            input.press(Action::Sprint);
        }
    }
}

/// Waits for a swing, parries it and answers with a stab.
struct Riposter;

impl Pilot for Riposter {
    fn drive(&mut self, view: &PilotView, input: &mut PlayerInput) {
        release_taps(input);
        input.set_move(Vec2::ZERO);
        if !is_free(view.state) {
            return;
        }
        match view.opponent_state {
            Some(StateId::Attack) => tap(input, Action::Parry),
            Some(StateId::Parried) => tap(input, Action::Attack),
            _ => {}
        }
    }
}

/// Scripted player behavior for the headless runner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    #[default]
    Duel,
    Exhaustion,
    Parry,
}

impl Scenario {
    pub fn pilot(self) -> Box<dyn Pilot> {
        match self {
            Self::Duel => Box::new(Duelist),
            Self::Exhaustion => Box::new(Sprinter),
            Self::Parry => Box::new(Riposter),
        }
    }
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

/// One player against one agent on flat ground.
pub struct Arena {
    pub world: World,
    pub clock: TickClock,
    pub player: Entity,
    pub agent: Entity,
    pub transitions: Vec<Transition>,
    clips: AnimationClips,
}

impl Arena {
    pub fn new(config: &SimulationConfig) -> Self {
        Self::with_integrator(config, Arc::new(FlatGround::default()))
    }

    pub fn with_integrator(config: &SimulationConfig, integrator: Arc<dyn MovementIntegrator>) -> Self {
        let mut world = World::new();

        // Face each other along Z.
        let player = spawn_player(&mut world, &config.player, integrator.clone(), Vec3::ZERO, 0.0);
        let agent = spawn_agent(
            &mut world,
            &config.agent,
            integrator,
            Vec3::new(0.0, 0.0, SPAWN_GAP),
            std::f32::consts::PI,
            Difficulty::new(config.difficulty),
            config.seed,
        );
        initialize_characters(&mut world);

        Self {
            world,
            clock: TickClock::from_rate(config.tick_rate),
            player,
            agent,
            transitions: Vec::new(),
            clips: AnimationClips::from_config(&config.animation),
        }
    }

    fn view(&self) -> PilotView {
        let player = self.world.get::<&Character>(self.player).ok();
        let agent = self.world.get::<&Character>(self.agent).ok();
        let distance = match (&player, &agent) {
            (Some(p), Some(a)) => {
                let d = a.ctx.motion.horizontal_position() - p.ctx.motion.horizontal_position();
                Some(d.length())
            }
            _ => None,
        };
        PilotView {
            tick: self.clock.tick,
            state: player.as_ref().and_then(|p| p.state()),
            stamina: player.as_ref().map_or(0.0, |p| p.ctx.resources.stamina()),
            opponent_state: agent.as_ref().and_then(|a| a.state()),
            opponent_distance: distance,
        }
    }

    /// The player character, mutably borrowed from the world.
    pub fn player_mut(&mut self) -> Option<hecs::RefMut<'_, Character>> {
        self.world
            .get::<&mut Character>(self.player)
            .ok()
            .filter(|c| c.ctx.is_player())
    }

    /// Advance the arena by one fixed step.
    pub fn step(&mut self, pilot: &mut dyn Pilot) {
        let dt = self.clock.dt;

        begin_input_frame(&mut self.world);
        let view = self.view();
        if let Some(mut character) = self.player_mut() {
            if let Some(input) = character.ctx.control.player_mut() {
                pilot.drive(&view, input);
            }
        }

        targeting_system(&mut self.world);
        animation_system(&mut self.world, &self.clips, dt);
        character_tick_system(&mut self.world, dt);
        hit_detection_system(&mut self.world);
        combat_message_system(&mut self.world);

        let tick = self.clock.tick;
        self.transitions.extend(state_event_system(&mut self.world, tick));
        self.clock.advance();
    }

    pub fn run(&mut self, ticks: u64, pilot: &mut dyn Pilot) {
        for _ in 0..ticks {
            self.step(pilot);
        }
        info!(ticks, elapsed = self.clock.elapsed(), "arena run finished");
    }

    pub fn state_of(&self, entity: Entity) -> Option<StateId> {
        self.world
            .get::<&Character>(entity)
            .ok()
            .and_then(|c| c.state())
    }

    /// States `entity` entered, oldest first.
    pub fn entered(&self, entity: Entity) -> Vec<StateId> {
        use crate::states::events::StateEvent;
        self.transitions
            .iter()
            .filter(|t| t.entity == entity)
            .filter_map(|t| match t.event {
                StateEvent::Entered(state) => Some(state),
                StateEvent::Exited(_) => None,
            })
            .collect()
    }

    pub fn summary(&self) -> Vec<Summary> {
        let mut rows = Vec::new();
        for (_entity, (character, name)) in self.world.query::<(&Character, &Name)>().iter() {
            let ctx = &character.ctx;
            rows.push(Summary {
                name: name.0.clone(),
                state: character.state(),
                health: ctx.resources.health(),
                max_health: ctx.resources.max_health(),
                stamina: ctx.resources.stamina(),
                max_stamina: ctx.resources.max_stamina(),
            });
        }
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        rows
    }
}

/// End-of-run line for one character.
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub name: String,
    pub state: Option<StateId>,
    pub health: i32,
    pub max_health: i32,
    pub stamina: f32,
    pub max_stamina: f32,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<8} {:<16} health {:>4}/{:<4} stamina {:>6.1}/{:.1}",
            self.name,
            self.state.map_or("uninitialized", |s| s.name()),
            self.health,
            self.max_health,
            self.stamina,
            self.max_stamina,
        )
    }
}
