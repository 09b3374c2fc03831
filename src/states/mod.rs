pub mod action;
pub mod air;
pub mod base;
pub mod death;
pub mod events;
pub mod ground;

use crate::components::CharacterContext;
use crate::config::{MovementConfig, StatsConfig};

use self::action::ActionState;
use self::air::AirMotionState;
use self::death::DeathState;
use self::events::{CharacterEvent, Registration};
use self::ground::GroundMotionState;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Every state a character can be in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateId {
    Idle,
    Walk,
    Sprint,
    Jump,
    Fall,
    Attack,
    BackStep,
    Parry,
    ParryStab,
    Parried,
    ParriedStabbed,
    Roll,
    Hit,
    Death,
}

/// The shared-policy group a state belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    GroundMotion,
    AirMotion,
    Temporary,
    Terminal,
}

/// How a state spends stamina.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StaminaPolicy {
    Free,
    /// Regains `recovery_rate` per second while active.
    Recover,
    /// Spends `consumption_rate` per second while active.
    Consume,
    /// Spends `action_cost` once on entry.
    Fixed,
}

impl StateId {
    pub const ALL: [StateId; 14] = [
        StateId::Idle,
        StateId::Walk,
        StateId::Sprint,
        StateId::Jump,
        StateId::Fall,
        StateId::Attack,
        StateId::BackStep,
        StateId::Parry,
        StateId::ParryStab,
        StateId::Parried,
        StateId::ParriedStabbed,
        StateId::Roll,
        StateId::Hit,
        StateId::Death,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Walk => "walk",
            Self::Sprint => "sprint",
            Self::Jump => "jump",
            Self::Fall => "fall",
            Self::Attack => "attack",
            Self::BackStep => "back_step",
            Self::Parry => "parry",
            Self::ParryStab => "parry_stab",
            Self::Parried => "parried",
            Self::ParriedStabbed => "parried_stabbed",
            Self::Roll => "roll",
            Self::Hit => "hit",
            Self::Death => "death",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    pub fn family(self) -> Family {
        match self {
            Self::Idle | Self::Walk | Self::Sprint => Family::GroundMotion,
            Self::Jump | Self::Fall => Family::AirMotion,
            Self::Death => Family::Terminal,
            Self::Attack
            | Self::BackStep
            | Self::Parry
            | Self::ParryStab
            | Self::Parried
            | Self::ParriedStabbed
            | Self::Roll
            | Self::Hit => Family::Temporary,
        }
    }

    pub fn stamina_policy(self) -> StaminaPolicy {
        match self {
            Self::Idle | Self::Walk => StaminaPolicy::Recover,
            Self::Sprint => StaminaPolicy::Consume,
            Self::Jump
            | Self::Attack
            | Self::BackStep
            | Self::Parry
            | Self::ParryStab
            | Self::Roll => StaminaPolicy::Fixed,
            Self::Fall | Self::Parried | Self::ParriedStabbed | Self::Hit | Self::Death => {
                StaminaPolicy::Free
            }
        }
    }

    /// Stamina this state costs for a tick of `dt` seconds. Positive spends,
    /// negative recovers.
    pub fn stamina_cost(self, stats: &StatsConfig, dt: f32) -> f32 {
        match self.stamina_policy() {
            StaminaPolicy::Free => 0.0,
            StaminaPolicy::Recover => -stats.recovery_rate * dt,
            StaminaPolicy::Consume => stats.consumption_rate * dt,
            StaminaPolicy::Fixed => stats.action_cost,
        }
    }

    /// Animator trigger fired when this state is entered.
    pub fn animation_trigger(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Walk => "Walk",
            Self::Sprint => "Sprint",
            Self::Jump => "Jump",
            Self::Fall => "Fall",
            Self::Attack => "Attack",
            Self::BackStep => "BackStep",
            Self::Parry => "Parry",
            Self::ParryStab => "ParryStab",
            Self::Parried => "Parried",
            Self::ParriedStabbed => "ParriedStabbed",
            Self::Roll => "Roll",
            Self::Hit => "Hit",
            Self::Death => "Death",
        }
    }

    /// Navigation speed an agent uses while this state is active.
    pub fn agent_speed(self, movement: &MovementConfig) -> f32 {
        match self {
            Self::Walk => movement.walk_speed,
            Self::Sprint => movement.sprint_speed,
            _ => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// State interface
// ---------------------------------------------------------------------------

/// One unit of character behavior.
///
/// States never switch themselves; `handle_transitions` and `on_event`
/// return the id to switch to and the [`StateMachine`](crate::fsm::StateMachine)
/// performs the swap.
pub trait CharacterState: Send + Sync {
    fn id(&self) -> StateId;

    /// Reset per-activation fields and register for events.
    fn enter(&mut self, ctx: &mut CharacterContext, registration: &mut Registration<'_>);

    /// Registrations are released by the machine after this returns.
    fn exit(&mut self, _ctx: &mut CharacterContext) {}

    fn tick(&mut self, ctx: &mut CharacterContext);

    fn handle_transitions(&mut self, ctx: &mut CharacterContext) -> Option<StateId>;

    fn move_tick(&mut self, ctx: &mut CharacterContext);

    fn rotate_tick(&mut self, ctx: &mut CharacterContext);

    /// Called only for events this activation subscribed to.
    fn on_event(&mut self, event: &CharacterEvent, ctx: &mut CharacterContext) -> Option<StateId>;
}

/// Every state instance a character owns, built once at spawn.
pub struct StateSet {
    idle: GroundMotionState,
    walk: GroundMotionState,
    sprint: GroundMotionState,
    jump: AirMotionState,
    fall: AirMotionState,
    attack: ActionState,
    back_step: ActionState,
    parry: ActionState,
    parry_stab: ActionState,
    parried: ActionState,
    parried_stabbed: ActionState,
    roll: ActionState,
    hit: ActionState,
    death: DeathState,
}

impl Default for StateSet {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSet {
    pub fn new() -> Self {
        Self {
            idle: GroundMotionState::idle(),
            walk: GroundMotionState::walk(),
            sprint: GroundMotionState::sprint(),
            jump: AirMotionState::jump(),
            fall: AirMotionState::fall(),
            attack: ActionState::new(StateId::Attack),
            back_step: ActionState::new(StateId::BackStep),
            parry: ActionState::new(StateId::Parry),
            parry_stab: ActionState::new(StateId::ParryStab),
            parried: ActionState::new(StateId::Parried),
            parried_stabbed: ActionState::new(StateId::ParriedStabbed),
            roll: ActionState::new(StateId::Roll),
            hit: ActionState::new(StateId::Hit),
            death: DeathState::new(),
        }
    }

    pub fn get(&self, id: StateId) -> &dyn CharacterState {
        match id {
            StateId::Idle => &self.idle,
            StateId::Walk => &self.walk,
            StateId::Sprint => &self.sprint,
            StateId::Jump => &self.jump,
            StateId::Fall => &self.fall,
            StateId::Attack => &self.attack,
            StateId::BackStep => &self.back_step,
            StateId::Parry => &self.parry,
            StateId::ParryStab => &self.parry_stab,
            StateId::Parried => &self.parried,
            StateId::ParriedStabbed => &self.parried_stabbed,
            StateId::Roll => &self.roll,
            StateId::Hit => &self.hit,
            StateId::Death => &self.death,
        }
    }

    pub fn get_mut(&mut self, id: StateId) -> &mut dyn CharacterState {
        match id {
            StateId::Idle => &mut self.idle,
            StateId::Walk => &mut self.walk,
            StateId::Sprint => &mut self.sprint,
            StateId::Jump => &mut self.jump,
            StateId::Fall => &mut self.fall,
            StateId::Attack => &mut self.attack,
            StateId::BackStep => &mut self.back_step,
            StateId::Parry => &mut self.parry,
            StateId::ParryStab => &mut self.parry_stab,
            StateId::Parried => &mut self.parried,
            StateId::ParriedStabbed => &mut self.parried_stabbed,
            StateId::Roll => &mut self.roll,
            StateId::Hit => &mut self.hit,
            StateId::Death => &mut self.death,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_set_ids_match() {
        let states = StateSet::new();
        for id in StateId::ALL {
            assert_eq!(states.get(id).id(), id);
        }
    }

    #[test]
    fn test_names_round_trip() {
        for id in StateId::ALL {
            assert_eq!(StateId::from_name(id.name()), Some(id));
        }
    }

    #[test]
    fn test_stamina_costs() {
        let stats = StatsConfig::default();
        assert!(StateId::Idle.stamina_cost(&stats, 0.1) < 0.0);
        assert!(StateId::Sprint.stamina_cost(&stats, 0.1) > 0.0);
        assert_eq!(StateId::Attack.stamina_cost(&stats, 0.1), 20.0);
        assert_eq!(StateId::Parried.stamina_cost(&stats, 0.1), 0.0);
    }

    #[test]
    fn test_agent_speed_by_state() {
        let movement = MovementConfig::default();
        assert_eq!(StateId::Idle.agent_speed(&movement), 0.0);
        assert_eq!(StateId::Sprint.agent_speed(&movement), 6.0);
    }
}
