use std::collections::HashSet;

use glam::{Vec2, Vec3};

/// Discrete player actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Attack,
    BackStep,
    Parry,
    Roll,
    Jump,
    Sprint,
}

/// The single most recent action latched while an action state plays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputBuffer {
    #[default]
    None,
    Attack,
    BackStep,
    Parry,
    Roll,
}

impl InputBuffer {
    fn from_action(action: Action) -> Option<Self> {
        match action {
            Action::Attack => Some(Self::Attack),
            Action::BackStep => Some(Self::BackStep),
            Action::Parry => Some(Self::Parry),
            Action::Roll => Some(Self::Roll),
            Action::Jump | Action::Sprint => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Player input
// ---------------------------------------------------------------------------

/// Per-frame input for a player-controlled character.
///
/// `pressed` holds actions that went down this frame and is cleared by
/// [`PlayerInput::begin_frame`]; `held` persists until release.
#[derive(Debug, Default)]
pub struct PlayerInput {
    held: HashSet<Action>,
    pressed: HashSet<Action>,
    move_axis: Vec2,
    /// Camera heading in radians; input is interpreted relative to it.
    pub view_yaw: f32,
    last_non_zero_move: Vec2,
    air_entry_move: Vec2,
    buffer: InputBuffer,
}

impl PlayerInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_frame(&mut self) {
        self.pressed.clear();
    }

    /// Key-down edge. Repeats while already held are ignored.
    pub fn press(&mut self, action: Action) {
        if self.held.insert(action) {
            self.pressed.insert(action);
            if let Some(buffered) = InputBuffer::from_action(action) {
                self.buffer = buffered;
            }
        }
    }

    pub fn release(&mut self, action: Action) {
        self.held.remove(&action);
    }

    /// Set the movement vector (x = strafe right, y = forward), clamped to unit length.
    pub fn set_move(&mut self, axis: Vec2) {
        self.move_axis = axis.clamp_length_max(1.0);
        if self.move_axis != Vec2::ZERO {
            self.last_non_zero_move = self.move_axis;
        }
    }

    pub fn was_pressed(&self, action: Action) -> bool {
        self.pressed.contains(&action)
    }

    pub fn is_held(&self, action: Action) -> bool {
        self.held.contains(&action)
    }

    /// An action whose interaction has started and not yet been released.
    pub fn is_in_progress(&self, action: Action) -> bool {
        self.held.contains(&action) && !self.pressed.contains(&action)
    }

    pub fn move_axis(&self) -> Vec2 {
        self.move_axis
    }

    pub fn is_moving(&self) -> bool {
        self.move_axis != Vec2::ZERO
    }

    pub fn last_non_zero_move(&self) -> Vec2 {
        self.last_non_zero_move
    }

    pub fn air_entry_move(&self) -> Vec2 {
        self.air_entry_move
    }

    pub fn capture_air_entry(&mut self) {
        self.air_entry_move = self.move_axis;
    }

    pub fn buffer(&self) -> InputBuffer {
        self.buffer
    }

    pub fn reset_buffer(&mut self) {
        self.buffer = InputBuffer::None;
    }
}

// ---------------------------------------------------------------------------
// Agent sensing
// ---------------------------------------------------------------------------

/// Distance queries answered for an AI-controlled character each tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct AgentSense {
    pub has_reached_destination: bool,
    pub is_far_from_destination: bool,
    /// Horizontal world-space direction toward the destination (zero if none).
    pub heading: Vec3,
}

// ---------------------------------------------------------------------------
// Control source
// ---------------------------------------------------------------------------

/// Where a character's decisions come from.
#[derive(Debug)]
pub enum ControlSource {
    Player(PlayerInput),
    Agent(AgentSense),
}

impl ControlSource {
    pub fn is_player(&self) -> bool {
        matches!(self, Self::Player(_))
    }

    pub fn player(&self) -> Option<&PlayerInput> {
        match self {
            Self::Player(input) => Some(input),
            Self::Agent(_) => None,
        }
    }

    pub fn player_mut(&mut self) -> Option<&mut PlayerInput> {
        match self {
            Self::Player(input) => Some(input),
            Self::Agent(_) => None,
        }
    }

    pub fn agent(&self) -> Option<&AgentSense> {
        match self {
            Self::Agent(sense) => Some(sense),
            Self::Player(_) => None,
        }
    }

    pub fn agent_mut(&mut self) -> Option<&mut AgentSense> {
        match self {
            Self::Agent(sense) => Some(sense),
            Self::Player(_) => None,
        }
    }

    /// Normalized intent to move: input length for players, 1 for agents
    /// still travelling to their destination.
    pub fn move_magnitude(&self) -> f32 {
        match self {
            Self::Player(input) => input.move_axis.length(),
            Self::Agent(sense) => {
                if sense.has_reached_destination {
                    0.0
                } else {
                    1.0
                }
            }
        }
    }

    pub fn was_pressed(&self, action: Action) -> bool {
        self.player().is_some_and(|input| input.was_pressed(action))
    }

    pub fn is_held(&self, action: Action) -> bool {
        self.player().is_some_and(|input| input.is_held(action))
    }

    pub fn is_in_progress(&self, action: Action) -> bool {
        self.player().is_some_and(|input| input.is_in_progress(action))
    }

    pub fn is_moving(&self) -> bool {
        self.player().is_some_and(PlayerInput::is_moving)
    }
}
