use std::fmt;

use glam::Vec3;
use hecs::Entity;

use crate::engine::time::Timer;
use crate::states::events::Partner;

/// Which side of the defender a hit landed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HitDirection {
    Front,
    Back,
}

/// An immutable hit record produced by hit detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HitInformation {
    pub damage: i32,
    pub direction: HitDirection,
}

impl HitInformation {
    /// Classify a hit by whether the defender faces the attacker.
    pub fn from_facing(damage: i32, defender_forward: Vec3, to_attacker: Vec3) -> Self {
        let direction = if defender_forward.dot(to_attacker) >= 0.0 {
            HitDirection::Front
        } else {
            HitDirection::Back
        };
        Self { damage, direction }
    }
}

impl fmt::Display for HitInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} damage from the {:?}", self.damage, self.direction)
    }
}

// ---------------------------------------------------------------------------
// Targeting
// ---------------------------------------------------------------------------

/// A looked-up view of another character. Never owns it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetInfo {
    pub entity: Entity,
    pub position: Vec3,
    pub radius: f32,
}

/// Targeting answers refreshed by the arena before each tick.
#[derive(Debug, Default)]
pub struct CombatTargeting {
    pub lock_on: bool,
    pub target: Option<TargetInfo>,
    /// Whether this character's footprint overlaps its target's.
    pub overlapping_target: bool,
    /// Nearest parried opponent that can be stabbed right now.
    pub reachable_parried: Option<TargetInfo>,
    /// Who stabbed this character, recorded when the stab notification arrives.
    pub stabber: Option<Partner>,
    /// True exactly while the Parried state is active.
    pub is_parried: bool,
}

impl CombatTargeting {
    pub fn target_position(&self) -> Option<Vec3> {
        self.target.map(|t| t.position)
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }
}

/// Square footprints overlap on both horizontal axes.
pub fn footprints_overlap(a: Vec3, a_radius: f32, b: Vec3, b_radius: f32) -> bool {
    let reach = a_radius + b_radius;
    (a.x - b.x).abs() <= reach && (a.z - b.z).abs() <= reach
}

// ---------------------------------------------------------------------------
// Hit receiving
// ---------------------------------------------------------------------------

/// Damage windows toggled by animation checkpoints.
#[derive(Debug, Default)]
pub struct HitReceiver {
    pub is_parrying: bool,
    pub i_frames: bool,
    pub weapon_active: bool,
    /// Opponents already struck during the open weapon window.
    pub struck: Vec<Entity>,
    invincibility: Timer,
}

impl HitReceiver {
    pub fn can_take_damage(&self) -> bool {
        !self.i_frames && !self.invincibility.is_running()
    }

    pub fn start_invincibility(&mut self, seconds: f32) {
        self.invincibility.start(seconds);
    }

    pub fn update(&mut self, dt: f32) {
        let _expired = self.invincibility.update(dt);
    }

    pub fn open_weapon(&mut self) {
        self.weapon_active = true;
        self.struck.clear();
    }

    pub fn close_weapon(&mut self) {
        self.weapon_active = false;
    }

    /// Close every checkpoint-driven window. Runs on each state exit.
    pub fn reset_windows(&mut self) {
        self.is_parrying = false;
        self.i_frames = false;
        self.close_weapon();
    }
}

/// One-way notifications between characters, routed by the arena.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CombatMessage {
    ParryStabbed { victim: Entity, stabber: Partner },
}
