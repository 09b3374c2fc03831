pub mod agent;
pub mod character;
pub mod combat;
pub mod physics;
pub mod stats;

pub use agent::{AttackDelay, Difficulty};
pub use character::{Agent, Character, CharacterContext, Name, Player};
pub use combat::{
    footprints_overlap, CombatMessage, CombatTargeting, HitDirection, HitInformation,
    HitReceiver, TargetInfo,
};
pub use physics::{FlatGround, MotionState, MovementIntegrator, Sweep};
pub use stats::{PoolEvent, ResourcePool};
