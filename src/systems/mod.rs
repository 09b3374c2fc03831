mod animation;
mod character;
mod combat;

pub use animation::{animation_system, AnimationClips, AnimationPlayer, Clip};
pub use character::{
    begin_input_frame, character_tick_system, initialize_characters, state_event_system,
    Transition,
};
pub use combat::{combat_message_system, hit_detection_system, targeting_system};
