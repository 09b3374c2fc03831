//! Hierarchical character state machine for third-person action combat.
//!
//! Characters live in a `hecs` world. Each owns a [`fsm::StateMachine`] whose
//! states read and write a [`components::CharacterContext`]; the systems in
//! [`systems`] feed it targeting, animation checkpoints and hits.
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod fsm;
pub mod scene;
pub mod states;
pub mod systems;
