pub mod arena;
pub mod prefabs;

pub use arena::{Arena, NoInput, Pilot, PilotView, Scenario, Summary};
