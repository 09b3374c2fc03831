use std::collections::HashMap;

use hecs::World;
use tracing::warn;

use crate::components::Character;
use crate::config::AnimationConfig;
use crate::states::events::{CharacterEvent, Checkpoint};
use crate::states::StateId;

// ---------------------------------------------------------------------------
// Clip table
// ---------------------------------------------------------------------------

/// Authored checkpoints for one state's animation.
#[derive(Debug, Clone, Default)]
pub struct Clip {
    pub duration: f32,
    pub looping: bool,
    /// Sorted by time.
    pub marks: Vec<(f32, Checkpoint)>,
}

/// Clips resolved from config. States without a clip emit nothing.
#[derive(Debug, Clone, Default)]
pub struct AnimationClips {
    clips: HashMap<StateId, Clip>,
}

impl AnimationClips {
    /// Resolve names. Unknown states and checkpoints are warned about and skipped.
    pub fn from_config(config: &AnimationConfig) -> Self {
        let mut clips = HashMap::new();
        for (state_name, clip) in &config.clips {
            let Some(state) = StateId::from_name(state_name) else {
                warn!(clip = %state_name, "animation clip for unknown state skipped");
                continue;
            };

            let mut marks: Vec<(f32, Checkpoint)> = Vec::with_capacity(clip.checkpoints.len());
            for mark in &clip.checkpoints {
                match mark.name.parse::<Checkpoint>() {
                    Ok(checkpoint) => marks.push((mark.at, checkpoint)),
                    Err(err) => warn!(clip = %state_name, "{err}; mark skipped"),
                }
            }
            marks.sort_by(|a, b| a.0.total_cmp(&b.0));

            clips.insert(
                state,
                Clip {
                    duration: clip.duration,
                    looping: clip.looping,
                    marks,
                },
            );
        }
        Self { clips }
    }

    pub fn get(&self, state: StateId) -> Option<&Clip> {
        self.clips.get(&state)
    }
}

impl Clip {
    /// Checkpoints crossed moving the clock from `from` to `to`, plus
    /// `animation_end` when a one-shot clip finishes.
    pub fn crossed(&self, from: f32, to: f32) -> Vec<Checkpoint> {
        let mut crossed: Vec<Checkpoint> = self
            .marks
            .iter()
            .filter(|(at, _)| (*at > from || (from == 0.0 && *at <= 0.0)) && *at <= to)
            .map(|(_, checkpoint)| *checkpoint)
            .collect();
        if !self.looping && self.duration > from && self.duration <= to {
            crossed.push(Checkpoint::AnimationEnd);
        }
        crossed
    }
}

// ---------------------------------------------------------------------------
// Player component
// ---------------------------------------------------------------------------

/// Per-character clip clock. Restarts whenever the machine enters a state.
#[derive(Debug, Default)]
pub struct AnimationPlayer {
    activation: Option<u64>,
    pub clock: f32,
    pub trigger: &'static str,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Advance every character's clip and deliver the checkpoints it crosses.
/// Runs before `character_tick_system` so the states see this tick's marks.
pub fn animation_system(world: &mut World, clips: &AnimationClips, dt: f32) {
    for (_entity, (character, player)) in
        world.query_mut::<(&mut Character, &mut AnimationPlayer)>()
    {
        let Some(state) = character.state() else {
            continue;
        };

        let activation = character.machine.activation();
        if player.activation != Some(activation) {
            player.activation = Some(activation);
            player.clock = 0.0;
            player.trigger = state.animation_trigger();
        }

        let from = player.clock;
        player.clock += dt;
        let Some(clip) = clips.get(state) else {
            continue;
        };

        for checkpoint in clip.crossed(from, player.clock) {
            character.deliver(CharacterEvent::Checkpoint(checkpoint));
            // The rest of the clip belongs to an activation that just ended.
            if character.machine.activation() != activation {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CheckpointMark, ClipConfig};

    fn clip() -> Clip {
        Clip {
            duration: 1.0,
            looping: false,
            marks: vec![
                (0.0, Checkpoint::IFramesStart),
                (0.25, Checkpoint::HitFramesStart),
                (0.5, Checkpoint::ActionCancelable),
            ],
        }
    }

    #[test]
    fn test_crossed_includes_time_zero_once() {
        let clip = clip();
        assert_eq!(clip.crossed(0.0, 0.125), vec![Checkpoint::IFramesStart]);
        assert!(clip.crossed(0.125, 0.2).is_empty());
    }

    #[test]
    fn test_crossed_emits_animation_end() {
        let clip = clip();
        assert_eq!(clip.crossed(0.375, 1.125), vec![
            Checkpoint::ActionCancelable,
            Checkpoint::AnimationEnd
        ]);
        assert!(clip.crossed(1.125, 2.0).is_empty());
    }

    #[test]
    fn test_from_config_skips_unknown_names() {
        let mut config = AnimationConfig { clips: Default::default() };
        config.clips.insert(
            "attack".to_string(),
            ClipConfig {
                duration: 0.5,
                looping: false,
                checkpoints: vec![
                    CheckpointMark { at: 0.3, name: "on_action_cancelable".to_string() },
                    CheckpointMark { at: 0.1, name: "cartwheel".to_string() },
                ],
            },
        );
        config.clips.insert("moonwalk".to_string(), ClipConfig::default());

        let clips = AnimationClips::from_config(&config);
        let attack = clips.get(StateId::Attack).unwrap();
        assert_eq!(attack.marks, vec![(0.3, Checkpoint::ActionCancelable)]);
        assert!(clips.get(StateId::Idle).is_none());
    }

    #[test]
    fn test_default_clips_resolve_cleanly() {
        let config = AnimationConfig::default();
        let clips = AnimationClips::from_config(&config);
        for (name, clip) in &config.clips {
            let state = StateId::from_name(name).unwrap();
            assert_eq!(clips.get(state).unwrap().marks.len(), clip.checkpoints.len());
        }
    }
}
