use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

// ---------------------------------------------------------------------------
// Per-character tables
// ---------------------------------------------------------------------------

/// Locomotion tuning shared by every state family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub walk_speed: f32,
    pub sprint_speed: f32,
    pub roll_speed: f32,
    pub back_step_speed: f32,
    pub push_speed: f32,
    pub min_air_speed: f32,
    pub ground_speed_change_rate: f32,
    pub air_speed_change_rate: f32,
    /// Seconds of horizontal air control after leaving the ground.
    pub air_control_duration: f32,
    pub air_gravity: f32,
    pub ground_gravity: f32,
    pub jump_height: f32,
    pub jump_ground_detection_timeout: f32,
    pub jump_cooldown: f32,
    pub fall_timeout: f32,
    /// Terminal vertical velocity (negative).
    pub fall_speed_limit: f32,
    pub rotation_smoothness: f32,
    pub air_rotation_multiplier: f32,
    pub air_speed_rotation_influence: f32,
    /// Window after entering a grounded state in which rotation snaps to input.
    pub action_rotation_choice_time: f32,
    pub radius: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            walk_speed: 4.0,
            sprint_speed: 6.0,
            roll_speed: 8.0,
            back_step_speed: 5.0,
            push_speed: 2.5,
            min_air_speed: 2.0,
            ground_speed_change_rate: 10.0,
            air_speed_change_rate: 1.5,
            air_control_duration: 0.75,
            air_gravity: -15.0,
            ground_gravity: -2.0,
            jump_height: 1.2,
            jump_ground_detection_timeout: 0.15,
            jump_cooldown: 0.25,
            fall_timeout: 0.2,
            fall_speed_limit: -53.0,
            rotation_smoothness: 0.1,
            air_rotation_multiplier: 3.0,
            air_speed_rotation_influence: 0.075,
            action_rotation_choice_time: 0.05,
            radius: 0.5,
        }
    }
}

/// Health, stamina and damage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub max_health: i32,
    pub max_stamina: f32,
    pub damage: i32,
    pub parry_stab_multiplier: f32,
    pub exhaustion_recovery_cooldown: f32,
    pub recovery_cooldown: f32,
    /// Stamina regained per second by recovering states.
    pub recovery_rate: f32,
    /// Stamina spent per second by sprinting.
    pub consumption_rate: f32,
    /// Flat stamina cost of an action state.
    pub action_cost: f32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            max_health: 100,
            max_stamina: 75.0,
            damage: 20,
            parry_stab_multiplier: 2.0,
            exhaustion_recovery_cooldown: 1.0,
            recovery_cooldown: 0.5,
            recovery_rate: 20.0,
            consumption_rate: 10.0,
            action_cost: 20.0,
        }
    }
}

impl StatsConfig {
    /// Stats for an agent at `difficulty` in `[0, 1]`, interpolating toward
    /// the agent table's full-difficulty values.
    pub fn scaled_for(&self, agent: &AgentConfig, difficulty: f32) -> Self {
        let t = difficulty.clamp(0.0, 1.0);
        Self {
            max_health: lerp(self.max_health as f32, agent.max_health_at_full as f32, t).round()
                as i32,
            max_stamina: lerp(self.max_stamina, agent.max_stamina_at_full, t),
            damage: lerp(self.damage as f32, agent.damage_at_full as f32, t).round() as i32,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub parry_stab_radius: f32,
    /// Stab alignment passes when `dot >= 1 - parry_stab_dot_offset`.
    pub parry_stab_dot_offset: f32,
    pub parry_stab_stopping_distance: f32,
    pub weapon_reach: f32,
    /// Minimum dot between attacker forward and direction to the victim.
    pub weapon_arc_dot: f32,
    pub invincibility_time: f32,
    pub target_detection_radius: f32,
    pub attacks_enabled: bool,
    pub lock_on: bool,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            parry_stab_radius: 2.0,
            parry_stab_dot_offset: 1.0,
            parry_stab_stopping_distance: 1.1,
            weapon_reach: 1.8,
            weapon_arc_dot: 0.3,
            invincibility_time: 0.2,
            target_detection_radius: 15.0,
            attacks_enabled: true,
            lock_on: true,
        }
    }
}

/// Distance queries and attack pacing for AI-controlled characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub stopping_distance: f32,
    pub reach_offset: f32,
    pub far_distance_start: f32,
    pub far_distance_end: f32,
    pub attack_delay_start: f32,
    pub attack_delay_end: f32,
    /// Difficulty at or above which attack delays are randomized.
    pub randomization_threshold: f32,
    pub reset_delay_out_of_range: bool,
    pub max_health_at_full: i32,
    pub max_stamina_at_full: f32,
    pub damage_at_full: i32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            stopping_distance: 1.5,
            reach_offset: 0.05,
            far_distance_start: 5.0,
            far_distance_end: 3.5,
            attack_delay_start: 2.0,
            attack_delay_end: 0.6,
            randomization_threshold: 0.8,
            reset_delay_out_of_range: true,
            max_health_at_full: 160,
            max_stamina_at_full: 110.0,
            damage_at_full: 30,
        }
    }
}

impl AgentConfig {
    pub fn far_distance(&self, difficulty: f32) -> f32 {
        lerp(self.far_distance_start, self.far_distance_end, difficulty.clamp(0.0, 1.0))
    }

    pub fn attack_delay(&self, difficulty: f32) -> f32 {
        lerp(self.attack_delay_start, self.attack_delay_end, difficulty.clamp(0.0, 1.0))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    pub movement: MovementConfig,
    pub stats: StatsConfig,
    pub combat: CombatConfig,
    pub agent: AgentConfig,
}

// ---------------------------------------------------------------------------
// Animation clips
// ---------------------------------------------------------------------------

/// A checkpoint authored at `at` seconds into a clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMark {
    pub at: f32,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    pub duration: f32,
    pub looping: bool,
    pub checkpoints: Vec<CheckpointMark>,
}

/// Clip table keyed by state name (`attack`, `roll`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub clips: BTreeMap<String, ClipConfig>,
}

fn clip(duration: f32, marks: &[(f32, &str)]) -> ClipConfig {
    ClipConfig {
        duration,
        looping: false,
        checkpoints: marks
            .iter()
            .map(|(at, name)| CheckpointMark {
                at: *at,
                name: (*name).to_string(),
            })
            .collect(),
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        let mut clips = BTreeMap::new();
        clips.insert(
            "attack".to_string(),
            clip(
                0.9,
                &[
                    (0.25, "hit_frames_start"),
                    (0.4, "hit_frames_end"),
                    (0.5, "action_cancelable"),
                    (0.7, "movement_cancelable"),
                ],
            ),
        );
        clips.insert(
            "back_step".to_string(),
            clip(
                0.6,
                &[
                    (0.05, "i_frames_start"),
                    (0.3, "i_frames_end"),
                    (0.35, "air_momentum_end"),
                    (0.4, "action_cancelable"),
                    (0.5, "movement_cancelable"),
                ],
            ),
        );
        clips.insert(
            "parry".to_string(),
            clip(
                0.8,
                &[
                    (0.05, "parry_frames_start"),
                    (0.35, "parry_frames_end"),
                    (0.5, "action_cancelable"),
                    (0.65, "movement_cancelable"),
                ],
            ),
        );
        clips.insert(
            "parry_stab".to_string(),
            clip(1.4, &[(1.0, "action_cancelable"), (1.2, "movement_cancelable")]),
        );
        clips.insert(
            "parried".to_string(),
            clip(2.0, &[(1.8, "movement_cancelable")]),
        );
        clips.insert(
            "parried_stabbed".to_string(),
            clip(
                2.2,
                &[
                    (0.3, "stop_rotating_towards_stabber"),
                    (0.5, "push_start"),
                    (0.6, "stab_hit_taken"),
                    (0.9, "push_end"),
                    (1.2, "death_check"),
                    (1.8, "action_cancelable"),
                    (2.0, "movement_cancelable"),
                ],
            ),
        );
        clips.insert(
            "roll".to_string(),
            clip(
                0.8,
                &[
                    (0.05, "i_frames_start"),
                    (0.4, "i_frames_end"),
                    (0.45, "can_control_direction"),
                    (0.5, "air_momentum_end"),
                    (0.55, "action_cancelable"),
                    (0.65, "movement_cancelable"),
                ],
            ),
        );
        clips.insert(
            "hit".to_string(),
            clip(0.5, &[(0.3, "action_cancelable"), (0.4, "movement_cancelable")]),
        );
        clips.insert("death".to_string(), clip(2.0, &[]));
        Self { clips }
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Top-level config for a headless arena run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub tick_rate: f32,
    /// Normalized agent difficulty in `[0, 1]`.
    pub difficulty: f32,
    pub seed: u64,
    pub player: CharacterConfig,
    pub agent: CharacterConfig,
    pub animation: AnimationConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            difficulty: 0.5,
            seed: 7,
            player: CharacterConfig::default(),
            agent: CharacterConfig::default(),
            animation: AnimationConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.tick_rate > 0.0) {
            return Err(invalid("tick_rate", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.difficulty) {
            return Err(invalid("difficulty", "must be within [0, 1]"));
        }
        for side in [&self.player, &self.agent] {
            side.validate()?;
        }
        for (name, clip) in &self.animation.clips {
            if clip.duration < 0.0 {
                return Err(invalid("animation.clips", format!("clip `{name}` has negative duration")));
            }
        }
        Ok(())
    }
}

impl CharacterConfig {
    pub fn validate(&self) -> Result<()> {
        let m = &self.movement;
        let speeds = [
            m.walk_speed,
            m.sprint_speed,
            m.roll_speed,
            m.back_step_speed,
            m.push_speed,
            m.min_air_speed,
        ];
        if speeds.iter().any(|s| *s < 0.0) {
            return Err(invalid("movement", "speeds must be non-negative"));
        }
        if m.air_gravity >= 0.0 {
            return Err(invalid("movement.air_gravity", "must be negative"));
        }
        if self.stats.max_stamina <= 0.0 {
            return Err(invalid("stats.max_stamina", "must be positive"));
        }
        if self.stats.max_health <= 0 {
            return Err(invalid("stats.max_health", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
