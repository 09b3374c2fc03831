use std::sync::Arc;

use glam::Vec3;
use hecs::{Entity, World};

use crate::components::*;
use crate::config::CharacterConfig;
use crate::engine::input::{AgentSense, ControlSource, PlayerInput};
use crate::systems::AnimationPlayer;

/// Spawn a player-controlled character facing `yaw`. Its machine starts on the
/// first `initialize_characters` pass.
pub fn spawn_player(
    world: &mut World,
    config: &CharacterConfig,
    integrator: Arc<dyn MovementIntegrator>,
    pos: Vec3,
    yaw: f32,
) -> Entity {
    let entity = world.reserve_entity();
    let ctx = CharacterContext::new(
        entity,
        config.clone(),
        ControlSource::Player(PlayerInput::new()),
        pos,
        yaw,
        integrator,
    );

    world.spawn_at(
        entity,
        (
            Character::new(ctx),
            AnimationPlayer::default(),
            Player,
            Name("player".to_string()),
        ),
    );
    entity
}

/// Spawn an AI-controlled character. Health, stamina and damage scale with
/// `difficulty`; attack pacing draws from an RNG seeded with `seed`.
pub fn spawn_agent(
    world: &mut World,
    config: &CharacterConfig,
    integrator: Arc<dyn MovementIntegrator>,
    pos: Vec3,
    yaw: f32,
    difficulty: Difficulty,
    seed: u64,
) -> Entity {
    let mut config = config.clone();
    config.stats = config.stats.scaled_for(&config.agent, difficulty.value());

    let attack_delay = AttackDelay::new(&config.agent, difficulty, seed);
    let entity = world.reserve_entity();
    let ctx = CharacterContext::new(
        entity,
        config,
        ControlSource::Agent(AgentSense::default()),
        pos,
        yaw,
        integrator,
    )
    .with_attack_delay(attack_delay);

    world.spawn_at(
        entity,
        (
            Character::new(ctx),
            AnimationPlayer::default(),
            Agent,
            difficulty,
            Name("agent".to_string()),
        ),
    );
    entity
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_stats_scale_with_difficulty() {
        let mut world = World::new();
        let ground: Arc<dyn MovementIntegrator> = Arc::new(FlatGround::default());
        let config = CharacterConfig::default();

        let easy = spawn_agent(&mut world, &config, ground.clone(), Vec3::ZERO, 0.0, Difficulty::new(0.0), 1);
        let hard = spawn_agent(&mut world, &config, ground, Vec3::X, 0.0, Difficulty::new(1.0), 1);

        let easy = world.get::<&Character>(easy).unwrap();
        let hard = world.get::<&Character>(hard).unwrap();
        assert_eq!(easy.ctx.resources.max_health(), 100);
        assert_eq!(hard.ctx.resources.max_health(), 160);
        assert_eq!(hard.ctx.resources.damage(), 30);
        assert!(easy.ctx.attack_delay.is_some());
    }

    #[test]
    fn test_player_spawns_uninitialized() {
        let mut world = World::new();
        let ground: Arc<dyn MovementIntegrator> = Arc::new(FlatGround::default());
        let player = spawn_player(&mut world, &CharacterConfig::default(), ground, Vec3::ZERO, 0.0);

        assert!(world.get::<&Player>(player).is_ok());
        let character = world.get::<&Character>(player).unwrap();
        assert!(character.state().is_none());
        assert!(character.ctx.is_player());
    }
}
