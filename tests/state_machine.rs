use std::sync::Arc;

use glam::{Vec2, Vec3};
use hecs::World;
use proptest::prelude::*;

use riposte::components::{
    Character, CharacterContext, CombatMessage, FlatGround, HitDirection, HitInformation,
    MovementIntegrator, Sweep, TargetInfo,
};
use riposte::config::CharacterConfig;
use riposte::engine::input::{Action, AgentSense, ControlSource, InputBuffer, PlayerInput};
use riposte::states::events::{CharacterEvent, Checkpoint, Partner, StateEvent};
use riposte::states::StateId;

const DT: f32 = 1.0 / 60.0;

/// No floor anywhere.
struct Void;

impl MovementIntegrator for Void {
    fn sweep(&self, _position: Vec3, displacement: Vec3, _radius: f32) -> Sweep {
        Sweep {
            displacement,
            grounded: false,
        }
    }
}

/// Always grounded; vertical motion is swallowed.
struct Sticky;

impl MovementIntegrator for Sticky {
    fn sweep(&self, _position: Vec3, displacement: Vec3, _radius: f32) -> Sweep {
        Sweep {
            displacement: Vec3::new(displacement.x, 0.0, displacement.z),
            grounded: true,
        }
    }
}

fn spawn(config: CharacterConfig, control: ControlSource) -> Character {
    spawn_on(config, control, Arc::new(FlatGround::default()))
}

fn spawn_on(
    config: CharacterConfig,
    control: ControlSource,
    integrator: Arc<dyn MovementIntegrator>,
) -> Character {
    let world = World::new();
    let ctx = CharacterContext::new(
        world.reserve_entity(),
        config,
        control,
        Vec3::ZERO,
        0.0,
        integrator,
    );
    let mut character = Character::new(ctx);
    character.initialize();
    character
}

fn player() -> Character {
    spawn(CharacterConfig::default(), ControlSource::Player(PlayerInput::new()))
}

fn input(character: &mut Character) -> &mut PlayerInput {
    character.ctx.control.player_mut().unwrap()
}

/// One frame: clear edges, apply `f` to the input, tick.
fn frame(character: &mut Character, f: impl FnOnce(&mut PlayerInput)) {
    input(character).begin_frame();
    f(input(character));
    character.tick(DT);
}

fn tap(action: Action) -> impl FnOnce(&mut PlayerInput) {
    move |input| {
        input.release(action);
        input.press(action);
    }
}

fn hit(damage: i32) -> HitInformation {
    HitInformation {
        damage,
        direction: HitDirection::Front,
    }
}

fn only_current_subscribed(character: &Character) -> bool {
    let subscriptions = character.machine.subscriptions();
    let current = character.state().unwrap();
    subscriptions.len() == subscriptions.count_for(current)
}

#[test]
fn test_starts_idle_with_base_subscriptions() {
    let mut character = player();
    assert_eq!(character.state(), Some(StateId::Idle));
    assert_eq!(character.machine.subscriptions().count_for(StateId::Idle), 2);
    assert_eq!(character.drain_state_events(), vec![StateEvent::Entered(StateId::Idle)]);
}

#[test]
fn test_move_input_walks_and_stopping_idles() {
    let mut character = player();
    frame(&mut character, |i| i.set_move(Vec2::Y));
    assert_eq!(character.state(), Some(StateId::Walk));

    frame(&mut character, |i| i.set_move(Vec2::ZERO));
    assert_eq!(character.state(), Some(StateId::Idle));
    assert_eq!(character.machine.previous(), Some(StateId::Walk));
}

#[test]
fn test_attack_round_trip_releases_subscriptions() {
    let mut character = player();
    frame(&mut character, tap(Action::Attack));
    assert_eq!(character.state(), Some(StateId::Attack));
    assert_eq!(character.ctx.resources.stamina(), 55.0);
    assert!(only_current_subscribed(&character));
    assert_eq!(character.machine.subscriptions().count_for(StateId::Attack), 6);

    character.deliver(CharacterEvent::Checkpoint(Checkpoint::AnimationEnd));
    frame(&mut character, |_| {});
    assert_eq!(character.state(), Some(StateId::Idle));
    assert!(only_current_subscribed(&character));
    assert_eq!(character.machine.subscriptions().len(), 2);
}

#[test]
fn test_every_exit_leaves_only_the_new_state_registered() {
    let mut character = player();
    let script: Vec<Box<dyn FnOnce(&mut PlayerInput)>> = vec![
        Box::new(tap(Action::Roll)),
        Box::new(|i: &mut PlayerInput| i.release(Action::Roll)),
        Box::new(tap(Action::Parry)),
        Box::new(tap(Action::BackStep)),
        Box::new(tap(Action::Jump)),
        Box::new(|i: &mut PlayerInput| i.set_move(Vec2::X)),
    ];
    for step in script {
        frame(&mut character, step);
        assert!(only_current_subscribed(&character), "{:?}", character.state());
        character.deliver(CharacterEvent::Checkpoint(Checkpoint::AnimationEnd));
        assert!(only_current_subscribed(&character), "{:?}", character.state());
    }
}

#[test]
fn test_exhausted_request_redirects_to_recovery_state() {
    let mut character = player();
    character.ctx.update_stamina(-100.0);
    assert_eq!(character.ctx.resources.stamina(), 0.0);

    frame(&mut character, tap(Action::Attack));
    assert_eq!(character.state(), Some(StateId::Idle));

    frame(&mut character, |i| i.set_move(Vec2::Y));
    assert_eq!(character.state(), Some(StateId::Walk));
    frame(&mut character, tap(Action::Attack));
    assert_eq!(character.state(), Some(StateId::Walk));
    frame(&mut character, tap(Action::Sprint));
    assert_eq!(character.state(), Some(StateId::Walk));
}

#[test]
fn test_sprint_drains_until_exhausted_then_walks() {
    let mut character = player();
    frame(&mut character, |i| i.set_move(Vec2::Y));
    frame(&mut character, |i| i.press(Action::Sprint));
    assert_eq!(character.state(), Some(StateId::Sprint));

    for _ in 0..600 {
        if character.state() != Some(StateId::Sprint) {
            break;
        }
        frame(&mut character, |_| {});
    }
    assert_eq!(character.state(), Some(StateId::Walk));
    assert_eq!(character.ctx.resources.stamina(), 0.0);
}

#[test]
fn test_buffered_press_fires_at_action_cancel() {
    let mut character = player();
    frame(&mut character, tap(Action::Attack));
    frame(&mut character, tap(Action::Parry));
    assert_eq!(character.state(), Some(StateId::Attack));
    assert_eq!(input(&mut character).buffer(), InputBuffer::Parry);

    character.deliver(CharacterEvent::Checkpoint(Checkpoint::ActionCancelable));
    frame(&mut character, |_| {});
    assert_eq!(character.state(), Some(StateId::Parry));
    assert_eq!(input(&mut character).buffer(), InputBuffer::None);
}

#[test]
fn test_held_movement_cancels_at_movement_checkpoint() {
    let mut character = player();
    frame(&mut character, tap(Action::Attack));
    frame(&mut character, |i| i.set_move(Vec2::Y));
    assert_eq!(character.state(), Some(StateId::Attack));

    character.deliver(CharacterEvent::Checkpoint(Checkpoint::MovementCancelable));
    frame(&mut character, |_| {});
    assert_eq!(character.state(), Some(StateId::Walk));
}

#[test]
fn test_held_roll_does_not_freeze_locomotion() {
    let mut character = player();
    frame(&mut character, tap(Action::Roll));
    assert_eq!(character.state(), Some(StateId::Roll));
    character.deliver(CharacterEvent::Checkpoint(Checkpoint::AnimationEnd));
    frame(&mut character, |_| {});
    assert_eq!(character.state(), Some(StateId::Idle));
    assert!(input(&mut character).is_in_progress(Action::Roll));

    frame(&mut character, |i| i.set_move(Vec2::Y));
    assert_eq!(character.state(), Some(StateId::Walk));
    frame(&mut character, |i| i.set_move(Vec2::ZERO));
    assert_eq!(character.state(), Some(StateId::Idle));
}

#[test]
fn test_held_roll_still_allows_movement_cancel() {
    let mut character = player();
    frame(&mut character, tap(Action::Attack));
    frame(&mut character, |i| i.press(Action::Roll));
    input(&mut character).reset_buffer();
    assert_eq!(character.state(), Some(StateId::Attack));

    character.deliver(CharacterEvent::Checkpoint(Checkpoint::ActionCancelable));
    character.deliver(CharacterEvent::Checkpoint(Checkpoint::MovementCancelable));
    frame(&mut character, |i| i.set_move(Vec2::Y));
    assert_eq!(character.state(), Some(StateId::Walk));
}

#[test]
fn test_held_sprint_alone_cancels_into_sprint() {
    let mut character = player();
    frame(&mut character, tap(Action::Attack));
    frame(&mut character, |i| i.press(Action::Sprint));
    assert_eq!(character.state(), Some(StateId::Attack));

    character.deliver(CharacterEvent::Checkpoint(Checkpoint::MovementCancelable));
    frame(&mut character, |_| {});
    assert_eq!(character.state(), Some(StateId::Sprint));
    frame(&mut character, |_| {});
    assert_eq!(character.state(), Some(StateId::Idle));
}

#[test]
fn test_ground_turn_is_smoothed() {
    let mut character = player();
    frame(&mut character, |i| i.set_move(Vec2::NEG_Y));
    frame(&mut character, |i| i.set_move(Vec2::NEG_Y));
    assert_eq!(character.state(), Some(StateId::Walk));

    let yaw = character.ctx.motion.yaw;
    assert!(yaw > 0.0 && yaw < std::f32::consts::FRAC_PI_2, "yaw {yaw}");
}

#[test]
fn test_air_snap_window_expires_without_input() {
    let mut character = player();
    frame(&mut character, tap(Action::Jump));
    for _ in 0..6 {
        frame(&mut character, |_| {});
    }
    assert_eq!(character.state(), Some(StateId::Jump));
    assert!(character.ctx.motion.action_rotation_window <= 0.0);

    frame(&mut character, |i| i.set_move(Vec2::NEG_Y));
    assert!(character.ctx.motion.yaw.abs() < 1.0);
}

#[test]
fn test_roll_without_movement_faces_camera() {
    let mut character = player();
    input(&mut character).view_yaw = 1.0;
    frame(&mut character, tap(Action::Roll));
    assert_eq!(character.state(), Some(StateId::Roll));
    assert!((character.ctx.motion.yaw - 1.0).abs() < 1e-5);
}

#[test]
fn test_fall_waits_for_timeout() {
    let mut character = spawn_on(
        CharacterConfig::default(),
        ControlSource::Player(PlayerInput::new()),
        Arc::new(Void),
    );

    let mut frames = 0;
    while character.state() == Some(StateId::Idle) && frames < 60 {
        frame(&mut character, |_| {});
        frames += 1;
    }
    // 0.2 s of airborne ticks before Fall.
    assert!((13..=16).contains(&frames), "fell after {frames} frames");
    assert_eq!(character.state(), Some(StateId::Fall));

    frame(&mut character, |_| {});
    assert_eq!(character.state(), Some(StateId::Fall));
}

#[test]
fn test_jump_ignores_ground_until_detection_timer_ends() {
    let mut character = spawn_on(
        CharacterConfig::default(),
        ControlSource::Player(PlayerInput::new()),
        Arc::new(Sticky),
    );
    frame(&mut character, tap(Action::Jump));
    assert_eq!(character.state(), Some(StateId::Jump));

    let mut frames = 1;
    while character.state() == Some(StateId::Jump) && frames < 60 {
        frame(&mut character, |_| {});
        frames += 1;
        assert!(character.ctx.motion.grounded);
    }
    assert!((10..=13).contains(&frames), "landed after {frames} frames");
    assert_eq!(character.state(), Some(StateId::Idle));
}

#[test]
fn test_air_combat_rotation_latches_until_landing() {
    let mut character = player();
    character.ctx.targeting.target = Some(TargetInfo {
        entity: World::new().reserve_entity(),
        position: Vec3::new(5.0, 0.0, 0.0),
        radius: 0.5,
    });
    frame(&mut character, tap(Action::Jump));
    assert_eq!(character.state(), Some(StateId::Jump));
    assert!(character.ctx.motion.yaw > 0.0);

    character.ctx.targeting.target = None;
    let yaw = character.ctx.motion.yaw;
    for _ in 0..3 {
        frame(&mut character, |i| i.set_move(Vec2::NEG_Y));
    }
    assert_eq!(character.state(), Some(StateId::Jump));
    assert_eq!(character.ctx.motion.yaw, yaw);
}

#[test]
fn test_jump_launch_then_gravity_in_first_tick() {
    let mut character = player();
    frame(&mut character, tap(Action::Jump));
    assert_eq!(character.state(), Some(StateId::Jump));
    let expected = 6.0 - 15.0 * DT;
    assert!((character.ctx.motion.vertical_velocity - expected).abs() < 1e-3);
    assert!(!character.ctx.motion.grounded);
}

#[test]
fn test_grounded_hit_reacts_and_airborne_hit_is_absorbed() {
    let mut walker = player();
    frame(&mut walker, |i| i.set_move(Vec2::Y));
    walker.receive_hit(hit(10));
    assert_eq!(walker.state(), Some(StateId::Hit));
    assert_eq!(walker.ctx.resources.health(), 90);

    let mut jumper = player();
    frame(&mut jumper, tap(Action::Jump));
    jumper.receive_hit(hit(10));
    assert_eq!(jumper.state(), Some(StateId::Jump));
    assert_eq!(jumper.ctx.resources.health(), 90);
}

#[test]
fn test_lethal_hit_is_terminal() {
    let mut character = player();
    character.receive_hit(hit(500));
    assert_eq!(character.state(), Some(StateId::Death));
    assert!(character.machine.subscriptions().is_empty());

    frame(&mut character, tap(Action::Roll));
    character.deliver(CharacterEvent::Checkpoint(Checkpoint::AnimationEnd));
    assert_eq!(character.state(), Some(StateId::Death));
}

#[test]
fn test_attack_with_parried_target_in_reach_becomes_parry_stab() {
    let mut character = player();
    let victim = World::new().reserve_entity();
    frame(&mut character, tap(Action::Attack));

    character.ctx.targeting.reachable_parried = Some(TargetInfo {
        entity: victim,
        position: Vec3::new(0.0, 0.0, 1.5),
        radius: 0.5,
    });
    character.deliver(CharacterEvent::Checkpoint(Checkpoint::ActionCancelable));
    frame(&mut character, tap(Action::Attack));

    assert_eq!(character.state(), Some(StateId::ParryStab));
    match character.ctx.outbox.as_slice() {
        [CombatMessage::ParryStabbed { victim: v, stabber }] => {
            assert_eq!(*v, victim);
            assert_eq!(stabber.parry_stab_damage, 40);
        }
        other => panic!("unexpected outbox {other:?}"),
    }
}

#[test]
fn test_parried_then_stabbed_takes_stab_damage() {
    let mut character = player();
    frame(&mut character, tap(Action::Attack));
    character.deliver(CharacterEvent::GotParried);
    assert_eq!(character.state(), Some(StateId::Parried));
    assert!(character.ctx.targeting.is_parried);

    let stabber = Partner {
        entity: World::new().reserve_entity(),
        position: Vec3::new(0.0, 0.0, 1.0),
        parry_stab_damage: 40,
    };
    character.deliver(CharacterEvent::ParryStabbed(stabber));
    assert_eq!(character.state(), Some(StateId::ParriedStabbed));
    assert!(!character.ctx.targeting.is_parried);

    character.deliver(CharacterEvent::Checkpoint(Checkpoint::StabHitTaken));
    assert_eq!(character.ctx.resources.health(), 60);
    character.deliver(CharacterEvent::Checkpoint(Checkpoint::DeathCheck));
    assert_eq!(character.state(), Some(StateId::ParriedStabbed));
}

#[test]
fn test_lethal_stab_dies_at_death_check() {
    let mut character = player();
    frame(&mut character, tap(Action::Attack));
    character.deliver(CharacterEvent::GotParried);
    character.deliver(CharacterEvent::ParryStabbed(Partner {
        entity: World::new().reserve_entity(),
        position: Vec3::Z,
        parry_stab_damage: 400,
    }));

    character.deliver(CharacterEvent::Checkpoint(Checkpoint::StabHitTaken));
    assert_eq!(character.state(), Some(StateId::ParriedStabbed));
    character.deliver(CharacterEvent::Checkpoint(Checkpoint::DeathCheck));
    assert_eq!(character.state(), Some(StateId::Death));
}

#[test]
fn test_unknown_checkpoint_is_ignored() {
    let mut character = player();
    frame(&mut character, tap(Action::Attack));
    character.deliver_checkpoint("cartwheel");
    assert_eq!(character.state(), Some(StateId::Attack));

    character.deliver_checkpoint("on_animation_end");
    frame(&mut character, |_| {});
    assert_eq!(character.state(), Some(StateId::Idle));
}

#[test]
fn test_attack_ignored_while_attacks_disabled() {
    let mut config = CharacterConfig::default();
    config.combat.attacks_enabled = false;
    let mut character = spawn(config, ControlSource::Player(PlayerInput::new()));

    frame(&mut character, tap(Action::Attack));
    assert_eq!(character.state(), Some(StateId::Idle));
    assert_eq!(character.ctx.resources.stamina(), 75.0);
}

#[test]
fn test_agent_attacks_when_delay_elapses() {
    let sense = AgentSense {
        has_reached_destination: true,
        is_far_from_destination: false,
        heading: Vec3::ZERO,
    };
    let mut agent = spawn(CharacterConfig::default(), ControlSource::Agent(sense));
    agent.tick(DT);
    assert_eq!(agent.state(), Some(StateId::Idle));

    agent.deliver(CharacterEvent::AttackDelayElapsed);
    assert_eq!(agent.state(), Some(StateId::Attack));
}

#[test]
fn test_agent_locomotion_follows_distance() {
    let far = AgentSense {
        has_reached_destination: false,
        is_far_from_destination: true,
        heading: Vec3::Z,
    };
    let mut agent = spawn(CharacterConfig::default(), ControlSource::Agent(far));
    agent.tick(DT);
    assert_eq!(agent.state(), Some(StateId::Walk));
    agent.tick(DT);
    assert_eq!(agent.state(), Some(StateId::Sprint));
    assert!(agent.ctx.motion.position.z > 0.0);
}

#[derive(Clone, Debug)]
enum Poke {
    Press(Action),
    Move(f32, f32),
    Checkpoint(Checkpoint),
    Hit(i32),
    Tick,
}

fn poke() -> impl Strategy<Value = Poke> {
    let action = prop_oneof![
        Just(Action::Attack),
        Just(Action::BackStep),
        Just(Action::Parry),
        Just(Action::Roll),
        Just(Action::Jump),
        Just(Action::Sprint),
    ];
    prop_oneof![
        action.prop_map(Poke::Press),
        (-1.0f32..1.0, -1.0f32..1.0).prop_map(|(x, y)| Poke::Move(x, y)),
        proptest::sample::select(Checkpoint::ALL.to_vec()).prop_map(Poke::Checkpoint),
        (0i32..50).prop_map(Poke::Hit),
        Just(Poke::Tick),
    ]
}

proptest! {
    #[test]
    fn death_is_terminal(pokes in proptest::collection::vec(poke(), 0..64)) {
        let mut character = player();
        character.receive_hit(hit(1000));
        prop_assert_eq!(character.state(), Some(StateId::Death));

        for poke in pokes {
            match poke {
                Poke::Press(action) => frame(&mut character, tap(action)),
                Poke::Move(x, y) => frame(&mut character, |i| i.set_move(Vec2::new(x, y))),
                Poke::Checkpoint(checkpoint) => {
                    character.deliver(CharacterEvent::Checkpoint(checkpoint))
                }
                Poke::Hit(damage) => character.receive_hit(hit(damage)),
                Poke::Tick => character.tick(DT),
            }
            prop_assert_eq!(character.state(), Some(StateId::Death));
            prop_assert!(character.machine.subscriptions().is_empty());
        }
    }

    #[test]
    fn subscriptions_belong_to_current_state(pokes in proptest::collection::vec(poke(), 0..64)) {
        let mut character = player();
        for poke in pokes {
            match poke {
                Poke::Press(action) => frame(&mut character, tap(action)),
                Poke::Move(x, y) => frame(&mut character, |i| i.set_move(Vec2::new(x, y))),
                Poke::Checkpoint(checkpoint) => {
                    character.deliver(CharacterEvent::Checkpoint(checkpoint))
                }
                Poke::Hit(damage) => character.receive_hit(hit(damage)),
                Poke::Tick => character.tick(DT),
            }
            prop_assert!(only_current_subscribed(&character));
            let stamina = character.ctx.resources.stamina();
            prop_assert!((0.0..=75.0).contains(&stamina));
        }
    }
}
