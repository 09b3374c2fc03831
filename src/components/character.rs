use std::collections::VecDeque;
use std::sync::Arc;

use glam::{Vec2, Vec3};
use hecs::Entity;
use tracing::{debug, warn};

use crate::components::agent::AttackDelay;
use crate::components::combat::{CombatMessage, CombatTargeting, HitInformation, HitReceiver};
use crate::components::physics::{MotionState, MovementIntegrator};
use crate::components::stats::{PoolEvent, ResourcePool};
use crate::config::CharacterConfig;
use crate::engine::input::ControlSource;
use crate::fsm::StateMachine;
use crate::states::events::{CharacterEvent, Checkpoint, StateEvent};
use crate::states::{Family, StateId};

/// Marker: this entity is driven by player input.
pub struct Player;

/// Marker: this entity is AI-controlled.
pub struct Agent;

/// Display name used in logs.
pub struct Name(pub String);

// ---------------------------------------------------------------------------
// Character context
// ---------------------------------------------------------------------------

/// Everything a state may read or write while it is active.
///
/// Owned by exactly one character. Other characters appear only as looked-up
/// [`TargetInfo`](crate::components::combat::TargetInfo) snapshots and are
/// reached through [`CombatMessage`]s.
pub struct CharacterContext {
    pub entity: Entity,
    pub config: CharacterConfig,
    pub control: ControlSource,
    pub motion: MotionState,
    pub resources: ResourcePool,
    pub targeting: CombatTargeting,
    pub hit_receiver: HitReceiver,
    pub attack_delay: Option<AttackDelay>,
    /// Seconds covered by the current tick.
    pub dt: f32,
    /// Outgoing notifications for other characters.
    pub outbox: Vec<CombatMessage>,
    pending: VecDeque<CharacterEvent>,
    integrator: Arc<dyn MovementIntegrator>,
}

impl CharacterContext {
    pub fn new(
        entity: Entity,
        config: CharacterConfig,
        control: ControlSource,
        position: Vec3,
        yaw: f32,
        integrator: Arc<dyn MovementIntegrator>,
    ) -> Self {
        let motion = MotionState::new(position, yaw, &config.movement);
        let resources = ResourcePool::new(&config.stats);
        let targeting = CombatTargeting {
            lock_on: config.combat.lock_on,
            ..CombatTargeting::default()
        };
        Self {
            entity,
            config,
            control,
            motion,
            resources,
            targeting,
            hit_receiver: HitReceiver::default(),
            attack_delay: None,
            dt: 0.0,
            outbox: Vec::new(),
            pending: VecDeque::new(),
            integrator,
        }
    }

    pub fn with_attack_delay(mut self, attack_delay: AttackDelay) -> Self {
        self.attack_delay = Some(attack_delay);
        self
    }

    pub fn is_player(&self) -> bool {
        self.control.is_player()
    }

    /// Queue an event for the active state.
    pub fn notify(&mut self, event: CharacterEvent) {
        self.pending.push_back(event);
    }

    pub(crate) fn next_event(&mut self) -> Option<CharacterEvent> {
        self.pending.pop_front()
    }

    pub(crate) fn discard_events(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Add `delta` to stamina, queueing exhaustion if it runs out.
    pub fn update_stamina(&mut self, delta: f32) {
        if let Some(PoolEvent::Exhausted) = self.resources.update_stamina(delta) {
            debug!(entity = ?self.entity, "stamina exhausted");
            self.notify(CharacterEvent::StaminaExhausted);
        }
    }

    pub fn apply_damage(&mut self, amount: i32) {
        if let Some(PoolEvent::Died) = self.resources.apply_damage(amount) {
            self.notify(CharacterEvent::Death);
        }
    }

    /// Sweep the character by `velocity * dt` and record what the world allowed.
    pub fn apply_velocity(&mut self, velocity: Vec3) {
        let sweep =
            self.integrator
                .sweep(self.motion.position, velocity * self.dt, self.config.movement.radius);
        self.motion.position += sweep.displacement;
        self.motion.grounded = sweep.grounded;
        if self.dt > 0.0 {
            self.motion.horizontal_speed =
                Vec2::new(sweep.displacement.x, sweep.displacement.z).length() / self.dt;
        }
    }

    /// Collaborator-side reactions that run for every event, before the
    /// active state sees it.
    pub(crate) fn absorb(&mut self, event: &CharacterEvent) {
        match event {
            CharacterEvent::Checkpoint(checkpoint) => match checkpoint {
                Checkpoint::HitFramesStart => self.hit_receiver.open_weapon(),
                Checkpoint::HitFramesEnd => self.hit_receiver.close_weapon(),
                Checkpoint::ParryFramesStart => self.hit_receiver.is_parrying = true,
                Checkpoint::ParryFramesEnd => self.hit_receiver.is_parrying = false,
                Checkpoint::IFramesStart => self.hit_receiver.i_frames = true,
                Checkpoint::IFramesEnd => self.hit_receiver.i_frames = false,
                _ => {}
            },
            CharacterEvent::ParryStabbed(stabber) => {
                self.targeting.stabber = Some(*stabber);
            }
            CharacterEvent::StabDamage(amount) => self.apply_damage(*amount),
            _ => {}
        }
    }

    pub(crate) fn on_entered(&mut self, state: StateId, previous: Option<StateId>) {
        let from_ground = previous.map_or(true, |p| p.family() != Family::AirMotion);
        if let Some(input) = self.control.player_mut() {
            input.reset_buffer();
            if state.family() == Family::AirMotion && from_ground {
                input.capture_air_entry();
            }
        }
        self.targeting.is_parried = state == StateId::Parried;
    }

    pub(crate) fn on_exited(&mut self, _state: StateId) {
        self.hit_receiver.reset_windows();
    }
}

// ---------------------------------------------------------------------------
// Character
// ---------------------------------------------------------------------------

/// A combatant: its state machine plus the context its states act on.
pub struct Character {
    pub machine: StateMachine,
    pub ctx: CharacterContext,
}

impl Character {
    pub fn new(ctx: CharacterContext) -> Self {
        Self {
            machine: StateMachine::new(),
            ctx,
        }
    }

    /// Enter Idle. Must run once before the first tick.
    pub fn initialize(&mut self) {
        self.machine.initialize(StateId::Idle, &mut self.ctx);
    }

    pub fn state(&self) -> Option<StateId> {
        self.machine.current()
    }

    pub fn tick(&mut self, dt: f32) {
        self.ctx.dt = dt;
        self.ctx.resources.update(dt);
        self.ctx.hit_receiver.update(dt);

        let in_ground_motion = self
            .machine
            .current()
            .is_some_and(|s| s.family() == Family::GroundMotion);
        let has_target = self.ctx.targeting.has_target();
        let attack_due = match (self.ctx.attack_delay.as_mut(), self.ctx.control.agent()) {
            (Some(delay), Some(sense)) => delay.update(
                dt,
                has_target && sense.has_reached_destination,
                in_ground_motion,
            ),
            _ => false,
        };
        if attack_due {
            self.ctx.notify(CharacterEvent::AttackDelayElapsed);
        }

        self.machine.tick(&mut self.ctx);
    }

    /// Deliver an event from outside the tick (animation bridge, other characters).
    pub fn deliver(&mut self, event: CharacterEvent) {
        self.machine.dispatch(event, &mut self.ctx);
    }

    /// Deliver a checkpoint by its authored name. Unknown names are logged and dropped.
    pub fn deliver_checkpoint(&mut self, name: &str) {
        match name.parse::<Checkpoint>() {
            Ok(checkpoint) => self.deliver(CharacterEvent::Checkpoint(checkpoint)),
            Err(err) => warn!(entity = ?self.ctx.entity, "{err}; checkpoint ignored"),
        }
    }

    /// Apply a hit: damage first, then the hit reaction.
    pub fn receive_hit(&mut self, hit: HitInformation) {
        self.ctx
            .hit_receiver
            .start_invincibility(self.ctx.config.combat.invincibility_time);
        self.ctx.apply_damage(hit.damage);
        self.deliver(CharacterEvent::HitTaken(hit));
    }

    pub fn drain_state_events(&mut self) -> Vec<StateEvent> {
        self.machine.drain_events()
    }
}
