use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use hecs::Entity;
use tracing::warn;

use crate::components::HitInformation;
use crate::error::CheckpointError;
use crate::states::StateId;

// ---------------------------------------------------------------------------
// Checkpoints
// ---------------------------------------------------------------------------

/// Named events authored on an animation timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Checkpoint {
    MovementCancelable,
    ActionCancelable,
    AnimationEnd,
    HitFramesStart,
    HitFramesEnd,
    ParryFramesStart,
    ParryFramesEnd,
    IFramesStart,
    IFramesEnd,
    AirMomentumEnd,
    CanControlDirection,
    StopRotatingTowardsStabber,
    StabHitTaken,
    PushStart,
    PushEnd,
    DeathCheck,
}

impl Checkpoint {
    pub const ALL: [Checkpoint; 16] = [
        Checkpoint::MovementCancelable,
        Checkpoint::ActionCancelable,
        Checkpoint::AnimationEnd,
        Checkpoint::HitFramesStart,
        Checkpoint::HitFramesEnd,
        Checkpoint::ParryFramesStart,
        Checkpoint::ParryFramesEnd,
        Checkpoint::IFramesStart,
        Checkpoint::IFramesEnd,
        Checkpoint::AirMomentumEnd,
        Checkpoint::CanControlDirection,
        Checkpoint::StopRotatingTowardsStabber,
        Checkpoint::StabHitTaken,
        Checkpoint::PushStart,
        Checkpoint::PushEnd,
        Checkpoint::DeathCheck,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::MovementCancelable => "movement_cancelable",
            Self::ActionCancelable => "action_cancelable",
            Self::AnimationEnd => "animation_end",
            Self::HitFramesStart => "hit_frames_start",
            Self::HitFramesEnd => "hit_frames_end",
            Self::ParryFramesStart => "parry_frames_start",
            Self::ParryFramesEnd => "parry_frames_end",
            Self::IFramesStart => "i_frames_start",
            Self::IFramesEnd => "i_frames_end",
            Self::AirMomentumEnd => "air_momentum_end",
            Self::CanControlDirection => "can_control_direction",
            Self::StopRotatingTowardsStabber => "stop_rotating_towards_stabber",
            Self::StabHitTaken => "stab_hit_taken",
            Self::PushStart => "push_start",
            Self::PushEnd => "push_end",
            Self::DeathCheck => "death_check",
        }
    }
}

impl FromStr for Checkpoint {
    type Err = CheckpointError;

    /// Accepts the bare name or the `on_`-prefixed callback form.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let bare = name.strip_prefix("on_").unwrap_or(name);
        // Older clips author the hit window in the singular.
        let bare = match bare {
            "hit_frame_start" => "hit_frames_start",
            "hit_frame_end" => "hit_frames_end",
            other => other,
        };
        Checkpoint::ALL
            .into_iter()
            .find(|c| c.name() == bare)
            .ok_or_else(|| CheckpointError::Unknown(name.to_string()))
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Character events
// ---------------------------------------------------------------------------

/// The other half of a parry-stab pairing, as seen at notification time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Partner {
    pub entity: Entity,
    pub position: Vec3,
    pub parry_stab_damage: i32,
}

/// Everything that can be delivered to a character between or during ticks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CharacterEvent {
    Checkpoint(Checkpoint),
    HitTaken(HitInformation),
    Death,
    StaminaExhausted,
    GotParried,
    ParryStabbed(Partner),
    /// Damage dealt by a parry-stab, consumed by the resource pool.
    StabDamage(i32),
    AttackDelayElapsed,
}

/// Payload-free key used for subscriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKey {
    Checkpoint(Checkpoint),
    HitTaken,
    Death,
    StaminaExhausted,
    GotParried,
    ParryStabbed,
    StabDamage,
    AttackDelayElapsed,
}

impl CharacterEvent {
    pub fn key(&self) -> EventKey {
        match self {
            Self::Checkpoint(c) => EventKey::Checkpoint(*c),
            Self::HitTaken(_) => EventKey::HitTaken,
            Self::Death => EventKey::Death,
            Self::StaminaExhausted => EventKey::StaminaExhausted,
            Self::GotParried => EventKey::GotParried,
            Self::ParryStabbed(_) => EventKey::ParryStabbed,
            Self::StabDamage(_) => EventKey::StabDamage,
            Self::AttackDelayElapsed => EventKey::AttackDelayElapsed,
        }
    }
}

/// Entered/exited notifications exposed to collaborators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateEvent {
    Entered(StateId),
    Exited(StateId),
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// Which state activation listens to which event.
///
/// States register while entering; the machine releases every registration
/// of the outgoing state after its `exit`, whatever triggered the transition.
#[derive(Default, Debug)]
pub struct Subscriptions {
    entries: Vec<(StateId, EventKey)>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, owner: StateId, key: EventKey) {
        if self.is_subscribed(owner, key) {
            warn!(state = ?owner, event = ?key, "duplicate subscription ignored");
            return;
        }
        self.entries.push((owner, key));
    }

    pub fn unsubscribe(&mut self, owner: StateId, key: EventKey) {
        self.entries.retain(|entry| *entry != (owner, key));
    }

    /// Drop every registration held by `owner`. Returns how many were removed.
    pub fn release(&mut self, owner: StateId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(o, _)| *o != owner);
        before - self.entries.len()
    }

    pub fn is_subscribed(&self, owner: StateId, key: EventKey) -> bool {
        self.entries.contains(&(owner, key))
    }

    pub fn count_for(&self, owner: StateId) -> usize {
        self.entries.iter().filter(|(o, _)| *o == owner).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Registration handle given to a state while it enters.
pub struct Registration<'a> {
    owner: StateId,
    subscriptions: &'a mut Subscriptions,
}

impl<'a> Registration<'a> {
    pub fn new(owner: StateId, subscriptions: &'a mut Subscriptions) -> Self {
        Self {
            owner,
            subscriptions,
        }
    }

    pub fn subscribe(&mut self, key: EventKey) {
        self.subscriptions.subscribe(self.owner, key);
    }

    pub fn checkpoint(&mut self, checkpoint: Checkpoint) {
        self.subscribe(EventKey::Checkpoint(checkpoint));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_names_round_trip() {
        for checkpoint in Checkpoint::ALL {
            assert_eq!(checkpoint.name().parse::<Checkpoint>(), Ok(checkpoint));
        }
    }

    #[test]
    fn test_checkpoint_accepts_callback_prefix() {
        assert_eq!(
            "on_action_cancelable".parse::<Checkpoint>(),
            Ok(Checkpoint::ActionCancelable)
        );
        assert_eq!(
            "on_hit_frame_start".parse::<Checkpoint>(),
            Ok(Checkpoint::HitFramesStart)
        );
    }

    #[test]
    fn test_unknown_checkpoint_is_an_error() {
        assert_eq!(
            "on_cartwheel".parse::<Checkpoint>(),
            Err(CheckpointError::Unknown("on_cartwheel".to_string()))
        );
    }

    #[test]
    fn test_release_clears_only_owner() {
        let mut subs = Subscriptions::new();
        subs.subscribe(StateId::Attack, EventKey::GotParried);
        subs.subscribe(StateId::Attack, EventKey::Death);
        subs.subscribe(StateId::Idle, EventKey::Death);

        assert_eq!(subs.release(StateId::Attack), 2);
        assert_eq!(subs.len(), 1);
        assert!(subs.is_subscribed(StateId::Idle, EventKey::Death));
    }

    #[test]
    fn test_duplicate_subscription_is_ignored() {
        let mut subs = Subscriptions::new();
        let mut reg = Registration::new(StateId::Roll, &mut subs);
        reg.checkpoint(Checkpoint::AirMomentumEnd);
        reg.checkpoint(Checkpoint::AirMomentumEnd);
        assert_eq!(subs.count_for(StateId::Roll), 1);
    }
}
