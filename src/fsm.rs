use tracing::{debug, trace, warn};

use crate::components::CharacterContext;
use crate::states::events::{CharacterEvent, Registration, StateEvent, Subscriptions};
use crate::states::{StateId, StateSet};

/// Owns a character's pre-built states and the single active one.
///
/// The machine tracks the current state, the previous state, and how long it
/// has been in the current state. **Transition decisions live in the states**:
/// a state returns the id it wants from `handle_transitions` or `on_event`,
/// and only the machine performs the swap.
///
/// # Usage
/// ```ignore
/// let mut machine = StateMachine::new();
/// machine.initialize(StateId::Idle, &mut ctx);
/// // Each tick:
/// machine.tick(&mut ctx);
/// ```
pub struct StateMachine {
    states: StateSet,
    current: StateId,
    previous: Option<StateId>,
    initialized: bool,
    /// Seconds spent in the current state. Reset to 0.0 on each transition.
    pub elapsed: f32,
    /// Bumped on every entry, including re-entry of the same state.
    activation: u64,
    subscriptions: Subscriptions,
    events: Vec<StateEvent>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            states: StateSet::new(),
            current: StateId::Idle,
            previous: None,
            initialized: false,
            elapsed: 0.0,
            activation: 0,
            subscriptions: Subscriptions::new(),
            events: Vec::new(),
        }
    }

    /// Enter `start`. Fires `Entered` before the state's own `enter`; there is
    /// no prior state, so nothing is exited.
    pub fn initialize(&mut self, start: StateId, ctx: &mut CharacterContext) {
        if self.initialized {
            warn!(entity = ?ctx.entity, "state machine initialized twice; ignoring");
            return;
        }
        self.initialized = true;
        self.current = start;
        self.activation += 1;

        ctx.on_entered(start, None);
        self.events.push(StateEvent::Entered(start));
        let mut registration = Registration::new(start, &mut self.subscriptions);
        self.states.get_mut(start).enter(ctx, &mut registration);
        self.flush(ctx);
    }

    pub fn current(&self) -> Option<StateId> {
        self.initialized.then_some(self.current)
    }

    pub fn previous(&self) -> Option<StateId> {
        self.previous
    }

    pub fn activation(&self) -> u64 {
        self.activation
    }

    pub fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    pub fn states(&self) -> &StateSet {
        &self.states
    }

    /// Run one tick: `tick → handle_transitions → move → rotate`, each on
    /// whichever state is current at that step.
    pub fn tick(&mut self, ctx: &mut CharacterContext) {
        if !self.initialized {
            warn!(entity = ?ctx.entity, "tick on an uninitialized state machine");
            return;
        }

        self.flush(ctx);

        self.states.get_mut(self.current).tick(ctx);
        self.flush(ctx);

        if let Some(next) = self.states.get_mut(self.current).handle_transitions(ctx) {
            self.set_state(next, ctx);
        }
        self.flush(ctx);

        self.states.get_mut(self.current).move_tick(ctx);
        self.flush(ctx);

        self.states.get_mut(self.current).rotate_tick(ctx);
        self.flush(ctx);

        self.elapsed += ctx.dt;
    }

    /// Deliver queued events: collaborator reactions first, then the active
    /// state if it subscribed. Handlers may transition; later events go to
    /// whichever state is then active.
    pub fn flush(&mut self, ctx: &mut CharacterContext) {
        if !self.initialized {
            let dropped = ctx.discard_events();
            if dropped > 0 {
                debug!(entity = ?ctx.entity, dropped, "events before initialization dropped");
            }
            return;
        }

        while let Some(event) = ctx.next_event() {
            ctx.absorb(&event);
            if !self.subscriptions.is_subscribed(self.current, event.key()) {
                trace!(entity = ?ctx.entity, state = self.current.name(), ?event, "no subscriber");
                continue;
            }
            if let Some(next) = self.states.get_mut(self.current).on_event(&event, ctx) {
                self.set_state(next, ctx);
            }
        }
    }

    /// Swap states: exit, release, `Exited`, swap, `Entered`, enter.
    fn set_state(&mut self, next: StateId, ctx: &mut CharacterContext) {
        let old = self.current;
        self.states.get_mut(old).exit(ctx);
        self.subscriptions.release(old);
        ctx.on_exited(old);
        self.events.push(StateEvent::Exited(old));

        debug!(
            entity = ?ctx.entity,
            from = old.name(),
            to = next.name(),
            after = self.elapsed,
            "state change"
        );

        self.previous = Some(old);
        self.current = next;
        self.elapsed = 0.0;
        self.activation += 1;

        ctx.on_entered(next, Some(old));
        self.events.push(StateEvent::Entered(next));
        let mut registration = Registration::new(next, &mut self.subscriptions);
        self.states.get_mut(next).enter(ctx, &mut registration);
    }

    pub fn drain_events(&mut self) -> Vec<StateEvent> {
        std::mem::take(&mut self.events)
    }

    /// Queue `event` as if a collaborator raised it and deliver it now.
    pub fn dispatch(&mut self, event: CharacterEvent, ctx: &mut CharacterContext) {
        ctx.notify(event);
        self.flush(ctx);
    }
}
