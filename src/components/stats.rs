use tracing::debug;

use crate::config::StatsConfig;
use crate::engine::time::Timer;

/// Notifications raised by the resource pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolEvent {
    Exhausted,
    Died,
}

/// Health and stamina for one character.
///
/// Stamina always stays within `[0, max_stamina]`. Spending stamina blocks
/// recovery for a short cooldown; spending the last of it blocks recovery
/// for the longer exhaustion cooldown and raises [`PoolEvent::Exhausted`].
#[derive(Debug)]
pub struct ResourcePool {
    health: i32,
    max_health: i32,
    stamina: f32,
    max_stamina: f32,
    damage: i32,
    parry_stab_multiplier: f32,
    can_recover: bool,
    recovery_cooldown: f32,
    exhaustion_cooldown: f32,
    recovery_timer: Timer,
    exhaustion_timer: Timer,
}

impl ResourcePool {
    pub fn new(stats: &StatsConfig) -> Self {
        Self {
            health: stats.max_health,
            max_health: stats.max_health,
            stamina: stats.max_stamina,
            max_stamina: stats.max_stamina,
            damage: stats.damage,
            parry_stab_multiplier: stats.parry_stab_multiplier,
            can_recover: true,
            recovery_cooldown: stats.recovery_cooldown,
            exhaustion_cooldown: stats.exhaustion_recovery_cooldown,
            recovery_timer: Timer::new(),
            exhaustion_timer: Timer::new(),
        }
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn max_health(&self) -> i32 {
        self.max_health
    }

    pub fn stamina(&self) -> f32 {
        self.stamina
    }

    pub fn max_stamina(&self) -> f32 {
        self.max_stamina
    }

    pub fn damage(&self) -> i32 {
        self.damage
    }

    pub fn parry_stab_damage(&self) -> i32 {
        (self.damage as f32 * self.parry_stab_multiplier).round() as i32
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }

    pub fn can_recover(&self) -> bool {
        self.can_recover
    }

    /// Advance the recovery cooldowns.
    pub fn update(&mut self, dt: f32) {
        if self.recovery_timer.update(dt) && !self.exhaustion_timer.is_running() {
            self.can_recover = true;
        }
        if self.exhaustion_timer.update(dt) {
            self.can_recover = true;
        }
    }

    /// Add `delta` to stamina (negative spends).
    pub fn update_stamina(&mut self, delta: f32) -> Option<PoolEvent> {
        if delta == 0.0 {
            debug!("ignoring zero stamina delta");
            return None;
        }

        let next = (self.stamina + delta).clamp(0.0, self.max_stamina);
        if next == self.stamina {
            return None;
        }

        let recovering = next > self.stamina;
        if recovering {
            if !self.can_recover {
                return None;
            }
            self.stamina = next;
            return None;
        }

        self.stamina = next;
        self.can_recover = false;
        if next == 0.0 {
            self.exhaustion_timer.start(self.exhaustion_cooldown);
            Some(PoolEvent::Exhausted)
        } else {
            self.recovery_timer.start(self.recovery_cooldown);
            None
        }
    }

    /// Subtract `amount` from health. Raises [`PoolEvent::Died`] once, on the
    /// update that reaches zero.
    pub fn apply_damage(&mut self, amount: i32) -> Option<PoolEvent> {
        if amount == 0 {
            debug!("ignoring zero health delta");
            return None;
        }

        let next = (self.health - amount).clamp(0, self.max_health);
        if next == self.health {
            return None;
        }
        self.health = next;
        (next == 0).then_some(PoolEvent::Died)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pool() -> ResourcePool {
        ResourcePool::new(&StatsConfig::default())
    }

    #[test]
    fn test_spending_blocks_recovery_until_cooldown() {
        let mut pool = pool();
        pool.update_stamina(-20.0);
        assert_eq!(pool.stamina(), 55.0);

        pool.update_stamina(10.0);
        assert_eq!(pool.stamina(), 55.0, "recovery blocked right after spending");

        pool.update(0.6);
        pool.update_stamina(10.0);
        assert_eq!(pool.stamina(), 65.0);
    }

    #[test]
    fn test_exhaustion_fires_once_and_uses_long_cooldown() {
        let mut pool = pool();
        assert_eq!(pool.update_stamina(-100.0), Some(PoolEvent::Exhausted));
        assert_eq!(pool.stamina(), 0.0);
        assert_eq!(pool.update_stamina(-5.0), None);

        pool.update(0.6);
        assert!(!pool.can_recover());
        pool.update(0.5);
        assert!(pool.can_recover());
    }

    #[test]
    fn test_recovery_timer_waits_for_exhaustion() {
        let mut pool = pool();
        pool.update_stamina(-75.0);
        pool.update(0.25);
        // A recovery restart while exhausted must not end the exhaustion block.
        pool.recovery_timer.start(0.1);
        pool.update(0.2);
        assert!(!pool.can_recover());
    }

    #[test]
    fn test_zero_delta_is_ignored() {
        let mut pool = pool();
        assert_eq!(pool.update_stamina(0.0), None);
        assert!(pool.can_recover());
    }

    #[test]
    fn test_death_raised_once() {
        let mut pool = pool();
        assert_eq!(pool.apply_damage(60), None);
        assert_eq!(pool.apply_damage(60), Some(PoolEvent::Died));
        assert_eq!(pool.health(), 0);
        assert_eq!(pool.apply_damage(10), None);
        assert!(pool.is_dead());
    }

    #[test]
    fn test_parry_stab_damage_rounds() {
        let pool = pool();
        assert_eq!(pool.parry_stab_damage(), 40);
    }

    proptest! {
        #[test]
        fn stamina_stays_in_bounds(steps in prop::collection::vec((-200.0f32..200.0, 0.0f32..1.0), 1..200)) {
            let mut pool = pool();
            for (delta, dt) in steps {
                pool.update_stamina(delta);
                prop_assert!(pool.stamina() >= 0.0);
                prop_assert!(pool.stamina() <= pool.max_stamina());
                pool.update(dt);
            }
        }
    }
}
