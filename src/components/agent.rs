use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::AgentConfig;
use crate::engine::time::Timer;

/// Normalized difficulty in `[0, 1]`, handed to agents at spawn.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Difficulty(f32);

impl Difficulty {
    pub fn new(value: f32) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

/// Paces an agent's attacks.
///
/// The delay only counts down while the agent stands at its destination in
/// a ground-motion state. High difficulties draw each delay uniformly from
/// `[0, delay)` instead of using it as-is.
#[derive(Debug)]
pub struct AttackDelay {
    timer: Timer,
    base_delay: f32,
    randomize: bool,
    reset_out_of_range: bool,
    rng: ChaCha8Rng,
}

impl AttackDelay {
    pub fn new(config: &AgentConfig, difficulty: Difficulty, seed: u64) -> Self {
        let mut delay = Self {
            timer: Timer::new(),
            base_delay: config.attack_delay(difficulty.value()),
            randomize: difficulty.value() >= config.randomization_threshold,
            reset_out_of_range: config.reset_delay_out_of_range,
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        delay.arm();
        delay
    }

    fn next_delay(&mut self) -> f32 {
        if self.randomize && self.base_delay > 0.0 {
            self.rng.gen_range(0.0..self.base_delay)
        } else {
            self.base_delay
        }
    }

    fn arm(&mut self) {
        let delay = self.next_delay();
        self.timer.start(delay);
    }

    pub fn remaining(&self) -> f32 {
        self.timer.remaining()
    }

    /// Returns `true` when the agent should attack this tick.
    pub fn update(&mut self, dt: f32, has_reached: bool, in_ground_motion: bool) -> bool {
        if !has_reached {
            if self.reset_out_of_range {
                self.arm();
            }
            return false;
        }
        if !in_ground_motion {
            return false;
        }
        if self.timer.update(dt) {
            self.arm();
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_delay_in_range() {
        let config = AgentConfig::default();
        let mut delay = AttackDelay::new(&config, Difficulty::new(0.0), 1);

        let mut fired_at = None;
        for tick in 0..200 {
            if delay.update(0.125, true, true) {
                fired_at = Some(tick);
                break;
            }
        }
        // 2.0 s at difficulty 0.
        assert_eq!(fired_at, Some(15));
    }

    #[test]
    fn test_paused_outside_ground_motion() {
        let config = AgentConfig::default();
        let mut delay = AttackDelay::new(&config, Difficulty::new(0.0), 1);
        for _ in 0..100 {
            assert!(!delay.update(0.1, true, false));
        }
    }

    #[test]
    fn test_out_of_range_resets() {
        let config = AgentConfig::default();
        let mut delay = AttackDelay::new(&config, Difficulty::new(0.0), 1);
        delay.update(1.5, true, true);
        delay.update(0.1, false, true);
        assert!((delay.remaining() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_randomized_delay_is_bounded_and_seeded() {
        let config = AgentConfig::default();
        let a = AttackDelay::new(&config, Difficulty::new(1.0), 42);
        let b = AttackDelay::new(&config, Difficulty::new(1.0), 42);
        assert!(a.remaining() < config.attack_delay_end);
        assert_eq!(a.remaining(), b.remaining());
    }
}
