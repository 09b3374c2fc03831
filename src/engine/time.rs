/// Fixed-step simulation clock. The arena advances it once per tick.
pub struct TickClock {
    pub dt: f32,
    pub tick: u64,
}

impl TickClock {
    pub fn from_rate(hz: f32) -> Self {
        Self {
            dt: 1.0 / hz,
            tick: 0,
        }
    }

    pub fn advance(&mut self) {
        self.tick += 1;
    }

    /// Simulated seconds since the first tick.
    pub fn elapsed(&self) -> f32 {
        self.tick as f32 * self.dt
    }
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// Countdown used for cooldowns, cancel windows and delayed triggers.
///
/// Armed by [`Timer::start`], decremented by [`Timer::update`]. Completion is
/// reported to the caller as the return value of `update` on the tick the
/// remaining time crosses to zero, exactly once per arming. A repeating timer
/// rearms itself with the same duration instead of stopping.
#[derive(Clone, Debug, Default)]
pub struct Timer {
    duration: f32,
    remaining: f32,
    repeat: bool,
    running: bool,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repeating() -> Self {
        Self {
            repeat: true,
            ..Self::default()
        }
    }

    /// Arm (or re-arm) with `duration` seconds.
    pub fn start(&mut self, duration: f32) {
        self.duration = duration;
        self.remaining = duration;
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.remaining = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Advance by `dt` seconds. Returns `true` on the tick the timer completes.
    #[must_use = "completion is only reported here"]
    pub fn update(&mut self, dt: f32) -> bool {
        if !self.running {
            return false;
        }

        self.remaining -= dt;
        if self.remaining > 0.0 {
            return false;
        }

        if self.repeat && self.duration > 0.0 {
            self.remaining = self.duration;
        } else {
            self.running = false;
        }
        true
    }
}
