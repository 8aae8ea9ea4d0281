use std::time::Duration;

/// Reusable exponential-growth-with-saturation helper (§4.4 "Exponential
/// growth policy"). The exact multiplier isn't contractual — only that the
/// sequence is monotonic, saturates at a ceiling, and a restored base falls
/// back immediately on the next success (§9 "Back-off math").
#[derive(Debug, Clone)]
pub struct Delay {
    base: Duration,
    cap: Duration,
    multiplier: f64,
    current: Duration,
}

impl Delay {
    pub fn new(base: Duration, cap: Duration, multiplier: f64) -> Self {
        Self {
            base,
            cap,
            multiplier,
            current: base,
        }
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn cap(&self) -> Duration {
        self.cap
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// Pure growth computation from an arbitrary starting point, without
    /// mutating `self` — used by the interval-decision logic, which tracks
    /// its own `current` per endpoint rather than sharing this instance's.
    pub fn growth_from(&self, current: Duration) -> Duration {
        let grown = current.mul_f64(self.multiplier);
        grown.min(self.cap)
    }

    /// Grows `self.current` in place and returns the new value.
    pub fn grow(&mut self) -> Duration {
        self.current = self.growth_from(self.current);
        self.current
    }

    /// Resets to `base` — called on the first success after a run of
    /// failures.
    pub fn reset(&mut self) -> Duration {
        self.current = self.base;
        self.current
    }
}
