//! Injectable tick clocks.
//!
//! The transformer never reads wall time directly; it asks its clock for a
//! millisecond timestamp on every frame. Tests drive a [`ManualClock`] to
//! make reveal timing fully deterministic.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Millisecond time source for frame gating.
pub trait TickClock {
    /// Milliseconds elapsed since some fixed origin.
    fn now(&mut self) -> u64;
}

/// Wall-clock time, measured from construction.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickClock for SystemClock {
    fn now(&mut self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock. Clones share the same time cell, so a test can keep
/// one handle and give the other to the transformer.
#[derive(Clone, Default)]
pub struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.0.set(ms);
    }
}

impl TickClock for ManualClock {
    fn now(&mut self) -> u64 {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_handles_share_time() {
        let clock = ManualClock::new();
        let mut handle: Box<dyn TickClock> = Box::new(clock.clone());
        clock.advance(50);
        assert_eq!(handle.now(), 50);
        clock.set(7);
        assert_eq!(handle.now(), 7);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let mut clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
