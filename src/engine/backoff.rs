//! Fibonacci retry pacing
//!
//! Delays between deferred resolution ticks follow the Fibonacci sequence
//! scaled by a configurable base unit.

use std::time::Duration;

/// Fibonacci delay generator: 1, 2, 3, 5, 8, ... times the base unit.
///
/// One generator exists per engine and is never reset, including across
/// completion cycles. An engine that keeps receiving work late in its life
/// therefore ticks ever more slowly; that growth is a deliberate property of
/// the pacing model, not a bug to be reset away.
#[derive(Debug)]
pub struct FibonacciBackoff {
    unit: Duration,
    current: u64,
    next: u64,
}

impl FibonacciBackoff {
    pub fn new(unit: Duration) -> FibonacciBackoff {
        FibonacciBackoff {
            unit,
            current: 1,
            next: 2,
        }
    }

    /// The next delay in the sequence. Saturates instead of overflowing.
    pub fn next_delay(&mut self) -> Duration {
        let steps = u32::try_from(self.current).unwrap_or(u32::MAX);
        let delay = self.unit.saturating_mul(steps);
        let advanced = self.current.saturating_add(self.next);
        self.current = self.next;
        self.next = advanced;
        delay
    }
}
