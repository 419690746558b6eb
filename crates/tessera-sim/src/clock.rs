//! Virtual time shared by every participant of a simulated run.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tessera_store::Clock;

/// Discrete simulated clock (nanosecond precision).
///
/// Clones share the same timeline. Sleeping advances the timeline instead of
/// blocking, so a two-minute workload completes in milliseconds.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now_ns: Arc<AtomicU64>,
}

impl SimClock {
    /// Creates a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the shared timeline by `delta_ns`.
    pub fn advance_by(&self, delta_ns: u64) {
        let previous = self.now_ns.fetch_add(delta_ns, Ordering::SeqCst);
        debug_assert!(previous.checked_add(delta_ns).is_some(), "clock overflow");
    }
}

impl Clock for SimClock {
    fn now_ns(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }

    fn sleep_ns(&self, duration_ns: u64) {
        self.advance_by(duration_ns);
    }
}
