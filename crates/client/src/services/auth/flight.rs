//! In-flight operation tracking.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Registry of operations currently in flight, keyed by operation name.
///
/// `begin` hands out at most one [`FlightPermit`] per key; a second call for
/// the same key returns `None` until the first permit drops. Fast duplicate
/// submissions of the same operation thereby fall through as no-ops, while
/// distinct operations are unaffected.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    ops: Mutex<HashSet<&'static str>>,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Claim `op`. Returns `None` while a permit for the same key is alive.
    pub(crate) fn begin(&self, op: &'static str) -> Option<FlightPermit<'_>> {
        let mut ops = self.ops.lock().unwrap_or_else(PoisonError::into_inner);
        let claimed = ops.insert(op);
        drop(ops);
        claimed.then(|| FlightPermit { registry: self, op })
    }
}

/// RAII claim on an operation key; releases the key on drop.
pub(crate) struct FlightPermit<'a> {
    registry: &'a InFlight,
    op: &'static str,
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        let mut ops = self
            .registry
            .ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        ops.remove(self.op);
    }
}
