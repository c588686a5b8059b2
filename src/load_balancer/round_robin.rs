//! Round-robin selection with live-skip.

use std::sync::{Arc, Mutex, PoisonError};
use crate::load_balancer::backend::Backend;

/// Rotation cursor shared by all request handlers.
///
/// The cursor is read-then-written on every selection, so the whole scan
/// runs under one mutex. The scan touches at most `len` slots.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: Mutex<usize>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next alive backend, or `None` when every backend is
    /// dead (or there are none).
    ///
    /// The cursor moves to the slot after the returned one. When nothing is
    /// alive the cursor is left where it was.
    pub fn next_index(&self, backends: &[Arc<Backend>]) -> Option<usize> {
        let len = backends.len();
        if len == 0 {
            return None;
        }

        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        // Stays in range as long as the slice never shrinks, but don't trust it.
        let start = *cursor % len;

        for i in 0..len {
            let index = (start + i) % len;
            if backends[index].is_alive() {
                // Reaching start - 1 by wraparound lands the cursor back on
                // `start`, so the next scan restarts from the same point.
                *cursor = (index + 1) % len;
                return Some(index);
            }
        }
        None
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        *self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
