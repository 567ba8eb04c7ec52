//! Stack growth for re-entrant evaluation
//!
//! Ordinary guest calls run on the frame machine, but natives that call
//! back into guest code (array callbacks, getters, promise executors,
//! generator resumption) re-enter it through the Rust stack. Those paths
//! grow the stack on demand instead of overflowing before the configured
//! call depth is reached.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
