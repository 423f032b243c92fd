//! Stack growth for deep recursion
//!
//! The parser, the executor and value rendering all recurse on script
//! structure. Wrapping each recursive step in [`ensure_sufficient_stack`]
//! moves execution onto a fresh heap-allocated segment when the current
//! thread's stack runs low, so nesting is bounded by the VM's own limits and
//! not by whichever thread the host happens to run it on.

/// Grow once less than this much stack remains
const RED_ZONE: usize = 128 * 1024;

/// Size of each new stack segment
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first switching to a new stack segment if the current one is
/// nearly exhausted
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
