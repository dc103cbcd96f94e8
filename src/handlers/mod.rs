//! Upstream event handlers.
//!
//! Thin shims that resolve the member and channel an event refers to,
//! filter out what the engine does not manage (its own items, teachers,
//! channels outside any queue), and hand the rest to the reconciler under the
//! member's entity lock. Each handler is an `impl Engine` block.

mod item;
mod next;
mod presence;
mod scope;

pub use next::NextOutcome;
