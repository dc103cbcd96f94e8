//! queuewarden - reaction-driven queue coordination engine.
//!
//! Tracks, per member and per scope, which item a member has standing in each
//! queue channel, annotates those items with a small reaction spectrum as the
//! member's voice presence changes, and reclaims state that has gone idle.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod http;
pub mod metrics;
pub mod platform;
pub mod reconcile;
pub mod replay;
pub mod state;
pub mod telemetry;

pub use engine::{Engine, EngineStatus};
pub use error::{PlatformError, QueueError, QueueResult};
pub use handlers::NextOutcome;
