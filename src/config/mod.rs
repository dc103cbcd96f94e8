//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: The top-level [`Config`] and server/startup sections
//! - [`timing`]: Activity window, reclamation threshold and wake slack
//! - [`queue`]: Naming conventions used to classify queue channels and teachers
//! - [`validation`]: Startup sanity checks

mod defaults;
mod queue;
mod timing;
mod types;
pub mod validation;

pub use queue::QueueConfig;
pub use timing::{Timing, TimingConfig};
pub use types::{Config, ConfigError, LogFormat, ServerConfig, StartupConfig};
