//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Timing Defaults
// =============================================================================

/// One hour without a liveness signal makes a scope inactive.
pub fn default_active_window_secs() -> u64 {
    60 * 60
}

/// One week without a mutation reclaims a member's state.
pub fn default_clean_after_secs() -> u64 {
    60 * 60 * 24 * 7
}

pub fn default_epsilon_ms() -> u64 {
    10_000
}

// =============================================================================
// Queue Naming Defaults
// =============================================================================

pub fn default_queue_prefix() -> String {
    "очередь".to_string()
}

pub fn default_teacher_role_prefix() -> String {
    "препод".to_string()
}

// =============================================================================
// Startup Defaults
// =============================================================================

/// Items older than the reclamation threshold still replayed per channel.
pub fn default_prehistoric_limit() -> usize {
    7
}
