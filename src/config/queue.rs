//! Queue naming configuration.

use super::defaults::{default_queue_prefix, default_teacher_role_prefix};
use serde::Deserialize;

/// Naming conventions that decide which channels form a queue and who teaches.
///
/// Matching is a case-insensitive prefix match on the channel name, the
/// enclosing category name, or a role name.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Prefix shared by queue text channels, queue voice channels and queue categories.
    #[serde(default = "default_queue_prefix")]
    pub queue_prefix: String,
    /// Prefix of role names that mark a member as a teacher.
    #[serde(default = "default_teacher_role_prefix")]
    pub teacher_role_prefix: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_prefix: default_queue_prefix(),
            teacher_role_prefix: default_teacher_role_prefix(),
        }
    }
}
