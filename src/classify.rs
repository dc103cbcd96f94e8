//! Scope classification.
//!
//! Decides which channels form a queue, which members are teachers, and where
//! a member currently stands relative to the queue. Pure predicates over
//! platform snapshots; all matching is a case-insensitive name prefix match.

use crate::config::QueueConfig;
use queuewarden_proto::{ChannelInfo, ChannelKind, MemberInfo};

/// External status of a member, derived from voice presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Not connected to any voice channel.
    OffScope,
    /// Connected to a queue voice channel (waiting).
    Designated,
    /// Connected to some other voice channel (being served).
    Elsewhere,
}

/// Name-based classifier built from [`QueueConfig`].
#[derive(Debug, Clone)]
pub struct QueueClassifier {
    queue_prefix: String,
    teacher_role_prefix: String,
}

impl QueueClassifier {
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            queue_prefix: config.queue_prefix.to_lowercase(),
            teacher_role_prefix: config.teacher_role_prefix.to_lowercase(),
        }
    }

    fn is_queue_named(&self, channel: &ChannelInfo) -> bool {
        if channel.name.to_lowercase().starts_with(&self.queue_prefix) {
            return true;
        }
        channel
            .category
            .as_ref()
            .is_some_and(|c| c.to_lowercase().starts_with(&self.queue_prefix))
    }

    /// A text channel whose name or category carries the queue prefix.
    pub fn is_queue_text(&self, channel: &ChannelInfo) -> bool {
        channel.kind == ChannelKind::Text && self.is_queue_named(channel)
    }

    /// A voice channel whose name or category carries the queue prefix.
    pub fn is_queue_voice(&self, channel: &ChannelInfo) -> bool {
        channel.kind == ChannelKind::Voice && self.is_queue_named(channel)
    }

    pub fn is_teacher(&self, member: &MemberInfo) -> bool {
        member
            .roles
            .iter()
            .any(|role| role.to_lowercase().starts_with(&self.teacher_role_prefix))
    }

    /// Queue text channels in the platform's enumeration order.
    pub fn queue_channels<'a>(
        &'a self,
        channels: &'a [ChannelInfo],
    ) -> impl Iterator<Item = &'a ChannelInfo> + 'a {
        channels.iter().filter(|c| self.is_queue_text(c))
    }

    /// Classify a member's voice channel (`None` when disconnected).
    pub fn presence(&self, voice: Option<&ChannelInfo>) -> Presence {
        match voice {
            None => Presence::OffScope,
            Some(channel) if self.is_queue_voice(channel) => Presence::Designated,
            Some(_) => Presence::Elsewhere,
        }
    }
}
