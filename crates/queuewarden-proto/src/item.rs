//! Snapshots of upstream objects as the engine sees them.

use crate::annotation::{Annotation, AnnotationSet};
use crate::ids::{ChannelId, ItemId, MemberId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reaction on an item, aggregated over all users who placed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// Emoji text.
    pub emoji: String,
    /// Members who placed it.
    #[serde(default)]
    pub users: Vec<MemberId>,
}

impl Reaction {
    /// Whether `member` is among the reactors.
    pub fn placed_by(&self, member: MemberId) -> bool {
        self.users.contains(&member)
    }
}

/// A trackable upstream artifact (a message in a queue channel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Item identifier.
    pub id: ItemId,
    /// Channel the item was posted in.
    pub channel: ChannelId,
    /// Member who posted it.
    pub author: MemberId,
    /// Upstream creation time (wall clock).
    pub created_at: DateTime<Utc>,
    /// Message text.
    #[serde(default)]
    pub content: String,
    /// Reactions currently on the item.
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl Item {
    /// The spectrum reactions observed on this item, regardless of who placed them.
    pub fn annotations(&self) -> AnnotationSet {
        self.reactions
            .iter()
            .filter_map(|r| Annotation::from_emoji(&r.emoji))
            .collect()
    }

    /// The reaction carrying `annotation`, if present.
    pub fn reaction(&self, annotation: Annotation) -> Option<&Reaction> {
        self.reactions.iter().find(|r| r.emoji == annotation.emoji())
    }
}

/// Kind of channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Text channel holding items.
    Text,
    /// Voice channel members can be present in.
    Voice,
}

/// A channel as enumerated by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Channel identifier.
    pub id: ChannelId,
    /// Display name.
    pub name: String,
    /// Text or voice.
    pub kind: ChannelKind,
    /// Name of the enclosing category, if any.
    #[serde(default)]
    pub category: Option<String>,
}

/// A member as known to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    /// Member identifier.
    pub id: MemberId,
    /// Display name.
    pub name: String,
    /// Role names.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Voice channel the member is currently connected to.
    #[serde(default)]
    pub voice: Option<ChannelId>,
}
