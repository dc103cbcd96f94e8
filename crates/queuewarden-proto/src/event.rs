//! Wire form of upstream events.
//!
//! An event source writes one JSON object per line; the `type` field selects
//! the variant.
//!
//! ```text
//! {"type":"presence","scope":1,"member":10,"voice":500}
//! {"type":"reaction","scope":1,"channel":100,"item":7,"member":20,"emoji":"finished","added":true}
//! ```

use crate::ids::{ChannelId, ItemId, MemberId, ScopeId};
use crate::item::{ChannelInfo, Item, MemberInfo};
use serde::{Deserialize, Serialize};

/// Static description of a scope, used to seed a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSetup {
    /// Scope identifier.
    pub scope: ScopeId,
    /// Display name.
    pub name: String,
    /// Channels in platform order.
    #[serde(default)]
    pub channels: Vec<ChannelInfo>,
    /// Known members.
    #[serde(default)]
    pub members: Vec<MemberInfo>,
}

/// One upstream notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpstreamEvent {
    /// Declare a scope with its channels and members.
    Setup(ScopeSetup),
    /// An item was posted or edited.
    Item {
        /// Owning scope.
        scope: ScopeId,
        /// Full item snapshot.
        item: Item,
    },
    /// An item was deleted.
    ItemDeleted {
        /// Owning scope.
        scope: ScopeId,
        /// Channel holding the item.
        channel: ChannelId,
        /// Deleted item.
        item: ItemId,
    },
    /// A reaction was placed or withdrawn.
    Reaction {
        /// Owning scope.
        scope: ScopeId,
        /// Channel holding the item.
        channel: ChannelId,
        /// Reacted item.
        item: ItemId,
        /// Member who reacted.
        member: MemberId,
        /// Emoji text or annotation name.
        emoji: String,
        /// `true` for add, `false` for removal.
        added: bool,
    },
    /// Every reaction was removed from an item at once.
    ReactionsCleared {
        /// Owning scope.
        scope: ScopeId,
        /// Channel holding the item.
        channel: ChannelId,
        /// Cleared item.
        item: ItemId,
    },
    /// A member's voice presence changed.
    Presence {
        /// Owning scope.
        scope: ScopeId,
        /// Member whose presence changed.
        member: MemberId,
        /// New voice channel, `None` when disconnected.
        voice: Option<ChannelId>,
    },
    /// A scope became reachable.
    ScopeAvailable {
        /// Scope identifier.
        scope: ScopeId,
    },
    /// A scope became wholly unreachable.
    ScopeUnavailable {
        /// Scope identifier.
        scope: ScopeId,
    },
    /// A teacher asked for the next member in a queue channel.
    Next {
        /// Owning scope.
        scope: ScopeId,
        /// Queue text channel.
        channel: ChannelId,
        /// Requesting teacher.
        teacher: MemberId,
    },
    /// Pause the event source.
    Sleep {
        /// Seconds to pause.
        secs: f64,
    },
}

impl UpstreamEvent {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Setup(_) => "setup",
            Self::Item { .. } => "item",
            Self::ItemDeleted { .. } => "item_deleted",
            Self::Reaction { .. } => "reaction",
            Self::ReactionsCleared { .. } => "reactions_cleared",
            Self::Presence { .. } => "presence",
            Self::ScopeAvailable { .. } => "scope_available",
            Self::ScopeUnavailable { .. } => "scope_unavailable",
            Self::Next { .. } => "next",
            Self::Sleep { .. } => "sleep",
        }
    }
}
