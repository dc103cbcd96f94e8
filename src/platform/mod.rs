//! Upstream platform abstraction.
//!
//! The engine never talks to a chat service directly. Everything it needs
//! from upstream (channel layout, member presence, item snapshots, reaction
//! writes) goes through [`Platform`].

use crate::error::PlatformError;
use async_trait::async_trait;
use queuewarden_proto::{
    Annotation, ChannelId, ChannelInfo, Item, ItemId, MemberId, MemberInfo, ScopeId,
};

pub mod annotate;
pub mod memory;

pub use annotate::{AnnotationOutcome, apply_annotation, force_annotation};
pub use memory::MemoryPlatform;

#[async_trait]
pub trait Platform: Send + Sync {
    /// The member id the engine acts as upstream.
    fn self_id(&self) -> MemberId;

    /// All channels of a scope, in stable platform order.
    async fn channels(&self, scope: ScopeId) -> Result<Vec<ChannelInfo>, PlatformError>;

    /// Lookup a single channel.
    async fn channel(&self, scope: ScopeId, channel: ChannelId)
    -> Result<ChannelInfo, PlatformError>;

    /// Lookup a member, including current voice presence.
    async fn member(&self, scope: ScopeId, member: MemberId) -> Result<MemberInfo, PlatformError>;

    /// Fetch a fresh snapshot of an item.
    async fn fetch_item(
        &self,
        scope: ScopeId,
        channel: ChannelId,
        item: ItemId,
    ) -> Result<Item, PlatformError>;

    /// Items of a channel, newest first.
    async fn history(&self, scope: ScopeId, channel: ChannelId) -> Result<Vec<Item>, PlatformError>;

    /// Place the engine's own reaction for `annotation`.
    async fn add_reaction(
        &self,
        scope: ScopeId,
        channel: ChannelId,
        item: ItemId,
        annotation: Annotation,
    ) -> Result<(), PlatformError>;

    /// Remove the `annotation` reaction entirely, whoever placed it.
    async fn clear_reaction(
        &self,
        scope: ScopeId,
        channel: ChannelId,
        item: ItemId,
        annotation: Annotation,
    ) -> Result<(), PlatformError>;

    /// Move a member into a voice channel.
    async fn move_member(
        &self,
        scope: ScopeId,
        member: MemberId,
        voice: ChannelId,
    ) -> Result<(), PlatformError>;
}
