//! In-memory platform.
//!
//! Holds scopes, channels, members and items in process memory. Used by the
//! replay binary as its upstream and by tests as a fully inspectable fake.

use super::Platform;
use crate::error::PlatformError;
use async_trait::async_trait;
use dashmap::DashMap;
use queuewarden_proto::{
    Annotation, ChannelId, ChannelInfo, Item, ItemId, MemberId, MemberInfo, Reaction, ScopeId,
    ScopeSetup,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct ScopeRecord {
    channels: Vec<ChannelInfo>,
    members: HashMap<MemberId, MemberInfo>,
    forbidden: HashSet<ChannelId>,
    /// Items per channel, ordered by id (snowflakes grow with time).
    items: HashMap<ChannelId, BTreeMap<ItemId, Item>>,
}

impl ScopeRecord {
    fn channel(&self, channel: ChannelId) -> Result<&ChannelInfo, PlatformError> {
        self.channels
            .iter()
            .find(|c| c.id == channel)
            .ok_or(PlatformError::ChannelNotFound(channel))
    }

    fn readable(&self, channel: ChannelId) -> Result<(), PlatformError> {
        self.channel(channel)?;
        if self.forbidden.contains(&channel) {
            return Err(PlatformError::Forbidden(channel));
        }
        Ok(())
    }

    fn item_mut(&mut self, channel: ChannelId, item: ItemId) -> Result<&mut Item, PlatformError> {
        self.readable(channel)?;
        self.items
            .get_mut(&channel)
            .and_then(|items| items.get_mut(&item))
            .ok_or(PlatformError::ItemNotFound { channel, item })
    }
}

/// A [`Platform`] backed by process memory.
///
/// Lookups clone out of the map so no shard guard outlives a call.
#[derive(Debug)]
pub struct MemoryPlatform {
    self_id: MemberId,
    scopes: DashMap<ScopeId, ScopeRecord>,
    reaction_writes: AtomicUsize,
    reaction_outage: AtomicBool,
}

impl MemoryPlatform {
    pub fn new(self_id: MemberId) -> Self {
        Self {
            self_id,
            scopes: DashMap::new(),
            reaction_writes: AtomicUsize::new(0),
            reaction_outage: AtomicBool::new(false),
        }
    }

    /// Declare (or redeclare) a scope. Items of a redeclared scope are kept.
    pub fn add_scope(&self, setup: ScopeSetup) {
        let mut record = self.scopes.entry(setup.scope).or_default();
        record.channels = setup.channels;
        record.members = setup.members.into_iter().map(|m| (m.id, m)).collect();
    }

    /// Insert or replace an item, keeping reactions of a replaced item when
    /// the new snapshot carries none (an edit does not wipe reactions).
    pub fn post_item(&self, scope: ScopeId, mut item: Item) -> Result<(), PlatformError> {
        let mut record = self
            .scopes
            .get_mut(&scope)
            .ok_or(PlatformError::ScopeNotFound(scope))?;
        record.channel(item.channel)?;
        let items = record.items.entry(item.channel).or_default();
        if let Some(previous) = items.get(&item.id)
            && item.reactions.is_empty()
        {
            item.reactions = previous.reactions.clone();
        }
        items.insert(item.id, item);
        Ok(())
    }

    /// Delete an item; returns whether it existed.
    pub fn delete_item(&self, scope: ScopeId, channel: ChannelId, item: ItemId) -> bool {
        self.scopes
            .get_mut(&scope)
            .and_then(|mut r| r.items.get_mut(&channel).and_then(|i| i.remove(&item)))
            .is_some()
    }

    /// Inspect an item without going through the async trait.
    pub fn item(&self, scope: ScopeId, channel: ChannelId, item: ItemId) -> Option<Item> {
        let record = self.scopes.get(&scope)?;
        record.items.get(&channel)?.get(&item).cloned()
    }

    /// Place a reaction on behalf of `member`.
    pub fn react(
        &self,
        scope: ScopeId,
        channel: ChannelId,
        item: ItemId,
        member: MemberId,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        let mut record = self
            .scopes
            .get_mut(&scope)
            .ok_or(PlatformError::ScopeNotFound(scope))?;
        let item = record.item_mut(channel, item)?;
        match item.reactions.iter_mut().find(|r| r.emoji == emoji) {
            Some(reaction) => {
                if !reaction.placed_by(member) {
                    reaction.users.push(member);
                }
            }
            None => item.reactions.push(Reaction {
                emoji: emoji.to_string(),
                users: vec![member],
            }),
        }
        Ok(())
    }

    /// Withdraw `member`'s reaction; the reaction disappears with its last user.
    pub fn unreact(
        &self,
        scope: ScopeId,
        channel: ChannelId,
        item: ItemId,
        member: MemberId,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        let mut record = self
            .scopes
            .get_mut(&scope)
            .ok_or(PlatformError::ScopeNotFound(scope))?;
        let item = record.item_mut(channel, item)?;
        for reaction in item.reactions.iter_mut().filter(|r| r.emoji == emoji) {
            reaction.users.retain(|u| *u != member);
        }
        item.reactions.retain(|r| !r.users.is_empty());
        Ok(())
    }

    /// Strip every reaction from an item.
    pub fn clear_reactions(
        &self,
        scope: ScopeId,
        channel: ChannelId,
        item: ItemId,
    ) -> Result<(), PlatformError> {
        self.with_scope_mut(scope, |r| {
            r.item_mut(channel, item)?.reactions.clear();
            Ok(())
        })
    }

    /// Change a member's voice presence; returns the previous voice channel.
    pub fn set_voice(
        &self,
        scope: ScopeId,
        member: MemberId,
        voice: Option<ChannelId>,
    ) -> Result<Option<ChannelId>, PlatformError> {
        let mut record = self
            .scopes
            .get_mut(&scope)
            .ok_or(PlatformError::ScopeNotFound(scope))?;
        let info = record
            .members
            .get_mut(&member)
            .ok_or(PlatformError::MemberNotFound(member))?;
        Ok(std::mem::replace(&mut info.voice, voice))
    }

    /// Deny access to a channel's items from now on.
    pub fn forbid(&self, scope: ScopeId, channel: ChannelId) {
        if let Some(mut record) = self.scopes.get_mut(&scope) {
            record.forbidden.insert(channel);
        }
    }

    /// Number of reaction add/clear calls made through the trait.
    pub fn reaction_writes(&self) -> usize {
        self.reaction_writes.load(Ordering::Relaxed)
    }

    /// While set, reaction writes through the trait fail as unavailable.
    pub fn set_reaction_outage(&self, down: bool) {
        self.reaction_outage.store(down, Ordering::Relaxed);
    }

    fn check_reaction_outage(&self) -> Result<(), PlatformError> {
        if self.reaction_outage.load(Ordering::Relaxed) {
            return Err(PlatformError::Unavailable("reaction writes are down".into()));
        }
        Ok(())
    }

    fn with_scope<T>(
        &self,
        scope: ScopeId,
        f: impl FnOnce(&ScopeRecord) -> Result<T, PlatformError>,
    ) -> Result<T, PlatformError> {
        let record = self
            .scopes
            .get(&scope)
            .ok_or(PlatformError::ScopeNotFound(scope))?;
        f(&record)
    }

    fn with_scope_mut<T>(
        &self,
        scope: ScopeId,
        f: impl FnOnce(&mut ScopeRecord) -> Result<T, PlatformError>,
    ) -> Result<T, PlatformError> {
        let mut record = self
            .scopes
            .get_mut(&scope)
            .ok_or(PlatformError::ScopeNotFound(scope))?;
        f(&mut record)
    }
}

#[async_trait]
impl Platform for MemoryPlatform {
    fn self_id(&self) -> MemberId {
        self.self_id
    }

    async fn channels(&self, scope: ScopeId) -> Result<Vec<ChannelInfo>, PlatformError> {
        self.with_scope(scope, |r| Ok(r.channels.clone()))
    }

    async fn channel(
        &self,
        scope: ScopeId,
        channel: ChannelId,
    ) -> Result<ChannelInfo, PlatformError> {
        self.with_scope(scope, |r| r.channel(channel).cloned())
    }

    async fn member(&self, scope: ScopeId, member: MemberId) -> Result<MemberInfo, PlatformError> {
        self.with_scope(scope, |r| {
            r.members
                .get(&member)
                .cloned()
                .ok_or(PlatformError::MemberNotFound(member))
        })
    }

    async fn fetch_item(
        &self,
        scope: ScopeId,
        channel: ChannelId,
        item: ItemId,
    ) -> Result<Item, PlatformError> {
        self.with_scope(scope, |r| {
            r.readable(channel)?;
            r.items
                .get(&channel)
                .and_then(|items| items.get(&item))
                .cloned()
                .ok_or(PlatformError::ItemNotFound { channel, item })
        })
    }

    async fn history(&self, scope: ScopeId, channel: ChannelId) -> Result<Vec<Item>, PlatformError> {
        self.with_scope(scope, |r| {
            r.readable(channel)?;
            Ok(r.items
                .get(&channel)
                .map(|items| items.values().rev().cloned().collect())
                .unwrap_or_default())
        })
    }

    async fn add_reaction(
        &self,
        scope: ScopeId,
        channel: ChannelId,
        item: ItemId,
        annotation: Annotation,
    ) -> Result<(), PlatformError> {
        self.check_reaction_outage()?;
        self.reaction_writes.fetch_add(1, Ordering::Relaxed);
        self.react(scope, channel, item, self.self_id, annotation.emoji())
    }

    async fn clear_reaction(
        &self,
        scope: ScopeId,
        channel: ChannelId,
        item: ItemId,
        annotation: Annotation,
    ) -> Result<(), PlatformError> {
        self.check_reaction_outage()?;
        self.reaction_writes.fetch_add(1, Ordering::Relaxed);
        self.with_scope_mut(scope, |r| {
            let item = r.item_mut(channel, item)?;
            item.reactions.retain(|x| x.emoji != annotation.emoji());
            Ok(())
        })
    }

    async fn move_member(
        &self,
        scope: ScopeId,
        member: MemberId,
        voice: ChannelId,
    ) -> Result<(), PlatformError> {
        self.with_scope(scope, |r| r.channel(voice).map(|_| ()))?;
        self.set_voice(scope, member, Some(voice)).map(|_| ())
    }
}
