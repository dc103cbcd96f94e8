//! Per-(scope, member) state.
//!
//! An [`EntityState`] owns the items a member currently has standing in each
//! queue channel. Its fields are only reachable through [`EntityState::lock`],
//! so any function taking `&mut Tracked` is statically known to run inside the
//! entity's critical section.

use queuewarden_proto::{ChannelId, ItemId, MemberId, ScopeId};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

/// The lock-protected contents of an entity.
///
/// Invariant: every id in `finished` is also a value of `items`.
#[derive(Debug)]
pub struct Tracked {
    items: BTreeMap<ChannelId, ItemId>,
    finished: HashSet<ItemId>,
    mtime: Instant,
}

impl Tracked {
    fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            finished: HashSet::new(),
            mtime: Instant::now(),
        }
    }

    /// The item currently tracked for `channel`.
    pub fn tracked_in(&self, channel: ChannelId) -> Option<ItemId> {
        self.items.get(&channel).copied()
    }

    pub fn is_finished(&self, item: ItemId) -> bool {
        self.finished.contains(&item)
    }

    /// Whether any tracked item is flagged finished.
    pub fn has_finished(&self) -> bool {
        !self.finished.is_empty()
    }

    /// Snapshot of `(channel, item)` pairs in channel id order.
    pub fn items(&self) -> Vec<(ChannelId, ItemId)> {
        self.items.iter().map(|(c, i)| (*c, *i)).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Record `item` as the one tracked for `channel`, returning the displaced item.
    pub fn track(&mut self, channel: ChannelId, item: ItemId, finished: bool) -> Option<ItemId> {
        let displaced = self.items.insert(channel, item);
        if let Some(old) = displaced {
            self.finished.remove(&old);
        }
        if finished {
            self.finished.insert(item);
        }
        displaced
    }

    /// Stop tracking whatever is tracked for `channel`.
    pub fn untrack(&mut self, channel: ChannelId) -> Option<ItemId> {
        let removed = self.items.remove(&channel);
        if let Some(item) = removed {
            self.finished.remove(&item);
        }
        removed
    }

    /// Stop tracking `channel` only if it still maps to `item`.
    pub fn untrack_item(&mut self, channel: ChannelId, item: ItemId) -> bool {
        if self.tracked_in(channel) != Some(item) {
            return false;
        }
        self.untrack(channel);
        true
    }

    /// Set or clear the finished flag of a tracked item; returns whether it changed.
    ///
    /// Untracked items can never be flagged.
    pub fn set_finished(&mut self, item: ItemId, finished: bool) -> bool {
        if !finished {
            return self.finished.remove(&item);
        }
        if !self.items.values().any(|i| *i == item) {
            return false;
        }
        self.finished.insert(item)
    }

    /// Last mutation time.
    pub fn mtime(&self) -> Instant {
        self.mtime
    }

    /// Bump the mutation time to now.
    pub fn touch(&mut self) {
        self.mtime = Instant::now();
    }

    /// Drop everything, returning what was tracked.
    pub fn clear(&mut self) -> Vec<(ChannelId, ItemId)> {
        let items = self.items();
        self.items.clear();
        self.finished.clear();
        items
    }

    #[cfg(test)]
    pub(crate) fn finished_within_tracked(&self) -> bool {
        self.finished
            .iter()
            .all(|f| self.items.values().any(|i| i == f))
    }
}

/// State of one member within one scope.
#[derive(Debug)]
pub struct EntityState {
    scope: ScopeId,
    member: MemberId,
    tracked: Mutex<Tracked>,
}

/// An acquired entity lock. Holding one is the only way to read or mutate
/// [`Tracked`].
pub type EntityGuard<'a> = MutexGuard<'a, Tracked>;

impl EntityState {
    pub(crate) fn new(scope: ScopeId, member: MemberId) -> Self {
        Self {
            scope,
            member,
            tracked: Mutex::new(Tracked::new()),
        }
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn member(&self) -> MemberId {
        self.member
    }

    /// Acquire the entity lock.
    ///
    /// Never call this while holding the table lock.
    pub async fn lock(&self) -> EntityGuard<'_> {
        self.tracked.lock().await
    }

    /// Read the mutation time (briefly takes the entity lock).
    pub async fn mtime(&self) -> Instant {
        self.tracked.lock().await.mtime
    }
}
