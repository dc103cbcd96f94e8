//! The Entity Table: `scope -> member -> EntityState`.
//!
//! Structural changes (insertions, removals) happen under the table lock;
//! everything inside an entity happens under that entity's own lock. The two
//! are never nested with the table lock on the inside, and the table lock is
//! never held while waiting for an entity lock.
//!
//! Each entity gets one reclamation watcher when it is created. The watcher
//! sleeps until the entity's `mtime + clean_after` (plus slack), rechecks, and
//! once the deadline has truly passed removes the entity and defaces whatever
//! it still tracks.

use super::entity::EntityState;
use crate::config::Timing;
use crate::metrics;
use crate::platform::{Platform, force_annotation};
use crate::telemetry::spans;
use queuewarden_proto::{Annotation, MemberId, ScopeId};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{Instrument, debug, info, warn};

type Members = HashMap<MemberId, Arc<EntityState>>;

pub struct EntityTable {
    scopes: Mutex<HashMap<ScopeId, Members>>,
    platform: Arc<dyn Platform>,
    timing: Timing,
}

impl EntityTable {
    pub fn new(platform: Arc<dyn Platform>, timing: Timing) -> Arc<Self> {
        Arc::new(Self {
            scopes: Mutex::new(HashMap::new()),
            platform,
            timing,
        })
    }

    /// Return the entity for `(scope, member)`, creating it on first use.
    ///
    /// Creation and the spawning of its watcher happen under the table lock,
    /// so concurrent callers always observe the same entity.
    pub async fn get_or_create(self: &Arc<Self>, scope: ScopeId, member: MemberId) -> Arc<EntityState> {
        let mut scopes = self.scopes.lock().await;
        let members = scopes.entry(scope).or_default();
        if let Some(existing) = members.get(&member) {
            return Arc::clone(existing);
        }

        let entity = Arc::new(EntityState::new(scope, member));
        members.insert(member, Arc::clone(&entity));
        let total = count(&scopes);
        drop(scopes);

        debug!(scope = %scope, member = %member, "entity created");
        metrics::set_tracked_entities(total);
        tokio::spawn(watch(Arc::downgrade(self), Arc::clone(&entity)));
        entity
    }

    /// Look up an entity without creating it.
    pub async fn get(&self, scope: ScopeId, member: MemberId) -> Option<Arc<EntityState>> {
        let scopes = self.scopes.lock().await;
        scopes.get(&scope)?.get(&member).cloned()
    }

    /// Whether `entity` itself (not merely its key) is still in the table.
    pub async fn contains(&self, entity: &Arc<EntityState>) -> bool {
        let scopes = self.scopes.lock().await;
        scopes
            .get(&entity.scope())
            .and_then(|members| members.get(&entity.member()))
            .is_some_and(|current| Arc::ptr_eq(current, entity))
    }

    /// Remove `entity` if it is still the one stored under its key.
    ///
    /// A scope left without members is dropped. Returns whether anything was
    /// removed.
    pub async fn remove(&self, entity: &Arc<EntityState>) -> bool {
        let mut scopes = self.scopes.lock().await;
        let scope = entity.scope();
        let Some(members) = scopes.get_mut(&scope) else {
            return false;
        };
        match members.get(&entity.member()) {
            Some(current) if Arc::ptr_eq(current, entity) => {}
            _ => return false,
        }
        members.remove(&entity.member());
        if members.is_empty() {
            scopes.remove(&scope);
        }
        metrics::set_tracked_entities(count(&scopes));
        true
    }

    /// Drop every entity of a scope without defacing anything.
    pub async fn clear_scope(&self, scope: ScopeId) -> usize {
        let mut scopes = self.scopes.lock().await;
        let removed = scopes.remove(&scope).map_or(0, |m| m.len());
        metrics::set_tracked_entities(count(&scopes));
        if removed > 0 {
            info!(scope = %scope, removed, "scope cleared");
        }
        removed
    }

    /// Snapshot the entities of a scope.
    ///
    /// The table lock is released before returning, so callers may lock the
    /// entities one by one.
    pub async fn members(&self, scope: ScopeId) -> Vec<Arc<EntityState>> {
        let scopes = self.scopes.lock().await;
        scopes
            .get(&scope)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn scopes(&self) -> Vec<ScopeId> {
        self.scopes.lock().await.keys().copied().collect()
    }

    /// Total number of entities across all scopes.
    pub async fn len(&self) -> usize {
        count(&*self.scopes.lock().await)
    }

    pub async fn is_empty(&self) -> bool {
        self.scopes.lock().await.is_empty()
    }

    /// Reclaim every entity of `scope` whose clean-after deadline has passed.
    ///
    /// Runs when a scope goes inactive, ahead of the per-entity watchers.
    pub async fn reclaim_expired(&self, scope: ScopeId) -> usize {
        let span = spans::reclaim(scope);

        async move {
            let mut reclaimed = 0;
            for entity in self.members(scope).await {
                if self.deadline_of(&entity).await > Instant::now() {
                    continue;
                }
                if self.reclaim(&entity).await {
                    reclaimed += 1;
                }
            }
            reclaimed
        }
        .instrument(span)
        .await
    }

    async fn deadline_of(&self, entity: &EntityState) -> Instant {
        entity.mtime().await + self.timing.clean_after
    }

    /// Remove `entity` and, if that succeeded, deface what it tracks.
    async fn reclaim(&self, entity: &Arc<EntityState>) -> bool {
        if !self.remove(entity).await {
            return false;
        }
        info!(scope = %entity.scope(), member = %entity.member(), "reclaiming idle entity");
        metrics::record_reclaimed();
        deface(self.platform.as_ref(), entity).await;
        true
    }
}

fn count(scopes: &HashMap<ScopeId, Members>) -> usize {
    scopes.values().map(HashMap::len).sum()
}

/// Mark everything the entity still tracks as ignored, then forget it.
///
/// Items that can no longer be resolved are skipped; other failures are
/// logged and do not stop the pass.
async fn deface(platform: &dyn Platform, entity: &EntityState) {
    let scope = entity.scope();
    let mut tracked = entity.lock().await;
    for (channel, item) in tracked.items() {
        match force_annotation(platform, scope, channel, item, Annotation::Ignored).await {
            Ok(outcome) => {
                debug!(scope = %scope, channel = %channel, item = %item, ?outcome, "defaced");
            }
            Err(e) => {
                warn!(scope = %scope, channel = %channel, item = %item, error = %e, "defacement failed");
            }
        }
    }
    tracked.clear();
}

/// Reclamation watcher for a single entity.
async fn watch(table: Weak<EntityTable>, entity: Arc<EntityState>) {
    loop {
        let Some(strong) = table.upgrade() else {
            return;
        };
        let timing = strong.timing;
        let deadline = strong.deadline_of(&entity).await;
        drop(strong);

        if deadline > Instant::now() {
            tokio::time::sleep_until(deadline + timing.epsilon).await;
            continue;
        }

        let Some(strong) = table.upgrade() else {
            return;
        };
        if !strong.reclaim(&entity).await {
            debug!(scope = %entity.scope(), member = %entity.member(), "watcher found entity already gone");
        }
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryPlatform;
    use chrono::Utc;
    use queuewarden_proto::{
        ChannelId, ChannelInfo, ChannelKind, Item, ItemId, MemberInfo, ScopeSetup,
    };
    use std::time::Duration;

    const SCOPE: ScopeId = ScopeId(1);
    const C1: ChannelId = ChannelId(100);
    const C2: ChannelId = ChannelId(101);
    const BOT: MemberId = MemberId(1);
    const STUDENT: MemberId = MemberId(10);

    fn timing() -> Timing {
        Timing {
            active_window: Duration::from_secs(60),
            clean_after: Duration::from_secs(600),
            epsilon: Duration::from_secs(1),
        }
    }

    fn platform() -> Arc<MemoryPlatform> {
        let platform = MemoryPlatform::new(BOT);
        let channel = |id, name: &str| ChannelInfo {
            id,
            name: name.into(),
            kind: ChannelKind::Text,
            category: None,
        };
        platform.add_scope(ScopeSetup {
            scope: SCOPE,
            name: "Lab".into(),
            channels: vec![channel(C1, "очередь-1"), channel(C2, "очередь-2")],
            members: vec![MemberInfo {
                id: STUDENT,
                name: "student".into(),
                roles: vec![],
                voice: None,
            }],
        });
        Arc::new(platform)
    }

    fn item(channel: ChannelId, id: u64) -> Item {
        Item {
            id: ItemId(id),
            channel,
            author: STUDENT,
            created_at: Utc::now(),
            content: "lab 1".into(),
            reactions: vec![],
        }
    }

    #[tokio::test]
    async fn concurrent_creation_yields_one_entity() {
        let table = EntityTable::new(platform(), timing());
        let (a, b) = tokio::join!(
            table.get_or_create(SCOPE, STUDENT),
            table.get_or_create(SCOPE, STUDENT)
        );
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn removal_is_identity_checked() {
        let table = EntityTable::new(platform(), timing());
        let old = table.get_or_create(SCOPE, STUDENT).await;
        assert!(table.remove(&old).await);
        assert!(table.is_empty().await);

        let new = table.get_or_create(SCOPE, STUDENT).await;
        assert!(!table.remove(&old).await);
        assert!(table.contains(&new).await);
        assert!(!table.contains(&old).await);
    }

    #[tokio::test]
    async fn clear_scope_drops_everything() {
        let table = EntityTable::new(platform(), timing());
        table.get_or_create(SCOPE, STUDENT).await;
        table.get_or_create(SCOPE, MemberId(11)).await;
        table.get_or_create(ScopeId(2), STUDENT).await;

        assert_eq!(table.clear_scope(SCOPE).await, 2);
        assert_eq!(table.len().await, 1);
        assert!(table.members(SCOPE).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_entity_is_reclaimed_and_defaced() {
        let platform = platform();
        platform.post_item(SCOPE, item(C1, 1)).unwrap();
        platform.post_item(SCOPE, item(C2, 2)).unwrap();
        let table = EntityTable::new(platform.clone(), timing());

        let entity = table.get_or_create(SCOPE, STUDENT).await;
        {
            let mut tracked = entity.lock().await;
            tracked.track(C1, ItemId(1), true);
            tracked.track(C2, ItemId(2), false);
            tracked.touch();
        }
        // One of the two items disappears upstream before reclamation.
        assert!(platform.delete_item(SCOPE, C1, ItemId(1)));

        tokio::time::sleep(Duration::from_secs(602)).await;

        assert!(table.is_empty().await);
        assert!(entity.lock().await.is_empty());
        let survivor = platform.item(SCOPE, C2, ItemId(2)).unwrap();
        assert_eq!(
            survivor.annotations(),
            queuewarden_proto::AnnotationSet::only(Annotation::Ignored)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn touched_entity_outlives_first_deadline() {
        let table = EntityTable::new(platform(), timing());
        let entity = table.get_or_create(SCOPE, STUDENT).await;

        tokio::time::sleep(Duration::from_secs(500)).await;
        entity.lock().await.touch();

        // Past the original deadline but well before the refreshed one.
        tokio::time::sleep(Duration::from_secs(200)).await;
        assert!(table.contains(&entity).await);

        tokio::time::sleep(Duration::from_secs(450)).await;
        assert!(!table.contains(&entity).await);
    }

    #[tokio::test(start_paused = true)]
    async fn reclaim_expired_only_takes_idle_entities() {
        let table = EntityTable::new(platform(), timing());
        let idle = table.get_or_create(SCOPE, STUDENT).await;
        tokio::time::advance(Duration::from_secs(300)).await;
        let busy = table.get_or_create(SCOPE, MemberId(11)).await;
        tokio::time::advance(Duration::from_secs(300)).await;

        assert_eq!(table.reclaim_expired(SCOPE).await, 1);
        assert!(!table.contains(&idle).await);
        assert!(table.contains(&busy).await);
    }
}
