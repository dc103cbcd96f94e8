//! The coordination engine.
//!
//! Bundles the platform, the entity table, the activity monitor and the
//! reconciler. Upstream events enter through the `on_*` handlers (see
//! [`crate::handlers`]); each handler resolves the member, takes the member's
//! entity lock once, and runs reconciliation inside it.

use crate::classify::{Presence, QueueClassifier};
use crate::config::{Config, StartupConfig, Timing};
use crate::error::QueueResult;
use crate::platform::Platform;
use crate::reconcile::{Reconciler, resolve};
use crate::state::{ActivityEvent, ActivityMonitor, EntityTable};
use queuewarden_proto::{MemberInfo, ScopeId};
use serde::Serialize;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

pub struct Engine {
    pub(crate) platform: Arc<dyn Platform>,
    pub(crate) table: Arc<EntityTable>,
    pub(crate) activity: ActivityMonitor,
    pub(crate) reconciler: Reconciler,
    pub(crate) classifier: QueueClassifier,
    pub(crate) startup: StartupConfig,
    pub(crate) timing: Timing,
}

/// Point-in-time view served on `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub active_scopes: Vec<ScopeId>,
    pub tracked_scopes: Vec<ScopeId>,
    pub tracked_entities: usize,
}

impl Engine {
    /// Build the engine and start its background tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(platform: Arc<dyn Platform>, config: &Config) -> Arc<Self> {
        let timing = Timing::from(&config.timing);
        let classifier = QueueClassifier::new(&config.queue);
        let activity = ActivityMonitor::start(timing);
        let table = EntityTable::new(Arc::clone(&platform), timing);
        let reconciler = Reconciler::new(Arc::clone(&platform), activity.clone(), classifier.clone());

        spawn_reclaimer(&activity, Arc::downgrade(&table));

        Arc::new(Self {
            platform,
            table,
            activity,
            reconciler,
            classifier,
            startup: config.startup.clone(),
            timing,
        })
    }

    pub fn table(&self) -> &Arc<EntityTable> {
        &self.table
    }

    pub fn activity(&self) -> &ActivityMonitor {
        &self.activity
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub async fn status(&self) -> EngineStatus {
        let mut active_scopes = self.activity.active_scopes();
        active_scopes.sort();
        let mut tracked_scopes = self.table.scopes().await;
        tracked_scopes.sort();
        EngineStatus {
            active_scopes,
            tracked_scopes,
            tracked_entities: self.table.len().await,
        }
    }

    /// Classify where `member` currently is, per the platform.
    pub(crate) async fn presence_of(
        &self,
        scope: ScopeId,
        member: &MemberInfo,
    ) -> QueueResult<Presence> {
        let Some(voice) = member.voice else {
            return Ok(Presence::OffScope);
        };
        let channel = resolve(self.platform.channel(scope, voice).await)?;
        Ok(match channel {
            Some(channel) => self.classifier.presence(Some(&channel)),
            None => Presence::OffScope,
        })
    }
}

/// Reclaim idle entities of a scope as soon as it goes inactive.
fn spawn_reclaimer(activity: &ActivityMonitor, table: Weak<EntityTable>) {
    let mut events = activity.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ActivityEvent::Ended(scope)) => {
                    let Some(table) = table.upgrade() else {
                        return;
                    };
                    let reclaimed = table.reclaim_expired(scope).await;
                    if reclaimed > 0 {
                        info!(scope = %scope, reclaimed, "reclaimed idle entities of inactive scope");
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "activity observer lagged");
                }
                Err(RecvError::Closed) => return,
            }
        }
    });
}
