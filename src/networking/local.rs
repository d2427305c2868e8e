//! In-process presence hub
//!
//! Every simulated client holds a clone of the same hub. Updates are applied to
//! a shared map and the resulting set is broadcast on a watch channel, so a
//! client only sees other clients' decisions once it reads its subscription.

use super::presence::{AvatarSet, PresenceSubscription, PresenceSync, PresenceUpdate};
use super::{PresenceError, PresenceResult};
use crate::world::avatar::Avatar;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Hub statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubStats {
    pub upserts: u64,
    pub patches: u64,
    pub removals: u64,
    pub departures: u64,
    pub broadcasts: u64,
}

struct HubInner {
    avatars: RwLock<BTreeMap<Uuid, Avatar>>,
    stats: RwLock<HubStats>,
    tx: watch::Sender<AvatarSet>,
}

#[derive(Clone)]
pub struct LocalPresenceHub {
    inner: Arc<HubInner>,
}

impl std::fmt::Debug for LocalPresenceHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalPresenceHub")
            .field("subscribers", &self.inner.tx.receiver_count())
            .finish()
    }
}

impl Default for LocalPresenceHub {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalPresenceHub {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Arc::new(HubInner {
                avatars: RwLock::new(BTreeMap::new()),
                stats: RwLock::new(HubStats::default()),
                tx,
            }),
        }
    }

    /// Current avatar set without subscribing
    pub fn snapshot(&self) -> AvatarSet {
        self.inner.tx.borrow().clone()
    }

    pub async fn stats(&self) -> HubStats {
        self.inner.stats.read().await.clone()
    }

    fn broadcast(&self, avatars: &BTreeMap<Uuid, Avatar>) {
        let mut set: Vec<Avatar> = avatars.values().cloned().collect();
        set.sort_by(|a, b| a.precedence(b));
        debug!("📡 Broadcasting avatar set ({} avatars)", set.len());
        self.inner.tx.send_replace(Arc::new(set));
    }

    async fn bump<F: FnOnce(&mut HubStats)>(&self, f: F) {
        let mut stats = self.inner.stats.write().await;
        f(&mut stats);
        stats.broadcasts += 1;
    }
}

#[async_trait]
impl PresenceSync for LocalPresenceHub {
    async fn subscribe(&self) -> PresenceResult<PresenceSubscription> {
        Ok(self.inner.tx.subscribe())
    }

    async fn publish(&self, avatar_id: Uuid, update: PresenceUpdate) -> PresenceResult<()> {
        let mut avatars = self.inner.avatars.write().await;
        match update {
            PresenceUpdate::Upsert(avatar) => {
                if avatar.id != avatar_id {
                    return Err(PresenceError::Other {
                        reason: format!("Upsert for {} carries record {}", avatar_id, avatar.id),
                    });
                }
                avatars.insert(avatar_id, avatar);
                self.broadcast(&avatars);
                drop(avatars);
                self.bump(|s| s.upserts += 1).await;
            }
            PresenceUpdate::Patch(patch) => {
                let Some(avatar) = avatars.get_mut(&avatar_id) else {
                    return Err(PresenceError::UnknownAvatar { id: avatar_id });
                };
                avatar.apply_patch(&patch);
                self.broadcast(&avatars);
                drop(avatars);
                self.bump(|s| s.patches += 1).await;
            }
        }
        Ok(())
    }

    async fn remove(&self, avatar_id: Uuid) -> PresenceResult<()> {
        let mut avatars = self.inner.avatars.write().await;
        if avatars.remove(&avatar_id).is_none() {
            debug!("📡 Remove for unknown avatar {}, ignoring", avatar_id);
            return Ok(());
        }
        self.broadcast(&avatars);
        drop(avatars);
        self.bump(|s| s.removals += 1).await;
        info!("📡 Avatar {} removed from presence", avatar_id);
        Ok(())
    }

    fn signal_departure(&self, avatar_id: Uuid) {
        match self.inner.avatars.try_write() {
            Ok(mut avatars) => {
                if avatars.remove(&avatar_id).is_some() {
                    self.broadcast(&avatars);
                    if let Ok(mut stats) = self.inner.stats.try_write() {
                        stats.departures += 1;
                        stats.broadcasts += 1;
                    }
                    info!("📡 Departure signalled for {}", avatar_id);
                }
            }
            Err(_) => match tokio::runtime::Handle::try_current() {
                // Lock is busy: hand the removal to the runtime if there is one
                Ok(handle) => {
                    let hub = self.clone();
                    handle.spawn(async move {
                        if let Err(e) = hub.remove(avatar_id).await {
                            warn!("📡 Deferred departure for {} failed: {}", avatar_id, e);
                        }
                    });
                }
                Err(_) => warn!("📡 Departure signal for {} dropped", avatar_id),
            },
        }
    }

    fn name(&self) -> &'static str {
        "LocalPresenceHub"
    }
}
