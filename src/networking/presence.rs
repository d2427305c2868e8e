//! Presence sync contract
//!
//! Presence is the external real-time channel that keeps every client's view
//! of avatars consistent. Publishes are fire-and-forget; confirmation arrives
//! asynchronously as a fresh [`AvatarSet`] on the subscription.

use super::PresenceResult;
use crate::world::avatar::{Avatar, AvatarPatch};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Full avatar set as last broadcast, ordered by creation then id
pub type AvatarSet = Arc<Vec<Avatar>>;

/// Receives every avatar set change. Only the latest snapshot is kept.
pub type PresenceSubscription = watch::Receiver<AvatarSet>;

/// A change published for one avatar
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceUpdate {
    /// Create or replace the whole record
    Upsert(Avatar),
    /// Merge into an existing record
    Patch(AvatarPatch),
}

#[async_trait]
pub trait PresenceSync: Send + Sync {
    /// Subscribe to avatar set changes. The receiver starts at the current set.
    async fn subscribe(&self) -> PresenceResult<PresenceSubscription>;

    /// Publish an update for one avatar
    async fn publish(&self, avatar_id: Uuid, update: PresenceUpdate) -> PresenceResult<()>;

    /// Remove an avatar and release its cell for everyone
    async fn remove(&self, avatar_id: Uuid) -> PresenceResult<()>;

    /// Best-effort "remove me" usable from teardown paths.
    ///
    /// Must not block or await. Losing the signal is acceptable.
    fn signal_departure(&self, avatar_id: Uuid);

    /// Get presence implementation name for debugging
    fn name(&self) -> &'static str;
}
