//! Placement coordinator
//!
//! Allocates floor cells for avatars owned by the local session and repairs
//! cross-client conflicts. There is no central lock: every client decides on
//! its own snapshot, publishes optimistically, and when two avatars end up on
//! the same cell the deterministic loser (later creation, then larger id)
//! moves. Only the client owning the loser acts, so each conflict is repaired
//! exactly once.

use super::avatar::{Avatar, AvatarPatch};
use super::events::{DegradedReason, PlacementOutcome, Resolution};
use super::grid::{GridCell, GridConfig};
use super::occupancy::OccupancyIndex;
use crate::config::settings::PlacementSettings;
use crate::networking::{PresenceError, PresenceSync, PresenceUpdate};
use glam::Vec3;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
pub enum PlacementError {
    #[error("Cell {cell} is occupied by {occupant}")]
    CellOccupied { cell: GridCell, occupant: Uuid },

    #[error("Unknown avatar: {id}")]
    UnknownAvatar { id: Uuid },

    #[error("Avatar {id} is not owned by this session")]
    NotOwner { id: Uuid },

    #[error("Presence error: {0}")]
    Presence(#[from] PresenceError),
}

pub type PlacementResult<T> = Result<T, PlacementError>;

pub struct PlacementCoordinator {
    grid: GridConfig,
    session: Uuid,
    max_attempts: u32,
    search_radius: u32,
    /// Latest avatar set with local optimistic writes applied
    known: BTreeMap<Uuid, Avatar>,
    /// Conflict-driven retries per owned avatar since it last settled
    attempts: HashMap<Uuid, u32>,
    /// Owned avatars parked on the centre cell after a degraded placement
    degraded: HashSet<Uuid>,
    presence: Arc<dyn PresenceSync>,
}

impl std::fmt::Debug for PlacementCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacementCoordinator")
            .field("session", &self.session)
            .field("known", &self.known.len())
            .field("presence", &self.presence.name())
            .finish()
    }
}

impl PlacementCoordinator {
    pub fn new(
        grid: GridConfig,
        session: Uuid,
        settings: &PlacementSettings,
        presence: Arc<dyn PresenceSync>,
    ) -> Self {
        Self {
            grid,
            session,
            max_attempts: settings.max_attempts,
            search_radius: settings.search_radius.unwrap_or(grid.grid_size / 2),
            known: BTreeMap::new(),
            attempts: HashMap::new(),
            degraded: HashSet::new(),
            presence,
        }
    }

    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn avatar(&self, id: Uuid) -> Option<&Avatar> {
        self.known.get(&id)
    }

    pub fn avatars(&self) -> impl Iterator<Item = &Avatar> {
        self.known.values()
    }

    /// Occupancy as this client currently sees it
    pub fn index(&self) -> OccupancyIndex {
        OccupancyIndex::build(self.grid, self.known.values()).with_search_radius(self.search_radius)
    }

    /// Record an avatar created locally before presence echoes it back
    pub fn upsert_local(&mut self, avatar: Avatar) {
        self.known.insert(avatar.id, avatar);
    }

    /// Apply a local edit to the cached record
    pub fn patch_local(&mut self, id: Uuid, patch: &AvatarPatch) -> PlacementResult<()> {
        let avatar = self.owned_mut(id)?;
        avatar.apply_patch(patch);
        Ok(())
    }

    /// Drop all local knowledge of an avatar
    pub fn forget(&mut self, id: Uuid) -> Option<Avatar> {
        self.attempts.remove(&id);
        self.degraded.remove(&id);
        self.known.remove(&id)
    }

    fn owned_mut(&mut self, id: Uuid) -> PlacementResult<&mut Avatar> {
        let session = self.session;
        let avatar = self
            .known
            .get_mut(&id)
            .ok_or(PlacementError::UnknownAvatar { id })?;
        if avatar.owner != session {
            return Err(PlacementError::NotOwner { id });
        }
        Ok(avatar)
    }

    /// Claim the preferred cell, or the nearest free one, and publish it.
    pub async fn allocate(&mut self, id: Uuid, preferred: GridCell) -> PlacementResult<PlacementOutcome> {
        self.owned_mut(id)?;
        let attempt = self.attempts.get(&id).copied().unwrap_or(0);
        self.place(id, preferred, attempt).await
    }

    async fn place(&mut self, id: Uuid, origin: GridCell, attempt: u32) -> PlacementResult<PlacementOutcome> {
        let outcome = if attempt > self.max_attempts {
            PlacementOutcome::Degraded {
                avatar_id: id,
                cell: self.grid.center_cell(),
                reason: DegradedReason::RetriesExhausted,
            }
        } else {
            let index = OccupancyIndex::build_excluding(self.grid, self.known.values(), id)
                .with_search_radius(self.search_radius);
            match index.nearest_free(origin) {
                Some(cell) => PlacementOutcome::Placed { avatar_id: id, cell, attempt },
                None => PlacementOutcome::Degraded {
                    avatar_id: id,
                    cell: self.grid.center_cell(),
                    reason: DegradedReason::GridFull,
                },
            }
        };

        match &outcome {
            PlacementOutcome::Placed { cell, .. } => {
                self.degraded.remove(&id);
                info!("🧍 Avatar {} placed at {} (attempt {})", id, cell, attempt);
            }
            PlacementOutcome::Degraded { cell, reason, .. } => {
                self.degraded.insert(id);
                warn!("🧍 Placement degraded for {} ({:?}), parking at {}", id, reason, cell);
            }
        }

        let position = self.grid.to_world(outcome.cell());
        let avatar = self.owned_mut(id)?;
        avatar.position = Some(position);
        let record = avatar.clone();
        self.presence.publish(id, PresenceUpdate::Upsert(record)).await?;
        Ok(outcome)
    }

    /// Move to the cell under `target`. Never falls back to another cell.
    pub async fn move_to(&mut self, id: Uuid, target: Vec3) -> PlacementResult<PlacementOutcome> {
        self.owned_mut(id)?;
        let cell = self.grid.to_cell(target);
        let index = OccupancyIndex::build_excluding(self.grid, self.known.values(), id);
        if let Some(occupant) = index.occupant_of(cell) {
            debug!("🧍 Move of {} to {} rejected, held by {}", id, cell, occupant);
            return Err(PlacementError::CellOccupied { cell, occupant });
        }

        let mut record = self.owned_mut(id)?.clone();
        record.position = Some(self.grid.to_world(cell));
        self.presence.publish(id, PresenceUpdate::Upsert(record.clone())).await?;
        self.known.insert(id, record);
        self.attempts.remove(&id);
        self.degraded.remove(&id);
        info!("🧍 Avatar {} moved to {}", id, cell);
        Ok(PlacementOutcome::Placed { avatar_id: id, cell, attempt: 0 })
    }

    /// Adopt a presence snapshot and repair anything the local session owns.
    ///
    /// Contested cells go to the claimant with precedence; every other
    /// claimant owned here is re-placed starting from the contested cell.
    /// Owned avatars off a cell centre are snapped back. Avatars parked on the
    /// centre after a degraded placement are left alone until moved.
    pub async fn reconcile(&mut self, avatars: &[Avatar]) -> PlacementResult<Vec<Resolution>> {
        let mut next: BTreeMap<Uuid, Avatar> = avatars.iter().map(|a| (a.id, a.clone())).collect();
        // Owned records not echoed yet stay as written locally
        for (id, avatar) in &self.known {
            if avatar.owner == self.session && !next.contains_key(id) {
                next.insert(*id, avatar.clone());
            }
        }
        self.known = next;

        let mut resolutions = Vec::new();
        let mut touched = HashSet::new();

        for conflict in self.index().conflicts() {
            for loser in conflict.losers {
                if !self.is_owned(loser) || self.is_parked(loser, conflict.cell) {
                    continue;
                }
                let attempt = {
                    let count = self.attempts.entry(loser).or_insert(0);
                    *count += 1;
                    *count
                };
                debug!(
                    "🧍 Avatar {} lost {} to {}, retry {}",
                    loser, conflict.cell, conflict.winner, attempt
                );
                let outcome = self.place(loser, conflict.cell, attempt).await?;
                touched.insert(loser);
                resolutions.push(Resolution::ConflictResolved {
                    avatar_id: loser,
                    lost_to: conflict.winner,
                    from: conflict.cell,
                    outcome,
                });
            }
        }

        let misaligned: Vec<(Uuid, Vec3)> = self
            .known
            .values()
            .filter(|a| a.owner == self.session && !touched.contains(&a.id))
            .filter_map(|a| a.position.map(|p| (a.id, p)))
            .filter(|(_, p)| !self.grid.is_aligned(*p))
            .collect();
        for (id, position) in misaligned {
            debug!("🧍 Avatar {} off cell centre at {:?}, realigning", id, position);
            let attempt = self.attempts.get(&id).copied().unwrap_or(0);
            let outcome = self.place(id, self.grid.to_cell(position), attempt).await?;
            touched.insert(id);
            resolutions.push(Resolution::Realigned { avatar_id: id, outcome });
        }

        // Anything owned and untouched has settled
        let settled: Vec<Uuid> = self
            .attempts
            .keys()
            .filter(|id| !touched.contains(*id))
            .copied()
            .collect();
        for id in settled {
            self.attempts.remove(&id);
        }

        Ok(resolutions)
    }

    fn is_owned(&self, id: Uuid) -> bool {
        self.known.get(&id).map(|a| a.owner == self.session).unwrap_or(false)
    }

    fn is_parked(&self, id: Uuid, cell: GridCell) -> bool {
        self.degraded.contains(&id) && cell == self.grid.center_cell()
    }
}
