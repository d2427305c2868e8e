//! Events raised by a venue client while it reconciles presence and renders.
//! These are clean, application-friendly data structures for UI messaging.

use super::grid::GridCell;
use crate::assets::AssetRef;
use uuid::Uuid;

/// Outcome of placing an avatar on the floor
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementOutcome {
    /// The avatar claimed a free cell
    Placed {
        avatar_id: Uuid,
        cell: GridCell,
        /// Number of conflict-driven retries it took
        attempt: u32,
    },
    /// No free cell was found (or retries ran out); the avatar sits on the
    /// grid centre regardless of occupancy
    Degraded {
        avatar_id: Uuid,
        cell: GridCell,
        reason: DegradedReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradedReason {
    GridFull,
    RetriesExhausted,
}

impl PlacementOutcome {
    pub fn avatar_id(&self) -> Uuid {
        match self {
            PlacementOutcome::Placed { avatar_id, .. } => *avatar_id,
            PlacementOutcome::Degraded { avatar_id, .. } => *avatar_id,
        }
    }

    pub fn cell(&self) -> GridCell {
        match self {
            PlacementOutcome::Placed { cell, .. } => *cell,
            PlacementOutcome::Degraded { cell, .. } => *cell,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, PlacementOutcome::Degraded { .. })
    }
}

/// Something the local client did while reconciling a presence snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A locally owned avatar lost a contested cell and moved
    ConflictResolved {
        avatar_id: Uuid,
        lost_to: Uuid,
        from: GridCell,
        outcome: PlacementOutcome,
    },
    /// A locally owned avatar had an off-grid position and was snapped
    Realigned {
        avatar_id: Uuid,
        outcome: PlacementOutcome,
    },
}

impl Resolution {
    pub fn outcome(&self) -> &PlacementOutcome {
        match self {
            Resolution::ConflictResolved { outcome, .. } => outcome,
            Resolution::Realigned { outcome, .. } => outcome,
        }
    }
}

/// Events surfaced by the venue client to its caller
#[derive(Debug, Clone, PartialEq)]
pub enum VenueEvent {
    AvatarJoined { avatar_id: Uuid, name: String },
    AvatarLeft { avatar_id: Uuid },
    Resolved(Resolution),
    ModelReady { avatar_id: Uuid, asset: AssetRef },
    /// Load failed; the avatar keeps its placeholder
    ModelFailed { avatar_id: Uuid, asset: AssetRef, reason: String },
}

impl VenueEvent {
    /// Check if the event needs user-facing messaging
    pub fn is_degraded(&self) -> bool {
        match self {
            VenueEvent::Resolved(resolution) => resolution.outcome().is_degraded(),
            VenueEvent::ModelFailed { .. } => true,
            _ => false,
        }
    }
}
