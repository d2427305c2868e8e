//! Per-visitor venue client
//!
//! Wires placement, presence, model loading and animation together for one
//! session. Everything is injected; nothing here is global. Async methods talk
//! to presence, while [`VenueClient::tick`] is the synchronous per-frame entry
//! point and never waits on I/O.

use crate::animation::{AnimationController, FrameSample};
use crate::assets::{AssetError, AssetRef, ModelInstance, ModelNormalizer, NormalizedModel};
use crate::config::VenueSettings;
use crate::networking::{PresenceError, PresenceSubscription, PresenceSync, PresenceUpdate};
use crate::world::{
    Avatar, AvatarPatch, Customization, GridCell, ModelRef, OccupancyIndex, PlacementCoordinator,
    PlacementError, PlacementOutcome, VenueEvent,
};
use glam::Vec3;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum VenueError {
    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Presence(#[from] PresenceError),
}

pub type VenueResult<T> = Result<T, VenueError>;

/// Completed model load delivered back to the frame loop
struct ModelLoad {
    avatar_id: Uuid,
    asset: AssetRef,
    model: Arc<NormalizedModel>,
    error: Option<AssetError>,
}

/// Everything needed to draw one avatar
#[derive(Debug)]
pub struct AvatarView {
    asset: AssetRef,
    customization: Option<Customization>,
    instance: ModelInstance,
    animation: AnimationController,
    last_frame: FrameSample,
}

impl AvatarView {
    pub fn asset(&self) -> &AssetRef {
        &self.asset
    }

    pub fn model(&self) -> &Arc<NormalizedModel> {
        self.instance.base()
    }

    pub fn instance(&self) -> &ModelInstance {
        &self.instance
    }

    pub fn animation(&self) -> &AnimationController {
        &self.animation
    }

    pub fn last_frame(&self) -> &FrameSample {
        &self.last_frame
    }

    /// Still showing the placeholder box
    pub fn is_loading(&self) -> bool {
        self.instance.base().placeholder
    }

    fn show(&mut self, model: Arc<NormalizedModel>) {
        self.instance = ModelInstance::new(model);
        if let Some(customization) = &self.customization {
            self.instance.apply_customization(customization);
        }
        self.animation.set_clips(self.instance.base().clips().to_vec());
        self.last_frame = self.animation.sample();
    }
}

pub struct VenueClient {
    session: Uuid,
    settings: VenueSettings,
    presence: Arc<dyn PresenceSync>,
    subscription: PresenceSubscription,
    placement: PlacementCoordinator,
    normalizer: Arc<ModelNormalizer>,
    views: HashMap<Uuid, AvatarView>,
    playing: bool,
    loads_tx: mpsc::UnboundedSender<ModelLoad>,
    loads_rx: mpsc::UnboundedReceiver<ModelLoad>,
    torn_down: bool,
}

impl std::fmt::Debug for VenueClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VenueClient")
            .field("session", &self.session)
            .field("views", &self.views.len())
            .field("playing", &self.playing)
            .finish()
    }
}

impl VenueClient {
    /// Join the venue as a new session
    pub async fn connect(
        session: Uuid,
        settings: VenueSettings,
        presence: Arc<dyn PresenceSync>,
        normalizer: Arc<ModelNormalizer>,
    ) -> VenueResult<Self> {
        let subscription = presence.subscribe().await?;
        let placement = PlacementCoordinator::new(
            settings.grid_config(),
            session,
            &settings.placement,
            Arc::clone(&presence),
        );
        let (loads_tx, loads_rx) = mpsc::unbounded_channel();
        info!("🚪 Session {} joined via {}", session, presence.name());

        Ok(Self {
            session,
            settings,
            presence,
            subscription,
            placement,
            normalizer,
            views: HashMap::new(),
            playing: false,
            loads_tx,
            loads_rx,
            torn_down: false,
        })
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn avatar(&self, id: Uuid) -> Option<&Avatar> {
        self.placement.avatar(id)
    }

    pub fn view(&self, id: Uuid) -> Option<&AvatarView> {
        self.views.get(&id)
    }

    pub fn occupancy(&self) -> OccupancyIndex {
        self.placement.index()
    }

    /// Cell of an avatar as this client sees it
    pub fn cell_of(&self, id: Uuid) -> Option<GridCell> {
        let grid = self.placement.grid();
        self.placement.avatar(id)?.position.map(|p| grid.to_cell(p))
    }

    /// Avatars owned by this session
    pub fn owned_avatars(&self) -> Vec<Uuid> {
        self.placement
            .avatars()
            .filter(|a| a.owner == self.session)
            .map(|a| a.id)
            .collect()
    }

    /// Create an avatar and place it at `preferred` (grid centre by default)
    pub async fn create_avatar(
        &mut self,
        name: impl Into<String>,
        model: ModelRef,
        preferred: Option<GridCell>,
    ) -> VenueResult<(Uuid, PlacementOutcome)> {
        let avatar = Avatar::new(Uuid::new_v4(), self.session, name, model);
        let id = avatar.id;
        info!("🧍 Creating avatar {} ({})", avatar.name, id);
        self.ensure_view(&avatar);
        self.placement.upsert_local(avatar);

        let origin = preferred.unwrap_or_else(|| self.placement.grid().center_cell());
        match self.placement.allocate(id, origin).await {
            Ok(outcome) => Ok((id, outcome)),
            Err(e) => {
                // Nobody else has seen it, so drop every local trace
                warn!("🧍 Creating avatar {} failed: {}", id, e);
                self.placement.forget(id);
                self.views.remove(&id);
                Err(e.into())
            }
        }
    }

    pub async fn move_avatar(&mut self, id: Uuid, target: Vec3) -> VenueResult<PlacementOutcome> {
        Ok(self.placement.move_to(id, target).await?)
    }

    pub async fn customize(&mut self, id: Uuid, customization: Customization) -> VenueResult<()> {
        let patch = AvatarPatch::customization(customization.clone());
        self.placement.patch_local(id, &patch)?;
        self.presence.publish(id, PresenceUpdate::Patch(patch)).await?;
        if let Some(view) = self.views.get_mut(&id) {
            let changed = view.instance.apply_customization(&customization);
            view.customization = Some(customization);
            debug!("🎨 Customized {} ({} parts recoloured)", id, changed);
        }
        Ok(())
    }

    /// Delete an owned avatar and release its cell
    pub async fn delete_avatar(&mut self, id: Uuid) -> VenueResult<()> {
        match self.placement.avatar(id) {
            None => return Err(PlacementError::UnknownAvatar { id }.into()),
            Some(avatar) if avatar.owner != self.session => {
                return Err(PlacementError::NotOwner { id }.into())
            }
            Some(_) => {}
        }
        self.presence.remove(id).await?;
        self.placement.forget(id);
        self.views.remove(&id);
        info!("🧍 Avatar {} deleted", id);
        Ok(())
    }

    /// Read the subscription and apply the latest snapshot if it moved
    pub async fn sync(&mut self) -> VenueResult<Vec<VenueEvent>> {
        let changed = self
            .subscription
            .has_changed()
            .map_err(|_| PresenceError::ChannelClosed)?;
        if !changed {
            return Ok(Vec::new());
        }
        let snapshot = self.subscription.borrow_and_update().clone();
        self.apply_presence(&snapshot).await
    }

    /// Reconcile against an avatar set and refresh avatar views
    pub async fn apply_presence(&mut self, avatars: &[Avatar]) -> VenueResult<Vec<VenueEvent>> {
        let mut events: Vec<VenueEvent> = self
            .placement
            .reconcile(avatars)
            .await?
            .into_iter()
            .map(VenueEvent::Resolved)
            .collect();

        let current: Vec<Avatar> = self.placement.avatars().cloned().collect();
        let present: HashSet<Uuid> = current.iter().map(|a| a.id).collect();

        for avatar in &current {
            if self.ensure_view(avatar) {
                events.push(VenueEvent::AvatarJoined {
                    avatar_id: avatar.id,
                    name: avatar.name.clone(),
                });
            }
        }

        let departed: Vec<Uuid> = self
            .views
            .keys()
            .filter(|id| !present.contains(*id))
            .copied()
            .collect();
        for id in departed {
            self.views.remove(&id);
            info!("🚪 Avatar {} left the venue", id);
            events.push(VenueEvent::AvatarLeft { avatar_id: id });
        }

        Ok(events)
    }

    /// Create or refresh the view for an avatar. Returns true if it is new.
    fn ensure_view(&mut self, avatar: &Avatar) -> bool {
        let asset = avatar.model.asset.clone();
        let customization = avatar.model.customization.clone();

        if let Some(view) = self.views.get_mut(&avatar.id) {
            if view.asset != asset {
                debug!("🎨 Avatar {} switched model to {}", avatar.id, asset);
                view.asset = asset.clone();
                view.customization = customization;
                view.show(self.normalizer.placeholder(&asset));
                self.spawn_load(avatar.id, asset);
            } else if view.customization != customization {
                if let Some(c) = &customization {
                    view.instance.apply_customization(c);
                }
                view.customization = customization;
            }
            return false;
        }

        let mut animation = AnimationController::new(self.settings.animation.crossfade_seconds);
        animation.set_playing(self.playing);
        let mut view = AvatarView {
            asset: asset.clone(),
            customization,
            instance: ModelInstance::new(self.normalizer.placeholder(&asset)),
            last_frame: animation.sample(),
            animation,
        };
        view.show(Arc::clone(view.instance.base()));
        self.views.insert(avatar.id, view);
        self.spawn_load(avatar.id, asset);
        true
    }

    fn spawn_load(&self, avatar_id: Uuid, asset: AssetRef) {
        let normalizer = Arc::clone(&self.normalizer);
        let tx = self.loads_tx.clone();
        tokio::spawn(async move {
            let (model, error) = normalizer.load_or_placeholder(&asset).await;
            // Receiver gone means the client was dropped mid-load
            let _ = tx.send(ModelLoad { avatar_id, asset, model, error });
        });
    }

    /// Follow the venue's shared playing flag
    pub fn set_playing(&mut self, playing: bool) {
        if self.playing == playing {
            return;
        }
        self.playing = playing;
        info!("🎵 Playback {}", if playing { "started" } else { "stopped" });
        for view in self.views.values_mut() {
            view.animation.set_playing(playing);
        }
    }

    /// Advance one rendered frame: swap in finished models, then animate
    pub fn tick(&mut self, dt: f32) -> Vec<VenueEvent> {
        let mut events = Vec::new();

        while let Ok(load) = self.loads_rx.try_recv() {
            let Some(view) = self.views.get_mut(&load.avatar_id) else {
                continue;
            };
            if view.asset != load.asset {
                debug!("🎨 Dropping stale load of {} for {}", load.asset, load.avatar_id);
                continue;
            }
            view.show(load.model);
            match load.error {
                None => events.push(VenueEvent::ModelReady {
                    avatar_id: load.avatar_id,
                    asset: load.asset,
                }),
                Some(e) => {
                    warn!("🎨 Avatar {} keeps placeholder: {}", load.avatar_id, e);
                    events.push(VenueEvent::ModelFailed {
                        avatar_id: load.avatar_id,
                        asset: load.asset,
                        reason: e.to_string(),
                    });
                }
            }
        }

        for view in self.views.values_mut() {
            view.last_frame = view.animation.tick(dt);
        }
        events
    }

    /// Best-effort removal of every owned avatar. Never blocks.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        for id in self.owned_avatars() {
            self.presence.signal_departure(id);
        }
        info!("🚪 Session {} left", self.session);
    }
}

impl Drop for VenueClient {
    fn drop(&mut self) {
        self.teardown();
    }
}
