use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;
use venue_rust::animation::AnimationState;
use venue_rust::assets::source::mannequin;
use venue_rust::assets::{MemoryAssetSource, ModelNormalizer, PartTags};
use venue_rust::config::VenueSettings;
use venue_rust::networking::{
    AvatarSet, LocalPresenceHub, PresenceError, PresenceResult, PresenceSubscription, PresenceSync,
    PresenceUpdate,
};
use venue_rust::world::{Customization, GridCell, ModelRef, VenueEvent};
use venue_rust::VenueClient;

fn normalizer(settings: &VenueSettings) -> Arc<ModelNormalizer> {
    let source = MemoryAssetSource::new().with_model(mannequin("robot", 180.0));
    Arc::new(ModelNormalizer::new(Arc::new(source), settings.model.clone()))
}

async fn client(hub: &LocalPresenceHub, normalizer: &Arc<ModelNormalizer>) -> VenueClient {
    VenueClient::connect(
        Uuid::new_v4(),
        VenueSettings::default(),
        Arc::new(hub.clone()),
        Arc::clone(normalizer),
    )
    .await
    .unwrap()
}

/// Presence whose transport is down: subscribing works, publishing never does
struct OfflinePresence {
    tx: watch::Sender<AvatarSet>,
}

impl OfflinePresence {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Vec::new()));
        Self { tx }
    }
}

#[async_trait]
impl PresenceSync for OfflinePresence {
    async fn subscribe(&self) -> PresenceResult<PresenceSubscription> {
        Ok(self.tx.subscribe())
    }

    async fn publish(&self, _avatar_id: Uuid, _update: PresenceUpdate) -> PresenceResult<()> {
        Err(PresenceError::Transport { reason: "offline".into() })
    }

    async fn remove(&self, _avatar_id: Uuid) -> PresenceResult<()> {
        Ok(())
    }

    fn signal_departure(&self, _avatar_id: Uuid) {}

    fn name(&self) -> &'static str {
        "offline"
    }
}

/// Tick until model loads come back or give up
async fn tick_until_loaded(client: &mut VenueClient) -> Vec<VenueEvent> {
    let mut events = Vec::new();
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        events.extend(client.tick(0.0));
        if events
            .iter()
            .any(|e| matches!(e, VenueEvent::ModelReady { .. } | VenueEvent::ModelFailed { .. }))
        {
            break;
        }
    }
    events
}

#[tokio::test]
async fn test_clients_converge_on_floor() {
    let settings = VenueSettings::default();
    let normalizer = normalizer(&settings);
    let hub = LocalPresenceHub::new();
    let mut a = client(&hub, &normalizer).await;
    let mut b = client(&hub, &normalizer).await;

    let (first, _) = a.create_avatar("first", ModelRef::new("robot"), None).await.unwrap();
    // Creation time decides who keeps the cell
    tokio::time::sleep(Duration::from_millis(3)).await;
    let (second, _) = b.create_avatar("second", ModelRef::new("robot"), None).await.unwrap();

    for _ in 0..4 {
        a.sync().await.unwrap();
        b.sync().await.unwrap();
    }

    assert_eq!(a.cell_of(first), Some(GridCell::new(10, 10)));
    assert_eq!(a.cell_of(second), Some(GridCell::new(11, 10)));
    assert_eq!(b.cell_of(first), a.cell_of(first));
    assert_eq!(b.cell_of(second), a.cell_of(second));
    assert!(a.occupancy().conflicts().is_empty());
}

#[tokio::test]
async fn test_model_loads_and_animates() {
    let settings = VenueSettings::default();
    let normalizer = normalizer(&settings);
    let hub = LocalPresenceHub::new();
    let mut visitor = client(&hub, &normalizer).await;

    let (id, _) = visitor.create_avatar("dancer", ModelRef::new("robot"), None).await.unwrap();
    assert!(visitor.view(id).unwrap().is_loading());
    assert!(visitor.view(id).unwrap().last_frame().is_rest_pose());

    let events = tick_until_loaded(&mut visitor).await;
    assert!(events.contains(&VenueEvent::ModelReady { avatar_id: id, asset: "robot".into() }));

    let view = visitor.view(id).unwrap();
    assert!(!view.is_loading());
    assert!((view.model().scale - 2.5 / 180.0).abs() < 1e-6);
    assert!(view.model().bounds().unwrap().min.y.abs() <= 1e-6);

    // First frame on the loaded model: idle at full weight, no fade
    let frame = view.last_frame();
    assert_eq!(frame.state, AnimationState::Idle);
    assert_eq!(frame.layers.len(), 1);
    assert_eq!(frame.layers[0].name, "Idle_01");
    assert_eq!(frame.layers[0].weight, 1.0);

    visitor.set_playing(true);
    for _ in 0..30 {
        visitor.tick(1.0 / 60.0);
        let frame = visitor.view(id).unwrap().last_frame();
        assert!(frame.layers.iter().all(|l| l.name != "TPose"));
    }
    let frame = visitor.view(id).unwrap().last_frame();
    assert_eq!(frame.state, AnimationState::Dance);
    assert_eq!(frame.layers.len(), 1);
    assert_eq!(frame.layers[0].name, "Dance_Shuffle");
}

#[tokio::test]
async fn test_missing_asset_keeps_placeholder() {
    let settings = VenueSettings::default();
    let normalizer = normalizer(&settings);
    let hub = LocalPresenceHub::new();
    let mut visitor = client(&hub, &normalizer).await;

    let (id, outcome) = visitor.create_avatar("ghost", ModelRef::new("nowhere"), None).await.unwrap();
    assert!(!outcome.is_degraded());

    let events = tick_until_loaded(&mut visitor).await;
    assert!(events.iter().any(|e| matches!(e, VenueEvent::ModelFailed { avatar_id, .. } if *avatar_id == id)));
    assert!(events.iter().all(|e| !matches!(e, VenueEvent::ModelReady { .. })));

    let view = visitor.view(id).unwrap();
    assert!(view.is_loading());
    assert_eq!(view.last_frame().state, AnimationState::NoAnimation);
    assert!(view.last_frame().is_rest_pose());
}

#[tokio::test]
async fn test_customization_reaches_other_clients() {
    let settings = VenueSettings::default();
    let normalizer = normalizer(&settings);
    let hub = LocalPresenceHub::new();
    let mut owner = client(&hub, &normalizer).await;
    let mut watcher = client(&hub, &normalizer).await;

    let (id, _) = owner.create_avatar("styled", ModelRef::new("robot"), None).await.unwrap();
    tick_until_loaded(&mut owner).await;
    watcher.sync().await.unwrap();
    tick_until_loaded(&mut watcher).await;

    let red = [1.0, 0.0, 0.0];
    owner
        .customize(id, Customization { hair: Some(red), ..Default::default() })
        .await
        .unwrap();
    watcher.sync().await.unwrap();

    for client in [&owner, &watcher] {
        let instance = client.view(id).unwrap().instance();
        let hair = instance.parts_tagged(PartTags::HAIR);
        assert!(!hair.is_empty());
        assert!(hair.iter().all(|i| instance.part_colors()[*i] == red));
    }

    // Only the owner may customize
    let err = watcher.customize(id, Customization::default()).await;
    assert!(err.is_err());
}

#[tokio::test]
async fn test_delete_and_teardown_release_cells() {
    let settings = VenueSettings::default();
    let normalizer = normalizer(&settings);
    let hub = LocalPresenceHub::new();
    let mut a = client(&hub, &normalizer).await;
    let mut b = client(&hub, &normalizer).await;

    let (deleted, _) = a.create_avatar("short-stay", ModelRef::new("robot"), None).await.unwrap();
    b.sync().await.unwrap();
    a.delete_avatar(deleted).await.unwrap();

    let events = b.sync().await.unwrap();
    assert!(events.contains(&VenueEvent::AvatarLeft { avatar_id: deleted }));
    assert!(b.occupancy().is_free(GridCell::new(10, 10)));

    let (kept, _) = a.create_avatar("leaver", ModelRef::new("robot"), None).await.unwrap();
    assert_eq!(hub.snapshot().len(), 1);
    drop(a);
    assert!(hub.snapshot().iter().all(|avatar| avatar.id != kept));

    b.sync().await.unwrap();
    assert!(b.view(kept).is_none());
    assert_eq!(b.occupancy().occupied_count(), 0);
}

#[tokio::test]
async fn test_failed_create_leaves_nothing_behind() {
    let settings = VenueSettings::default();
    let normalizer = normalizer(&settings);
    let mut visitor = VenueClient::connect(
        Uuid::new_v4(),
        settings.clone(),
        Arc::new(OfflinePresence::new()),
        Arc::clone(&normalizer),
    )
    .await
    .unwrap();

    let result = visitor.create_avatar("unlucky", ModelRef::new("robot"), None).await;
    assert!(result.is_err());
    assert!(visitor.owned_avatars().is_empty());
    assert!(visitor.occupancy().is_free(GridCell::new(10, 10)));

    // A late model load for the dropped avatar is ignored
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(visitor.tick(0.016).is_empty());

    // Nothing resurfaces on the next reconcile either
    let events = visitor.apply_presence(&[]).await.unwrap();
    assert!(events.is_empty());
    assert!(visitor.owned_avatars().is_empty());
}
