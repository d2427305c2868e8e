use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use uuid::Uuid;
use venue_rust::config::PlacementSettings;
use venue_rust::networking::{LocalPresenceHub, PresenceSync};
use venue_rust::world::{
    Avatar, GridCell, GridConfig, ModelRef, OccupancyIndex, PlacementCoordinator, PlacementError,
};

fn coordinator(hub: &LocalPresenceHub, session: Uuid) -> PlacementCoordinator {
    PlacementCoordinator::new(GridConfig::default(), session, &PlacementSettings::default(), Arc::new(hub.clone()))
}

async fn settle(hub: &LocalPresenceHub, clients: &mut [PlacementCoordinator]) {
    for _ in 0..32 {
        let mut quiet = true;
        for client in clients.iter_mut() {
            let snapshot = hub.snapshot();
            if !client.reconcile(&snapshot).await.unwrap().is_empty() {
                quiet = false;
            }
        }
        if quiet {
            return;
        }
    }
    panic!("floor did not settle");
}

fn assert_settled(grid: &GridConfig, avatars: &[Avatar]) {
    let index = OccupancyIndex::build(*grid, avatars);
    assert!(index.conflicts().is_empty(), "conflicts: {:?}", index.conflicts());
    for avatar in avatars {
        let position = avatar.position.expect("placed avatar");
        assert!(grid.is_aligned(position), "{} off centre at {:?}", avatar.id, position);
        assert_eq!(position.y, 0.0);
    }
}

#[tokio::test]
async fn test_two_clients_race_for_centre() {
    let hub = LocalPresenceHub::new();
    let (session_a, session_b) = (Uuid::new_v4(), Uuid::new_v4());
    let mut clients = vec![coordinator(&hub, session_a), coordinator(&hub, session_b)];

    let first = Avatar::new(Uuid::new_v4(), session_a, "first", ModelRef::new("m")).with_created_at(1_000);
    let second = Avatar::new(Uuid::new_v4(), session_b, "second", ModelRef::new("m")).with_created_at(1_001);
    let (first_id, second_id) = (first.id, second.id);
    clients[0].upsert_local(first);
    clients[1].upsert_local(second);

    // Neither has seen the other yet
    let centre = GridCell::new(10, 10);
    assert_eq!(clients[0].allocate(first_id, centre).await.unwrap().cell(), centre);
    assert_eq!(clients[1].allocate(second_id, centre).await.unwrap().cell(), centre);

    settle(&hub, &mut clients).await;

    let grid = GridConfig::default();
    let snapshot = hub.snapshot();
    let cell_of = |id: Uuid| {
        grid.to_cell(snapshot.iter().find(|a| a.id == id).unwrap().position.unwrap())
    };
    assert_eq!(cell_of(first_id), GridCell::new(10, 10));
    assert_eq!(cell_of(second_id), GridCell::new(11, 10));
    assert_settled(&grid, &snapshot);
}

#[tokio::test]
async fn test_move_onto_occupied_cell() {
    let hub = LocalPresenceHub::new();
    let (session_a, session_b) = (Uuid::new_v4(), Uuid::new_v4());
    let mut a = coordinator(&hub, session_a);
    let mut b = coordinator(&hub, session_b);
    let grid = GridConfig::default();

    let alice = Avatar::new(Uuid::new_v4(), session_a, "alice", ModelRef::new("m"));
    let bob = Avatar::new(Uuid::new_v4(), session_b, "bob", ModelRef::new("m"));
    let (alice_id, bob_id) = (alice.id, bob.id);
    a.upsert_local(alice);
    b.upsert_local(bob);
    a.allocate(alice_id, GridCell::new(3, 4)).await.unwrap();
    b.reconcile(&hub.snapshot()).await.unwrap();
    b.allocate(bob_id, GridCell::new(8, 8)).await.unwrap();
    let before = hub.snapshot();

    let err = b.move_to(bob_id, grid.to_world(GridCell::new(3, 4))).await.unwrap_err();
    match err {
        PlacementError::CellOccupied { cell, occupant } => {
            assert_eq!(cell, GridCell::new(3, 4));
            assert_eq!(occupant, alice_id);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(*hub.snapshot(), *before);

    // Bob cannot move Alice either
    let err = b.move_to(alice_id, grid.to_world(GridCell::new(0, 0))).await.unwrap_err();
    assert!(matches!(err, PlacementError::NotOwner { .. }));
}

#[tokio::test]
async fn test_departure_frees_cell() {
    let hub = LocalPresenceHub::new();
    let session = Uuid::new_v4();
    let mut client = coordinator(&hub, session);
    let avatar = Avatar::new(Uuid::new_v4(), session, "guest", ModelRef::new("m"));
    let id = avatar.id;
    client.upsert_local(avatar);
    client.allocate(id, GridCell::new(10, 10)).await.unwrap();

    let mut observer = coordinator(&hub, Uuid::new_v4());
    observer.reconcile(&hub.snapshot()).await.unwrap();
    assert!(!observer.index().is_free(GridCell::new(10, 10)));

    hub.signal_departure(id);
    observer.reconcile(&hub.snapshot()).await.unwrap();
    assert!(observer.index().is_free(GridCell::new(10, 10)));
}

/// Random interleavings of allocate, move and remove across several clients
/// with stale views always settle into one avatar per cell-centre.
#[tokio::test]
async fn test_random_interleavings_settle() {
    let grid = GridConfig::default();
    for seed in 0..8u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let hub = LocalPresenceHub::new();
        let sessions: Vec<Uuid> = (0..4).map(|i| Uuid::from_u128(1 + i)).collect();
        let mut clients: Vec<PlacementCoordinator> = sessions.iter().map(|s| coordinator(&hub, *s)).collect();
        let mut owned: Vec<Vec<Uuid>> = vec![Vec::new(); clients.len()];
        let mut next_id = 100u128;

        for step in 0..60u64 {
            let c = rng.random_range(0..clients.len());
            // Sometimes catch up with presence before acting
            if rng.random_bool(0.4) {
                let snapshot = hub.snapshot();
                clients[c].reconcile(&snapshot).await.unwrap();
            }
            match rng.random_range(0..10) {
                0..=5 => {
                    let avatar = Avatar::new(Uuid::from_u128(next_id), sessions[c], "guest", ModelRef::new("m"))
                        .with_created_at(step);
                    next_id += 1;
                    let id = avatar.id;
                    clients[c].upsert_local(avatar);
                    let preferred = GridCell::new(rng.random_range(8..13), rng.random_range(8..13));
                    clients[c].allocate(id, preferred).await.unwrap();
                    owned[c].push(id);
                }
                6..=7 if !owned[c].is_empty() => {
                    let id = owned[c][rng.random_range(0..owned[c].len())];
                    let target = grid.to_world(GridCell::new(rng.random_range(0..20), rng.random_range(0..20)));
                    match clients[c].move_to(id, target).await {
                        Ok(_) | Err(PlacementError::CellOccupied { .. }) => {}
                        Err(e) => panic!("unexpected move error {:?}", e),
                    }
                }
                8..=9 if !owned[c].is_empty() => {
                    let i = rng.random_range(0..owned[c].len());
                    let id = owned[c].swap_remove(i);
                    hub.remove(id).await.unwrap();
                    clients[c].forget(id);
                }
                _ => {}
            }
        }

        settle(&hub, &mut clients).await;
        let snapshot = hub.snapshot();
        assert_eq!(snapshot.len(), owned.iter().map(Vec::len).sum::<usize>());
        assert_settled(&grid, &snapshot);
    }
}
