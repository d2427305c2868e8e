use anyhow::Context;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;
use venue_rust::assets::source::mannequin;
use venue_rust::assets::{AssetSource, DirectoryAssetSource, MemoryAssetSource, ModelNormalizer};
use venue_rust::utils::logging::{init_logging, log_system_info};
use venue_rust::world::{GridCell, ModelRef, OccupancyIndex};
use venue_rust::{load_layered, LocalPresenceHub, VenueClient, VenueEvent};

const MANNEQUIN: &str = "mannequin";
const DEFAULT_VISITORS: usize = 6;
const MAX_SETTLE_ROUNDS: usize = 20;
const FRAME_DT: f32 = 1.0 / 60.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let visitors = match args.next() {
        Some(n) => n.parse::<usize>().context("visitor count must be a number")?,
        None => DEFAULT_VISITORS,
    };

    let settings = load_layered(config_path.as_deref()).context("failed to load settings")?;
    init_logging(settings.logging.log_file.as_deref())?;
    log_system_info();

    let grid = settings.grid_config();
    info!(
        "🏟️ Venue floor {}x{} ({} cells, edge {}), {} visitors",
        grid.grid_size,
        grid.grid_size,
        grid.cell_count(),
        grid.cell_edge,
        visitors
    );

    let source: Arc<dyn AssetSource> = match &settings.assets.root {
        Some(root) => Arc::new(DirectoryAssetSource::new(root)),
        None => Arc::new(MemoryAssetSource::new().with_model(mannequin(MANNEQUIN, 180.0))),
    };
    let normalizer = Arc::new(ModelNormalizer::new(source, settings.model.clone()));
    let hub = LocalPresenceHub::new();

    let mut clients = Vec::with_capacity(visitors);
    for _ in 0..visitors {
        clients.push(
            VenueClient::connect(Uuid::new_v4(), settings.clone(), Arc::new(hub.clone()), Arc::clone(&normalizer))
                .await?,
        );
    }

    // Everyone creates before anyone reads presence, so most of them collide
    let center = grid.center_cell();
    let mut rng = rand::rng();
    for (i, client) in clients.iter_mut().enumerate() {
        let preferred = if rng.random_bool(0.7) {
            center
        } else {
            GridCell::new(center.col + rng.random_range(-2..=2), center.row + rng.random_range(-2..=2))
        };
        let (id, outcome) = client
            .create_avatar(format!("visitor-{}", i), ModelRef::new(MANNEQUIN), Some(preferred))
            .await?;
        info!("🧍 visitor-{} ({}) asked for {}, got {}", i, id, preferred, outcome.cell());
    }

    let mut settled = false;
    for round in 0..MAX_SETTLE_ROUNDS {
        let mut resolutions = 0;
        for client in clients.iter_mut() {
            for event in client.sync().await? {
                if event.is_degraded() {
                    warn!("⚠️ {:?}", event);
                }
                if matches!(event, VenueEvent::Resolved(_)) {
                    resolutions += 1;
                }
            }
        }
        info!("🔁 Settle round {}: {} resolutions", round, resolutions);
        if resolutions == 0 {
            settled = true;
            break;
        }
    }
    if !settled {
        warn!("⚠️ Floor did not settle within {} rounds", MAX_SETTLE_ROUNDS);
    }

    // Give model loads a moment, then run a few seconds of frames
    tokio::time::sleep(Duration::from_millis(50)).await;
    for frame in 0..180 {
        if frame == 60 {
            for client in clients.iter_mut() {
                client.set_playing(true);
            }
        }
        for client in clients.iter_mut() {
            for event in client.tick(FRAME_DT) {
                info!("🎞️ {:?}", event);
            }
        }
    }

    if let Some(client) = clients.first() {
        for id in client.owned_avatars() {
            if let Some(view) = client.view(id) {
                info!("🎞️ {} animating as {}", id, view.animation().state());
            }
        }
    }

    let snapshot = hub.snapshot();
    let index = OccupancyIndex::build(grid, snapshot.iter());
    for (cell, avatar_id) in index.iter() {
        info!("📍 {} -> {}", cell, avatar_id);
    }
    info!(
        "🏁 {} avatars on {} cells, {} conflicts",
        snapshot.len(),
        index.occupied_count(),
        index.conflicts().len()
    );

    drop(clients);
    info!("📡 Hub stats: {:?}", hub.stats().await);
    info!("📋 Model cache: {:?}", normalizer.stats().await);
    Ok(())
}
