//! live_fleet — runs the fleet engine against a simulated user.
//!
//! ```text
//! live_fleet [CONFIG.json|-] [SECONDS]
//!
//! FLEET_CACHE_DIR     cache location          (default output/live_fleet/cache)
//! FLEET_CACHE_BACKEND sqlite | file           (default sqlite)
//! FLEET_OUTPUT_DIR    CSV export location     (default output/live_fleet)
//! RUST_LOG            log filter              (default info)
//! ```
//!
//! Run it twice within an hour and the second run restores the population
//! from the cache instead of generating a new one.

mod sensor;

use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fleet_cache::{FileStore, KeyValueStore, SqliteStore};
use fleet_core::{DriverId, DriverStatus};
use fleet_location::LocationService;
use fleet_output::{CsvWriter, SnapshotExporter};
use fleet_sim::{FleetConfig, FleetEngineBuilder, Snapshot, SubscriberResult};
use fleet_viewport::{DEFAULT_CENTER, Viewport, initial_viewport, visible_drivers};

use sensor::SimulatedSensor;

// ── Constants ─────────────────────────────────────────────────────────────────

const DEFAULT_RUN_SECS:   u64  = 20;
const DEFAULT_CACHE_DIR:  &str = "output/live_fleet/cache";
const DEFAULT_OUTPUT_DIR: &str = "output/live_fleet";
const EXPORT_INTERVAL:    u64  = 1; // every tick

// ── Setup helpers ─────────────────────────────────────────────────────────────

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn env_path(var: &str, default: &str) -> PathBuf {
    env::var_os(var).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(default))
}

fn open_store(dir: &Path) -> Result<Arc<dyn KeyValueStore>> {
    let backend = env::var("FLEET_CACHE_BACKEND").unwrap_or_else(|_| "sqlite".into());
    let store: Arc<dyn KeyValueStore> = match backend.as_str() {
        "sqlite" => Arc::new(SqliteStore::new(dir)?),
        "file" => Arc::new(FileStore::new(dir)?),
        other => bail!("unknown FLEET_CACHE_BACKEND {other:?} (expected sqlite or file)"),
    };
    info!(backend = %backend, dir = %dir.display(), "cache_opened");
    Ok(store)
}

fn load_config(arg: Option<&String>) -> Result<FleetConfig> {
    match arg.map(String::as_str) {
        None | Some("-") => Ok(FleetConfig::default()),
        Some(path) => FleetConfig::from_json_path(Path::new(path))
            .with_context(|| format!("loading fleet config from {path}")),
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let config = load_config(args.first())?;
    let run_for = match args.get(1) {
        Some(s) => Duration::from_secs(s.parse().with_context(|| format!("bad duration {s:?}"))?),
        None => Duration::from_secs(DEFAULT_RUN_SECS),
    };

    println!("=== live_fleet ===");
    println!(
        "Drivers: {}  |  Regions: {}  |  Tick: {} ms  |  Run: {} s",
        config.driver_count,
        config.regions.len(),
        config.tick_interval_ms,
        run_for.as_secs()
    );
    println!();

    // 1. Storage shared by the engine and the location service.
    let store = open_store(&env_path("FLEET_CACHE_DIR", DEFAULT_CACHE_DIR))?;

    // 2. Where is the user?  Drives the first viewport.
    let sensor = Arc::new(SimulatedSensor::new(DEFAULT_CENTER, config.seed));
    let location = LocationService::new(sensor, Arc::clone(&store));
    if !location.request_permissions() {
        warn!("continuing_without_location_permission");
    }
    let here = location.current_position();
    let viewport = Arc::new(Mutex::new(initial_viewport(here.map(|p| p.point))));
    info!(
        located = here.is_some(),
        center = %viewport.lock().unwrap_or_else(PoisonError::into_inner).center,
        "viewport_initialised"
    );

    // Keep the map centred on the user as they move.
    let follow = Arc::clone(&viewport);
    let mut watch = match location.watch(move |p| {
        follow.lock().unwrap_or_else(PoisonError::into_inner).center = p.point;
    }) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "location_watch_unavailable");
            None
        }
    };
    if location.start_background_tracking().is_err() {
        info!("continuing_without_background_tracking");
    }

    // 3. Engine.
    let engine = FleetEngineBuilder::new(config, Arc::clone(&store)).build()?;
    match engine.cached_snapshot() {
        Ok(Some(record)) => info!(drivers = record.payload.len(), "last_known_fleet_available"),
        Ok(None) => info!("no_last_known_fleet"),
        Err(e) => warn!(error = %e, "last_known_fleet_unreadable"),
    }

    // 4. Subscribers: a "renderer" that filters to the viewport, and the CSV
    //    exporter.
    let view = Arc::clone(&viewport);
    let _renderer = engine.subscribe(move |s: &Snapshot| -> SubscriberResult {
        let vp: Viewport = *view.lock().unwrap_or_else(PoisonError::into_inner);
        let visible = visible_drivers(&s.drivers, Some(&vp));
        let active = visible.iter().filter(|d| d.status == DriverStatus::Active).count();
        info!(
            tick = s.tick,
            total = s.len(),
            visible = visible.len(),
            visible_active = active,
            "fleet_rendered"
        );
        Ok(())
    });

    let output_dir = env_path("FLEET_OUTPUT_DIR", DEFAULT_OUTPUT_DIR);
    let exporter = SnapshotExporter::new(CsvWriter::new(&output_dir)?, EXPORT_INTERVAL);
    let _export = engine.subscribe(exporter.clone());

    // 5. Run.
    let t0 = Instant::now();
    engine.connect();
    std::thread::sleep(run_for);
    engine.disconnect();
    let elapsed = t0.elapsed();

    if let Some(w) = watch.as_mut() {
        w.cancel();
    }
    if let Err(e) = location.stop_background_tracking() {
        warn!(error = %e, "background_tracking_not_stopped");
    }

    exporter.finish()?;
    if let Some(e) = exporter.take_error() {
        eprintln!("output error: {e}");
    }

    // 6. Summary.
    let snapshot = engine.snapshot();
    let counts = snapshot.status_counts();
    println!();
    println!(
        "Ran {:.1} s, {} ticks, {} generation(s)",
        elapsed.as_secs_f64(),
        snapshot.tick,
        engine.generation_count()
    );
    println!(
        "  active {}  |  idle {}  |  offline {}  |  unknown {}",
        counts.active, counts.idle, counts.offline, counts.unknown
    );
    println!("  exported {} tick(s) to {}", exporter.ticks_written(), output_dir.display());
    println!();

    println!("{:<8} {:<12} {:<8} {:>6} {:>8}", "Driver", "Region", "Status", "km/h", "History");
    println!("{}", "-".repeat(46));
    for id in (0..5).map(DriverId) {
        let Some(d) = engine.get_by_id(id) else { continue };
        println!(
            "{:<8} {:<12} {:<8} {:>6} {:>8}",
            d.id.0,
            d.region.as_deref().unwrap_or("-"),
            d.status.as_str(),
            d.speed_kmh,
            d.history.len(),
        );
    }

    Ok(())
}
