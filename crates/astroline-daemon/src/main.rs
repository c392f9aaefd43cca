use std::sync::Arc;

use rusqlite::Connection;
use tracing::info;

use astroline_core::{AstrolineConfig, TimeZoneOffset};
use astroline_delivery::DeliveryExecutor;
use astroline_fetch::{
    GlobalmskAdapter, HarvestCoordinator, HoroscopeClient, RetryPolicy, UpstreamEndpoints,
};
use astroline_scheduler::{DeliveryEngine, FiredJob, JobRegistry};
use astroline_store::ContentStore;
use astroline_subscribers::SubscriberManager;
use astroline_telegram::TelegramTransport;

mod cadence;
mod sync;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "astroline=info".into()),
        )
        .init();

    // load config: explicit path > ASTROLINE_CONFIG env > ~/.astroline/astroline.toml
    let config_path = std::env::var("ASTROLINE_CONFIG").ok();
    let config = AstrolineConfig::load(config_path.as_deref())?;
    if config.telegram.bot_token.is_empty() {
        anyhow::bail!("telegram.bot_token is not configured");
    }

    // initialize SQLite database — single file for all subsystems
    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = Connection::open(&db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    // run all schema migrations (idempotent)
    astroline_store::db::init_db(&db)?;
    astroline_subscribers::db::init_db(&db)?;
    astroline_scheduler::db::init_db(&db)?;
    info!("database migrations complete");

    // build subsystems — each gets its own connection for thread safety
    let store = Arc::new(ContentStore::new(Connection::open(&db_path)?)?);
    let subscribers = Arc::new(SubscriberManager::new(Connection::open(&db_path)?)?);
    let registry = JobRegistry::new(Connection::open(&db_path)?)?;

    // The preference flow writes profiles through the subscriber
    // collaborator; reconcile the durable job table with them on boot.
    sync::sync_jobs(&registry, &subscribers);

    // Fired-job channel: DeliveryEngine → DeliveryExecutor task
    let (fired_tx, fired_rx) = tokio::sync::mpsc::channel::<FiredJob>(256);
    let engine = DeliveryEngine::new(Connection::open(&db_path)?, fired_tx)?;

    let transport = Arc::new(TelegramTransport::new(&config.telegram.bot_token));
    let executor = Arc::new(DeliveryExecutor::new(
        Arc::clone(&subscribers),
        Arc::clone(&store),
        transport,
    ));

    // upstream client + harvest coordinator
    let client = HoroscopeClient::new(
        UpstreamEndpoints::from_config(&config.upstream),
        Box::new(GlobalmskAdapter),
        RetryPolicy::from(&config.retry),
    )?;
    let reference = TimeZoneOffset::new(config.upstream.reference_utc_offset)?;
    let coordinator = Arc::new(HarvestCoordinator::new(
        Arc::new(client),
        Arc::clone(&store),
        &config.harvest,
        reference,
    ));

    // spawn the background loops
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(engine.run(shutdown_rx.clone()));
    tokio::spawn(executor.run(fired_rx));
    tokio::spawn(cadence::run_harvest_cadence(
        coordinator,
        config.harvest.utc_hour,
        shutdown_rx,
    ));

    info!("astroline daemon running — press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    // signal the loops to stop
    let _ = shutdown_tx.send(true);
    info!("astroline daemon stopped");
    Ok(())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
