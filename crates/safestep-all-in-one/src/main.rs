mod config;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use config::ServiceConfig;
use safestep_domain::device_service::DeviceService;
use safestep_domain::device_synchronizer::DeviceSynchronizer;
use safestep_domain::geofence_synchronizer::GeofenceSynchronizer;
use safestep_domain::store::{DeviceStore, GeofenceStore};
use safestep_ingest::IngestApi;
use safestep_store::MemoryStore;
use telemetry::init_telemetry;

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    init_telemetry(&config.log_level);

    info!(
        ingest_host = %config.ingest_host,
        ingest_port = config.ingest_port,
        owner_id = %config.owner_id,
        "Starting safestep-all-in-one"
    );

    if let Err(e) = run(config).await {
        error!(reason = %e, "service exited with error");
        std::process::exit(1);
    }
    info!("shutdown complete");
}

async fn run(config: ServiceConfig) -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let device_service = Arc::new(DeviceService::new(Arc::new(store.clone())));

    let shutdown = CancellationToken::new();
    let mut tasks = JoinSet::new();

    // Standing synchronizers for the configured owner; the dashboard reads
    // their handles.
    let geofence_sync = GeofenceSynchronizer::new();
    let geofence_handle = geofence_sync.handle();
    let geofence_sub = store.subscribe_geofences(&config.owner_id).await?;
    let ctx = shutdown.clone();
    tasks.spawn(async move {
        geofence_sync.run(geofence_sub, ctx).await;
        Ok::<(), anyhow::Error>(())
    });

    let device_sync = DeviceSynchronizer::new();
    let device_handle = device_sync.handle();
    let device_sub = store.subscribe_devices(&config.owner_id).await?;
    let ctx = shutdown.clone();
    tasks.spawn(async move {
        device_sync.run(device_sub, ctx).await;
        Ok::<(), anyhow::Error>(())
    });

    // Periodic status line so operators can see the sync state.
    let status_interval = Duration::from_secs(config.status_interval_secs.max(1));
    let ctx = shutdown.clone();
    tasks.spawn(async move {
        loop {
            tokio::select! {
                _ = ctx.cancelled() => break,
                _ = tokio::time::sleep(status_interval) => {
                    info!(
                        geofences = geofence_handle.current().len(),
                        devices = device_handle.current().len(),
                        geofence_error = geofence_handle.error().is_some(),
                        device_error = device_handle.error().is_some(),
                        "synchronizer status"
                    );
                }
            }
        }
        Ok(())
    });

    let ingest = IngestApi::new(device_service, config.ingest_host.clone(), config.ingest_port);
    let ctx = shutdown.clone();
    tasks.spawn(async move { ingest.serve(ctx).await });

    tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
        Some(result) = tasks.join_next() => {
            match result {
                Ok(Ok(())) => info!("a task finished, shutting down"),
                Ok(Err(e)) => error!(reason = %e, "a task failed, shutting down"),
                Err(e) => error!(reason = %e, "a task panicked, shutting down"),
            }
        }
    }

    shutdown.cancel();
    while let Some(result) = tasks.join_next().await {
        if let Ok(Err(e)) = result {
            error!(reason = %e, "task error during shutdown");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
