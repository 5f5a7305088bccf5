//! Service startup
//!
//! ```text
//! Phase 1: Configure   logging, config
//! Phase 2: Connect     record store (+ migrations), blob store
//! Phase 3: Workers     job queue, processors, redelivery of pending uploads
//! Phase 4: Run         HTTP server until shutdown
//! ```

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use crypto_core::JwtService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_actix_web::TracingLogger;

use crate::app_state::{AppState, Repositories};
use crate::config::{Config, StoreBackend};
use crate::db::{run_migrations, VideoRepository};
use crate::handlers;
use crate::routes::configure_routes;
use crate::services::job_queue::requeue_pending;
use crate::services::{
    create_job_queue, spawn_workers, BrandingAssets, FfmpegTranscoder, FfprobeProber, JobQueue,
    VideoProcessor,
};
use crate::storage::local::LocalBlobStore;
use crate::storage::BlobStore;

const DEFAULT_LOG_FILTER: &str = "info,actix_web=info,sqlx=warn";
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// PHASE 1: Configuration & Logging
// ============================================================================

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging(json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

// ============================================================================
// PHASE 2: Stores
// ============================================================================

pub async fn setup_repositories(config: &Config) -> anyhow::Result<Repositories> {
    match config.store_backend {
        StoreBackend::Postgres => {
            config.database.log_config();
            let pool = db_pool::create_pool(&config.database)
                .await
                .context("Failed to create database pool")?;
            run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            info!("Database migrations applied");
            Ok(Repositories::postgres(pool))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory record store; data is lost on restart");
            Ok(Repositories::memory())
        }
    }
}

pub async fn setup_blob_store(config: &Config) -> anyhow::Result<Arc<LocalBlobStore>> {
    let store = LocalBlobStore::open(&config.storage.root)
        .await
        .with_context(|| {
            format!(
                "Failed to prepare storage directory {}",
                config.storage.root.display()
            )
        })?;
    info!(root = %store.root().display(), "Blob store ready");
    Ok(Arc::new(store))
}

// ============================================================================
// PHASE 3: Background processing
// ============================================================================

pub fn build_processor(
    config: &Config,
    repos: &Repositories,
    blobs: Arc<dyn BlobStore>,
) -> VideoProcessor {
    let prober = FfprobeProber::new(
        config.media.ffprobe_path.clone(),
        Duration::from_secs(config.media.probe_timeout_secs),
    );
    let transcoder = FfmpegTranscoder::new(
        config.media.ffmpeg_path.clone(),
        BrandingAssets {
            intro_image: config.media.intro_image.clone(),
            outro_image: config.media.outro_image.clone(),
            watermark_image: config.media.watermark_image.clone(),
        },
    );

    VideoProcessor::new(
        repos.videos.clone(),
        blobs,
        Arc::new(prober),
        Arc::new(transcoder),
    )
}

/// Redeliver leftover `uploaded` videos without holding up the HTTP server.
fn spawn_redelivery(videos: Arc<dyn VideoRepository>, queue: Arc<dyn JobQueue>) {
    tokio::spawn(async move {
        if let Err(e) = requeue_pending(videos.as_ref(), queue.as_ref()).await {
            error!(error = %e, "Failed to redeliver pending uploads");
        }
    });
}

async fn drain_workers(workers: Vec<JoinHandle<()>>) {
    let joined = tokio::time::timeout(WORKER_DRAIN_TIMEOUT, futures::future::join_all(workers));
    match joined.await {
        Ok(results) => {
            for result in results {
                if let Err(e) = result {
                    error!(error = %e, "Worker task ended abnormally");
                }
            }
            info!("All workers stopped");
        }
        Err(_) => warn!(
            timeout_secs = WORKER_DRAIN_TIMEOUT.as_secs(),
            "Workers still busy at shutdown; pending videos are redelivered on next start"
        ),
    }
}

// ============================================================================
// PHASE 4: Run
// ============================================================================

pub async fn run(config: Config) -> anyhow::Result<()> {
    info!(env = %config.app.env, "Starting showcase-service");

    let repos = setup_repositories(&config).await?;
    let blobs: Arc<dyn BlobStore> = setup_blob_store(&config).await?;

    let jwt = JwtService::new(
        config.auth.jwt_secret.as_bytes(),
        chrono::Duration::minutes(config.auth.access_token_expire_minutes),
    )
    .context("Invalid JWT configuration")?;

    let (queue, receiver) = create_job_queue(config.worker.queue_capacity);
    let queue: Arc<dyn JobQueue> = Arc::new(queue);

    let processor = build_processor(&config, &repos, blobs.clone());
    let workers = spawn_workers(processor, receiver, config.worker.worker_count);
    info!(count = config.worker.worker_count, "Video workers started");

    spawn_redelivery(repos.videos.clone(), queue.clone());

    let state = AppState::new(
        &repos,
        blobs,
        queue,
        Arc::new(jwt),
        config.storage.max_file_size_bytes(),
    );
    let bind = (config.app.host.clone(), config.app.port);

    info!(host = %bind.0, port = bind.1, "HTTP server listening");
    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(TracingLogger::default())
            .configure(|cfg| configure_routes(cfg, &state))
            .default_service(web::to(handlers::not_found))
    })
    .bind(bind)
    .context("Failed to bind HTTP listener")?
    .run()
    .await
    .context("HTTP server error")?;

    info!("HTTP server stopped, draining workers");
    drain_workers(workers).await;
    Ok(())
}
