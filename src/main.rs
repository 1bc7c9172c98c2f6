use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audioguide_backend::controllers::{audio::AudioController, health::HealthController};
use audioguide_backend::domain::pipeline::{
    BatchConfig, BatchExecutor, LogProgress, MetadataService, UploadService, AudioPipelineService,
};
use audioguide_backend::domain::synthesis::{
    CircuitBreaker, CircuitBreakerConfig, HealthProbe, RetryPolicy, SynthesisClient,
};
use audioguide_backend::infrastructure::config::{Config, LogFormat};
use audioguide_backend::infrastructure::http::start_http_server;
use audioguide_backend::infrastructure::repositories::{
    HttpBlobRepository, HttpRecordRepository, HttpSlugRepository, HttpSynthesisRepository,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting Audioguide Backend on {}:{}",
        config.host,
        config.port
    );

    let pipeline_config = config.pipeline.clone();

    // Shared HTTP client; the per-attempt synthesis timeout is enforced by
    // the synthesis client, this is an outer safety net
    let http_client = reqwest::Client::builder()
        .timeout(pipeline_config.upload_timeout() + Duration::from_secs(30))
        .build()?;

    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Instantiate repositories (inject HTTP client + endpoints)
    tracing::info!("Instantiating repositories...");
    let synthesis_repo = Arc::new(HttpSynthesisRepository::new(
        http_client.clone(),
        config.synthesis_url.clone(),
        config.synthesis_api_key.clone(),
    ));
    let blob_repo = Arc::new(HttpBlobRepository::new(
        http_client.clone(),
        config.storage_url.clone(),
        config.storage_bucket.clone(),
        config.storage_api_key.clone(),
    ));
    let record_repo = Arc::new(HttpRecordRepository::new(
        http_client.clone(),
        config.records_url.clone(),
        config.records_api_key.clone(),
    ));
    let slug_repo = Arc::new(HttpSlugRepository::new(
        http_client.clone(),
        config.naming_url.clone(),
        config.naming_api_key.clone(),
    ));

    // 2. Instantiate the guarded synthesis path
    tracing::info!("Instantiating synthesis services...");
    let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
        failure_threshold: pipeline_config.breaker_failure_threshold,
        reset_timeout: pipeline_config.breaker_reset_timeout(),
        half_open_max_attempts: 1,
    }));
    let synthesis_client = Arc::new(SynthesisClient::new(
        synthesis_repo.clone(),
        breaker,
        RetryPolicy::new(pipeline_config.max_retries),
        pipeline_config.synthesis_timeout(),
    ));
    let health_probe = Arc::new(HealthProbe::new(
        synthesis_repo,
        pipeline_config.health_probe_timeout(),
        pipeline_config.health_cache_validity(),
    ));

    // 3. Instantiate pipeline services
    tracing::info!("Instantiating pipeline services...");
    let uploader = Arc::new(UploadService::new(
        blob_repo,
        pipeline_config.upload_timeout(),
    ));
    let executor = Arc::new(BatchExecutor::new(
        synthesis_client,
        uploader,
        Arc::new(LogProgress),
        BatchConfig {
            max_concurrency: pipeline_config.max_concurrency,
            chunk_size: pipeline_config.chunk_size,
            worker_stagger: pipeline_config.worker_stagger(),
            chunk_cooldown: pipeline_config.chunk_cooldown(),
            failure_rate_threshold: 0.1,
        },
    ));
    let metadata = Arc::new(MetadataService::new(
        record_repo,
        config.records_table.clone(),
        pipeline_config.record_batch_size,
        pipeline_config.record_batch_delay(),
    ));
    let pipeline = Arc::new(AudioPipelineService::new(
        health_probe.clone(),
        slug_repo,
        executor,
        metadata,
    ));

    // 4. Instantiate controllers (inject services)
    tracing::info!("Instantiating controllers...");
    let health_controller = Arc::new(HealthController::new(health_probe));
    let audio_controller = Arc::new(AudioController::new(pipeline));

    // Start HTTP server with all routes
    start_http_server(config, health_controller, audio_controller).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "audioguide_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "audioguide_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
