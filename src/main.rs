use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use video_job_gateway::{
    app_state::AppState,
    config::AppConfig,
    routes,
    services::{
        correlation::CorrelationStore,
        ingestion::ResponseIngestor,
        queue::{JobProducer, RedisBroker, RedisResultSource},
        retention,
        storage::{ObjectStore, S3ObjectStore},
    },
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing video-job-gateway");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe_metrics();

    // Initialize object storage client
    tracing::info!(bucket = %config.s3_bucket, "Initializing object storage client");
    let storage: Arc<dyn ObjectStore> = Arc::new(
        S3ObjectStore::new(
            &config.s3_bucket,
            &config.s3_endpoint,
            &config.s3_region,
            &config.s3_access_key,
            &config.s3_secret_key,
            config.s3_path_style,
        )
        .expect("Failed to initialize object storage client"),
    );

    // Initialize Redis job producer
    tracing::info!(topic = %config.job_topic, "Connecting to Redis job stream");
    let broker = RedisBroker::new(&config.redis_url, &config.job_consumer_group)
        .expect("Failed to initialize Redis broker");
    let producer = JobProducer::new(Arc::new(broker), config.job_topic.clone());

    // Initialize Redis result consumer
    tracing::info!(
        topic = %config.result_topic,
        group = %config.result_consumer_group,
        consumer = %config.consumer_name,
        "Connecting to Redis result stream"
    );
    let results = RedisResultSource::connect(
        &config.redis_url,
        &config.result_topic,
        &config.result_consumer_group,
        &config.consumer_name,
        config.result_batch_size,
        config.result_block(),
    )
    .await
    .expect("Failed to initialize result consumer");

    let correlations = Arc::new(CorrelationStore::new());
    let state = AppState::new(
        correlations.clone(),
        storage,
        producer,
        config.max_image_files,
    );

    let shutdown = CancellationToken::new();

    // Result ingestion loop
    let ingestor = ResponseIngestor::new(correlations.clone());
    let ingestion_shutdown = shutdown.clone();
    let ingestion = tokio::spawn(async move {
        ingestor.run(&results, ingestion_shutdown).await;
    });

    // Retention sweeper
    let sweeper = tokio::spawn(retention::run_sweeper(
        correlations,
        config.result_retention(),
        config.eviction_interval(),
        shutdown.clone(),
    ));

    let app = routes::router(state, prometheus_handle, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .expect("Server error");

    shutdown.cancel();
    if let Err(e) = ingestion.await {
        tracing::error!(error = %e, "Result ingestion task failed");
    }
    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "Retention sweeper task failed");
    }

    tracing::info!("Shutdown complete");
}

/// Resolve on Ctrl-C or SIGTERM, cancelling background work.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
