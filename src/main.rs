use axum::{
    Router as HttpRouter,
    extract::Extension,
    routing::{get, post},
};
use clap::Parser;
use clustered_store::cluster::config::{EnsembleConfig, NodeArgs};
use clustered_store::cluster::types::{Cluster, NodeId};
use clustered_store::communication::handlers::{
    handle_command, handle_internal_command, handle_pause, handle_resume, handle_stats,
};
use clustered_store::communication::local::LocalProcessor;
use clustered_store::communication::node::Node;
use clustered_store::communication::protocol::*;
use clustered_store::communication::remote::HttpTransport;
use clustered_store::executor::StagedExecutor;
use clustered_store::router::{Router, RoutingTable};
use clustered_store::storage::backup::BackupManager;
use clustered_store::storage::memory::MemoryStore;
use clustered_store::storage::operators::Operators;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = NodeArgs::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting node {} in cluster {}", args.name, args.cluster);

    // 1. Ensemble:
    let ensemble = EnsembleConfig::load(&args.ensemble)?;

    // 2. Local storage and executor:
    let operators = Operators::with_defaults();
    let store = MemoryStore::new(operators.clone(), BackupManager::new(&args.backup_dir));
    let executor = StagedExecutor::start(args.workers);
    let local = LocalProcessor::new(executor.clone(), store.clone());

    // 3. Routing:
    let local_node = Node::new(
        NodeId::new(&args.name),
        args.bind,
        Cluster::new(&args.cluster, true),
        local.clone(),
    );
    let transport = HttpTransport::new(HttpTransport::DEFAULT_TIMEOUT);
    let table = RoutingTable::from_ensemble(&ensemble, &local_node, transport);
    let router = Router::new(local_node, table, operators);

    if let Err(e) = router.route_to_local_node() {
        tracing::warn!(
            "Node {} is not listed in cluster {}: {}",
            args.name,
            args.cluster,
            e
        );
    }

    // 4. HTTP Router:
    let app = HttpRouter::new()
        .route(ENDPOINT_COMMAND, post(handle_command))
        .route(ENDPOINT_INTERNAL_COMMAND, post(handle_internal_command))
        .route(ENDPOINT_EXECUTOR_PAUSE, post(handle_pause))
        .route(ENDPOINT_EXECUTOR_RESUME, post(handle_resume))
        .route(ENDPOINT_EXECUTOR_STATS, get(handle_stats))
        .layer(Extension(router))
        .layer(Extension(local));

    // 5. Start HTTP server:
    tracing::info!("HTTP server listening on {}", args.bind);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 6. Drain the executor: running commands finish, queued ones fail.
    executor.shutdown().await;
    tracing::info!(
        "Node {} stopped ({} buckets, {} entries in memory)",
        args.name,
        store.bucket_count(),
        store.entry_count()
    );

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
