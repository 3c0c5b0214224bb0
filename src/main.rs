//! loadsim - Synthetic Workload Generator with Hexagonal Architecture
//!
//! This is the composition root that wires together all the components.

use loadsim::adapters::inbound::{ApiServer, ApiState};
use loadsim::adapters::outbound::{HttpTransport, InProcessTransport, PrometheusMetricsSink};
use loadsim::application::RequestProcessor;
use loadsim::config::{load_config, ClientTransport};
use loadsim::domain::ports::{MetricsSink, RequestTransport};
use loadsim::domain::services::SpikeScheduler;
use loadsim::infrastructure::{shutdown_signal, LoadGenerator, ResourcePool, ShutdownController};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting loadsim listen={} pool_capacity={} error_rate={} client={} rps={}",
        cfg.listen_addr,
        cfg.pool_capacity,
        cfg.error_rate,
        cfg.client_enabled,
        cfg.client_rps
    );

    // ===== COMPOSITION ROOT =====

    // 1. Outbound adapters and shared resources
    let metrics = Arc::new(PrometheusMetricsSink::new());
    let sink: Arc<dyn MetricsSink> = metrics.clone();
    let pool = Arc::new(ResourcePool::new(cfg.pool_config(), sink.clone()));
    let scheduler = Arc::new(SpikeScheduler::new(cfg.spike_config()));

    // 2. Application service
    let processor = Arc::new(RequestProcessor::new(
        scheduler,
        pool.clone(),
        sink,
        cfg.processor_config(),
    ));

    // 3. Inbound adapter; bind before the generator starts sending
    let shutdown = ShutdownController::new();
    let server = ApiServer::new(
        cfg.listen_addr.clone(),
        ApiState::new(processor.clone(), metrics, shutdown.clone()),
    );
    let listener = server.bind().await?;

    tokio::spawn(shutdown_signal(shutdown.clone()));

    // 4. Load generator
    let generator = if cfg.client_enabled {
        let transport: Arc<dyn RequestTransport> = match cfg.client_transport {
            ClientTransport::Http => {
                let target = cfg.target_url();
                tracing::info!("load generator targeting {}", target);
                Arc::new(HttpTransport::new(target, cfg.request_timeout())?)
            }
            ClientTransport::InProcess => {
                tracing::info!("load generator calling the processor in-process");
                Arc::new(InProcessTransport::new(processor))
            }
        };
        let generator = LoadGenerator::with_constant_rate(transport, cfg.client_rps);
        let shutdown = shutdown.clone();
        Some(tokio::spawn(async move { generator.run(shutdown).await }))
    } else {
        None
    };

    // 5. Serve until shutdown
    let served = server.serve(listener).await;
    if let Err(e) = &served {
        tracing::error!("server error: {:?}", e);
        shutdown.shutdown();
    }

    if let Some(handle) = generator {
        if let Err(e) = handle.await {
            tracing::error!("load generator task failed: {}", e);
        }
    }

    if shutdown.wait_for_drain(cfg.drain_timeout()).await {
        tracing::info!("all requests drained");
    }
    pool.close();

    served
}
