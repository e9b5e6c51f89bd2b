use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_pipeline::config::{AppConfig, MessagingBackend, StorageBackend};
use order_pipeline::domain::order::{OrderQuery, OrderService, OrderValidator};
use order_pipeline::messaging::{EventPublisher, InMemoryPublisher, RedpandaPublisher};
use order_pipeline::metrics::{self, Metrics};
use order_pipeline::models::{Money, Order, OrderItem};
use order_pipeline::storage::memory::{MemoryStore, MemoryUnitOfWorkFactory};
use order_pipeline::storage::postgres::{self, PgUnitOfWorkFactory};
use order_pipeline::storage::UnitOfWorkFactory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_pipeline=debug")),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        environment = %config.environment,
        storage = ?config.storage_backend,
        messaging = ?config.messaging_backend,
        "Starting order pipeline"
    );

    // === 1. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    if let Some(port) = config.metrics_port {
        // actix-web runs its own single-threaded runtime
        let registry = Arc::new(metrics.registry().clone());
        std::thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to start metrics runtime");
                    return;
                }
            };
            runtime.block_on(async {
                if let Err(e) = metrics::start_metrics_server(registry, port).await {
                    tracing::error!(error = %e, "Metrics server error");
                }
            });
        });
    }

    // === 2. Storage + messaging backends ===
    let validator = OrderValidator::new(config.validation.clone());
    let topic = config.kafka.order_created_topic.clone();

    match config.storage_backend {
        StorageBackend::Postgres => {
            let pool = postgres::connect(&config.db).await?;
            postgres::ensure_schema(&pool, config.db.statement_timeout).await?;
            let factory = PgUnitOfWorkFactory::new(pool, config.db.statement_timeout);
            with_publisher(&config, factory, validator, topic, metrics).await?;
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; nothing survives a restart");
            let factory = MemoryUnitOfWorkFactory::new(MemoryStore::new());
            with_publisher(&config, factory, validator, topic, metrics).await?;
        }
    }

    // === 3. Keep serving /metrics until interrupted ===
    if let Some(port) = config.metrics_port {
        tracing::info!(port, "Metrics server running; press Ctrl+C to stop");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutting down");
    }
    Ok(())
}

async fn with_publisher<F>(
    config: &AppConfig,
    factory: F,
    validator: OrderValidator,
    topic: String,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()>
where
    F: UnitOfWorkFactory,
{
    match config.messaging_backend {
        MessagingBackend::Kafka => {
            let publisher = RedpandaPublisher::new(&config.kafka)?.with_metrics(metrics.clone());
            let service = OrderService::new(factory, publisher, validator, topic).with_metrics(metrics);
            run_demo(&service).await
        }
        MessagingBackend::Memory => {
            let publisher = InMemoryPublisher::new();
            let service = OrderService::new(factory, publisher.clone(), validator, topic).with_metrics(metrics);
            run_demo(&service).await?;
            tracing::info!(recorded = publisher.messages().await.len(), "In-memory publisher summary");
            Ok(())
        }
    }
}

/// Create a small batch, then read it back through both query paths.
async fn run_demo<F, P>(service: &OrderService<F, P>) -> anyhow::Result<()>
where
    F: UnitOfWorkFactory,
    P: EventPublisher,
{
    let orders = vec![
        Order::new(
            1001,
            "10 Downing Street, London",
            Money::new(2 * 1299 + 499, "USD"),
            vec![
                OrderItem::new(501, 2, "Notebook", "https://shop.example.com/p/501", Money::new(1299, "USD")),
                OrderItem::new(502, 1, "Pen", "https://shop.example.com/p/502", Money::new(499, "USD")),
            ],
        ),
        Order::new(
            1002,
            "1600 Pennsylvania Avenue, Washington",
            Money::new(3 * 250, "EUR"),
            vec![OrderItem::new(503, 3, "Sticker pack", "https://shop.example.com/p/503", Money::new(250, "EUR"))],
        ),
    ];

    let created = match service.batch_create_orders(orders).await {
        Ok(created) => created,
        Err(e) => {
            let body = serde_json::to_string(&e.to_body())?;
            tracing::error!(error = %body, "Batch creation failed");
            return Err(e.into());
        }
    };

    let ids: Vec<i64> = created.iter().filter_map(|o| o.id).collect();
    tracing::info!(?ids, "Created orders");

    let found = service
        .query_orders(&OrderQuery {
            ids: ids.clone(),
            include_items: true,
            ..OrderQuery::default()
        })
        .await?;
    for order in &found {
        tracing::info!(order_id = ?order.id, items = order.items.len(), "Queried order");
    }

    if let Some(first) = ids.first() {
        let order = service.get_order(*first).await?;
        tracing::info!(order = %serde_json::to_string(&order)?, "Fetched order");
    }

    tracing::info!("Demo complete");
    Ok(())
}
