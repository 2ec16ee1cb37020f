use anyhow::Result;
use axum::http::{HeaderName, HeaderValue, Method};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use core_kernel::{config::Config, database::Database, kernel::JudiciaKernel, router, KernelState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "core_kernel=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    tracing::info!("connecting to database");
    let db = Database::new(&config.database_url).await?;
    db.migrate().await?;
    tracing::info!("database connected and migrations applied");

    let kernel = Arc::new(JudiciaKernel::new(config.clone(), db).await?);
    kernel.spawn_evaluation_tasks();

    let kernel_state = KernelState {
        kernel,
        config: config.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:5173".parse::<HeaderValue>()?)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([
            "content-type".parse::<HeaderName>()?,
            "authorization".parse::<HeaderName>()?,
            "x-requested-with".parse::<HeaderName>()?,
        ])
        .allow_credentials(true);

    let app = router::build_router(kernel_state.clone())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(kernel_state);

    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    tracing::info!(address = %config.server_address, "core kernel listening");

    axum::serve(listener, app).await?;

    Ok(())
}