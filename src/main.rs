use eventplate::api;
use eventplate::config::{AppConfig, IdentityConfig};
use eventplate::services::{IdentityProvider, RemoteIdentityProvider, StaticIdentityProvider};

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventplate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting eventplate v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env()?;

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    info!("Database connected");

    let identity: Arc<dyn IdentityProvider> = match &config.identity {
        IdentityConfig::Remote {
            userinfo_url,
            timeout,
        } => Arc::new(RemoteIdentityProvider::new(userinfo_url.clone(), *timeout)?),
        IdentityConfig::Static { tokens } => {
            let provider = StaticIdentityProvider::parse(tokens);
            if provider.is_empty() {
                anyhow::bail!("AUTH_STATIC_TOKENS contains no token=user pairs");
            }
            warn!("Using static token table for authentication");
            Arc::new(provider)
        }
    };

    let app = api::build_router(pool, identity)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.bind_addr();
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
