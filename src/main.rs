//! Hivemind server entry point.

use clap::Parser;
use hivemind::{
    analysis::{AnalysisScheduler, QueryExpander},
    api::create_router,
    config::Config,
    providers::{configured_providers, expansion_client},
    rate_limit::RateLimiter,
    store::{AnalysisStore, LibsqlStore},
    AppState,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hivemind-server")]
#[command(author, version, about = "Multi-provider AI topic analysis server")]
struct Cli {
    /// Bind address (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database path (overrides DATABASE_PATH; in-memory when unset)
    #[arg(long)]
    database_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hivemind=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env()?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(path) = cli.database_path {
        config.database.path = Some(path);
    }
    let config = Arc::new(config);

    let store: Arc<dyn AnalysisStore> = match &config.database.path {
        Some(path) => {
            tracing::info!(path = %path, "opening analysis database");
            Arc::new(LibsqlStore::new_file(path).await?)
        }
        None => {
            tracing::warn!("DATABASE_PATH not set, analyses will not survive restarts");
            Arc::new(LibsqlStore::new_memory().await?)
        }
    };

    let providers = configured_providers(&config.providers);
    if providers.is_empty() {
        tracing::warn!("no provider API keys configured, analysis requests will be rejected");
    } else {
        let ids: Vec<String> = providers.iter().map(|p| p.id().to_string()).collect();
        tracing::info!(providers = ?ids, "providers enabled");
    }

    let expander = QueryExpander::new(expansion_client(&config.providers));
    let scheduler = Arc::new(AnalysisScheduler::new(
        providers,
        expander,
        store.clone(),
        config.analysis.call_timeout(),
    ));

    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limit.max_requests,
        config.rate_limit.window(),
        config.rate_limit.sweep_interval(),
    ));

    let state = AppState {
        config: config.clone(),
        scheduler,
        store,
        rate_limiter,
    };

    let app = create_router()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "hivemind server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
