use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use stockcompare::api;
use stockcompare::config::AppConfig;
use stockcompare::data_structures::{SharedCatalog, SharedClient, SharedWatchlist, Watchlist};
use stockcompare::fields::FieldCatalog;
use stockcompare::yahoo::YahooClient;
use tokio::sync::Mutex;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;

#[derive(Clone)]
struct AppState {
    client: SharedClient,
    catalog: SharedCatalog,
    watchlist: SharedWatchlist,
}

impl FromRef<AppState> for SharedClient {
    fn from_ref(app_state: &AppState) -> SharedClient {
        app_state.client.clone()
    }
}

impl FromRef<AppState> for SharedCatalog {
    fn from_ref(app_state: &AppState) -> SharedCatalog {
        app_state.catalog.clone()
    }
}

impl FromRef<AppState> for SharedWatchlist {
    fn from_ref(app_state: &AppState) -> SharedWatchlist {
        app_state.watchlist.clone()
    }
}

#[tokio::main]
async fn main() {
    let app_config = AppConfig::load();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    tracing::info!("Starting stockcompare");
    tracing::info!(
        environment = %app_config.environment,
        port = app_config.port,
        reference_symbol = %app_config.reference_symbol,
        "Loaded configuration"
    );

    let mut provider = YahooClient::new(app_config.random_agent, app_config.rate_limit_per_minute)
        .expect("Failed to construct provider client");
    if let Some(base_url) = &app_config.provider_base_url {
        tracing::info!(%base_url, "Overriding provider base URL");
        provider = provider.with_base_url(base_url.clone());
    }

    // The catalog needs one reference snapshot; a failed fetch degrades to
    // the built-in default fields instead of refusing to start.
    let catalog = match provider.quote_summary(&app_config.reference_symbol).await {
        Ok(snapshot) => {
            tracing::info!(
                symbol = %snapshot.symbol,
                field_count = snapshot.fields.len(),
                "Built field catalog from reference snapshot"
            );
            FieldCatalog::from_snapshot(&snapshot)
        }
        Err(e) => {
            tracing::error!(error = ?e, "Reference snapshot fetch failed, using built-in field catalog");
            FieldCatalog::fallback()
        }
    };

    let app_state = AppState {
        client: Arc::new(Mutex::new(provider)),
        catalog: Arc::new(catalog),
        watchlist: Arc::new(Mutex::new(Watchlist::new())),
    };

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .finish()
            .unwrap(),
    );

    let app = Router::new()
        .route("/fields", get(api::get_fields_handler))
        .route("/compare/prices", get(api::price_comparison_handler))
        .route(
            "/compare/fundamentals",
            get(api::fundamentals_comparison_handler),
        )
        .route("/compare/ytd", get(api::ytd_comparison_handler))
        .route("/watchlist", get(api::get_watchlist_handler))
        .route(
            "/watchlist/symbols",
            post(api::append_watchlist_handler).layer(GovernorLayer::new(governor_conf)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], app_config.port));
    tracing::info!(%addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .unwrap();
}
