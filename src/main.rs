use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use talent_match::config::{LoggingSettings, Settings};
use talent_match::core::{EngineServices, Matcher};
use talent_match::routes::{self, handle_json_payload_error, AppState};
use talent_match::services::{CachedEmbedder, PostgresStore, TextServiceClient};

fn init_logging(logging: &LoggingSettings) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_logging(&settings.logging);
    info!("Starting Talent Match service...");

    let store = PostgresStore::from_settings(
        &settings.database.url,
        settings.database.max_connections,
        settings.database.min_connections,
        settings.database.acquire_timeout_secs,
        settings.database.idle_timeout_secs,
    )
    .await
    .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?;

    info!("PostgreSQL store initialized");

    let text_service = Arc::new(
        TextServiceClient::new(
            settings.text_service.base_url.clone(),
            settings.text_service.api_key.clone(),
            Duration::from_secs(settings.text_service.request_timeout_secs),
        )
        .map_err(|e| startup_error("Failed to create text service client", e))?,
    );

    let embedder = Arc::new(CachedEmbedder::new(
        text_service.clone(),
        settings.cache.embedding_cache_size,
        settings.cache.ttl_secs,
    ));

    info!(
        "Text service client initialized ({}), embedding cache: {} entries, TTL {}s",
        settings.text_service.base_url,
        settings.cache.embedding_cache_size,
        settings.cache.ttl_secs
    );

    let store_ref = Arc::new(store.clone());
    let match_settings = settings.match_settings();
    info!(
        "Matcher initialized with candidate weights {:?}, course weights {:?}",
        match_settings.candidate_weights,
        match_settings.course_weights
    );

    let matcher = Matcher::new(
        EngineServices {
            extractor: text_service.clone(),
            embedder,
            search: store_ref.clone(),
            scorer: text_service,
            repository: store_ref,
        },
        match_settings,
    );

    let app_state = AppState {
        matcher,
        thresholds: settings.quality_thresholds(),
        store: Some(store),
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
