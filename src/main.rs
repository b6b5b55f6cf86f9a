use anyhow::Context;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use tidepool_api::config;
use tidepool_api::handlers;
use tidepool_api::media::{LocalObjectStore, UploadRouter, UrlSigner};
use tidepool_api::state::AppState;
use tidepool_api::store::PostgresStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL etc.
    let _ = dotenvy::dotenv();

    let config = config::config();
    tracing_subscriber::fmt::init();
    tracing::info!("starting tidepool-api in {:?} mode", config.environment);

    if config.media.signing_secret.is_empty() {
        anyhow::bail!("MEDIA_SIGNING_SECRET must be set outside development");
    }

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let store = PostgresStore::connect(&database_url, &config.database).await?;

    let signer = Arc::new(UrlSigner::new(
        config.media.signing_secret.clone(),
        &config.media.public_base_url,
        config.media.signed_url_ttl_secs,
    ));
    let objects = Arc::new(LocalObjectStore::new(&config.media.storage_root));
    let uploads = Arc::new(UploadRouter::new(
        objects,
        signer.clone(),
        &config.media.public_base_url,
        &config.media.bucket,
    ));

    let state = AppState::new(Arc::new(store), uploads, signer);

    let mut app = handlers::router(state);
    if config.server.enable_cors {
        app = app.layer(CorsLayer::permissive());
    }

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server")?;
    Ok(())
}
