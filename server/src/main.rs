// kab-server/src/main.rs

mod config;
mod errors;
mod services;
mod state;
mod web;

use crate::config::AppConfig;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use kab_orders::{Engine, PgStore};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting kab-phone order server...");

  let app_config = Arc::new(AppConfig::from_env().context("loading configuration")?);

  let pool = PgPoolOptions::new()
    .max_connections(app_config.database_max_connections)
    .acquire_timeout(Duration::from_secs(5))
    .connect(&app_config.database_url)
    .await
    .context("connecting to the database")?;
  tracing::info!("Successfully connected to the database.");

  let store = PgStore::from_pool(pool);
  if app_config.run_migrations {
    store.migrate().await.context("running database migrations")?;
    tracing::info!("Database migrations applied.");
  }

  let engine = Engine::builder(Arc::new(store))
    .config(app_config.engine.clone())
    .build()
    .context("building the order engine")?;

  let app_state = AppState {
    engine: Arc::new(engine),
  };

  let server_address = app_config.bind_address();
  tracing::info!(address = %server_address, "Binding HTTP server.");

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("binding {server_address}"))?
  .run()
  .await?;

  Ok(())
}
