//! HMIS server
//!
//! Main entry point for the hospital management API.

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

use hmis::{api, config, db::Database, telemetry, AppState};

fn cors(origins: &[String]) -> Cors {
    if origins.is_empty() {
        return Cors::permissive();
    }
    origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = config::load_config().context("failed to load configuration")?;
    telemetry::init(&config.log);

    // Connect to database
    let database = Database::connect(&config.database)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database.url))?;

    // Run migrations
    database
        .run_migrations()
        .await
        .context("failed to run database migrations")?;

    if database.bootstrap_admin(&config.auth).await? {
        warn!("Bootstrap administrator created; change its password after first login");
    }

    let bind = (config.server.host.clone(), config.server.port);
    let origins = config.server.cors_origins.clone();
    let state = web::Data::new(AppState::new(database, config));

    info!(host = %bind.0, port = bind.1, "Starting HMIS server");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors(&origins))
            .wrap(TracingLogger::default())
            .configure(api::configure)
    })
    .bind(bind)?
    .run()
    .await?;

    info!("HMIS server stopped");
    Ok(())
}
