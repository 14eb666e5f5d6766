use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use std::sync::Arc;
use std::time::Duration;

mod ai;
mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod leave;
mod model;
mod models;
mod routes;

use crate::ai::AiAugmentationGateway;
use crate::docs::ApiDoc;
use crate::leave::LeaveRequestPolicyEngine;
use crate::leave::catalog::CachedLeaveTypeCatalog;
use crate::leave::repository::{MySqlLeaveRepository, MySqlLeaveTypeCatalog};
use crate::routes::RateLimits;
use config::Config;
use db::init_db;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HRM leave service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await?;

    let gateway = Arc::new(AiAugmentationGateway::from_config(&config.ai)?);
    let leave_types = Arc::new(CachedLeaveTypeCatalog::new(
        Arc::new(MySqlLeaveTypeCatalog::new(pool.clone())),
        Duration::from_secs(config.leave.leave_type_cache_ttl_secs),
    ));
    let engine = Data::new(LeaveRequestPolicyEngine::new(
        Arc::new(MySqlLeaveRepository::new(pool)),
        leave_types,
        gateway.clone(),
        config.leave.clone(),
    ));
    let gateway = Data::from(gateway);

    // Shared across workers so per-IP budgets are global to the process.
    let limits = RateLimits::from_config(&config)?;
    let server_addr = config.server_addr.clone();

    info!(addr = %server_addr, prefix = %config.api_prefix, "Binding HTTP server");

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(engine.clone())
            .app_data(gateway.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config, &limits))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
