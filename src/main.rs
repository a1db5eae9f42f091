//! Test plan manager server entry point.
//!
//! Loads configuration, connects and migrates the database, then serves
//! the `/api/v1` routes with Swagger UI alongside.

use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};
use actix_web::{App, HttpServer, web};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tpm_lib::api::{self, ApiDoc};
use tpm_lib::auth::AdminKey;
use tpm_lib::config::{ADMIN_KEY_HEADER, API_KEY_HEADER, Config};
use tpm_lib::db::DbPool;
use tpm_lib::middleware::{REQUEST_ID_HEADER, RequestLogger};

/// Largest accepted JSON body; bulk imports are the big ones.
const MAX_JSON_BODY: usize = 16 * 1024 * 1024;

fn io_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(format!("{}: {}", context, err))
}

fn cors(is_development: bool) -> Cors {
    let headers = vec![
        header::ACCEPT,
        header::CONTENT_TYPE,
        HeaderName::from_static("x-api-key"),
        HeaderName::from_static("x-admin-key"),
    ];
    let cors = if is_development {
        Cors::default()
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://127.0.0.1:3000")
    } else {
        // Same-origin only
        Cors::default()
    };

    cors.allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(headers)
        .expose_headers(vec![HeaderName::from_static(REQUEST_ID_HEADER)])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    // Used by the container HEALTHCHECK
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(if Config::from_env().is_ok() { 0 } else { 1 });
    }

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Test Plan Manager Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }
    if config.admin_key.is_none() {
        warn!("TPM_ADMIN_KEY is not set; admin endpoints accept admin users' API keys only");
    }

    let pool = DbPool::new(&config)
        .await
        .map_err(|e| io_error("Failed to connect to database", e))?;
    pool.run_migrations()
        .await
        .map_err(|e| io_error("Failed to run migrations", e))?;

    info!(
        max_code_attempts = config.workflow.max_code_attempts,
        max_bulk_items = config.workflow.max_bulk_items,
        bulk_deadline_secs = config.workflow.bulk_deadline_secs,
        invite_ttl_hours = config.workflow.invite_ttl_hours,
        "Workflow limits"
    );

    let bind_address = config.bind_address();
    let admin_key = AdminKey::new(config.admin_key.clone());
    let is_development = config.is_development();
    let worker_count = if is_development { 4 } else { num_cpus::get() };
    info!(
        "Starting server at http://{} ({} workers), API key header {}, admin header {}",
        bind_address, worker_count, API_KEY_HEADER, ADMIN_KEY_HEADER
    );

    let openapi = ApiDoc::openapi();
    let config = web::Data::new(config);
    let pool = web::Data::new(pool);
    let admin_key = web::Data::new(admin_key);

    HttpServer::new(move || {
        App::new()
            .wrap(cors(is_development))
            .wrap(RequestLogger)
            .app_data(pool.clone())
            .app_data(config.clone())
            .app_data(admin_key.clone())
            .app_data(api::json_config(MAX_JSON_BODY))
            // Registered before the scope, which would otherwise claim /api/v1/openapi.json
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api/v1/openapi.json", openapi.clone()),
            )
            .service(web::scope("/api/v1").configure(api::configure_api_routes))
    })
    .workers(worker_count)
    .bind(&bind_address)?
    .run()
    .await
}
