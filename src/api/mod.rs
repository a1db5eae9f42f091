//! API endpoint modules.

pub mod admin;
pub mod health;
pub mod openapi;
pub mod projects;
pub mod public;
pub mod test_cases;
pub mod test_plans;
pub mod test_runs;

use actix_web::{HttpResponse, error::InternalError, web};

use crate::error::ErrorResponse;

pub use health::configure_health_routes;
pub use openapi::ApiDoc;

/// Register every `/api/v1` route on a service config.
pub fn configure_api_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes)
        .configure(admin::configure_routes)
        .configure(projects::configure_routes)
        .configure(test_cases::configure_routes)
        .configure(test_plans::configure_routes)
        .configure(test_runs::configure_routes)
        .configure(public::configure_routes);
}

/// JSON body limits, with malformed bodies reported in the usual error shape.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            let response = HttpResponse::BadRequest().json(ErrorResponse {
                error: "VALIDATION_ERROR".to_string(),
                message: err.to_string(),
            });
            InternalError::from_response(err, response).into()
        })
}
