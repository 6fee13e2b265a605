// Fixed, permissive CORS policy so browser frontends on any origin can call the API.

use actix_web::http::header;
use actix_web::middleware::DefaultHeaders;

pub const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization, Accept, Origin, X-Requested-With";
pub const MAX_AGE_SECS: &str = "86400";

/// Middleware adding the CORS headers to every response, errors included.
pub fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .add((header::ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS))
        .add((header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS))
        .add((header::ACCESS_CONTROL_MAX_AGE, MAX_AGE_SECS))
}
