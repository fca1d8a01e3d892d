/// CORS Middleware
///
/// Lets the configured browser client call the API from its own origin.
/// Credentials are allowed, otherwise the browser would drop the token
/// cookies on cross-origin requests.

use actix_cors::Cors;
use actix_web::http::header;

/// Build the CORS layer for a single allowed origin
///
/// `client_url` must already be validated (see `ApplicationSettings::validate`).
pub fn cors_middleware(client_url: &str) -> Cors {
    Cors::default()
        .allowed_origin(client_url.trim_end_matches('/'))
        // Methods actually used by the API
        .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
        .supports_credentials()
        .max_age(3600)
}
