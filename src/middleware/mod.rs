/// Middleware module
///
/// Authentication gate for protected routes and the CORS layer.

mod auth_gate;
mod cors;

pub use auth_gate::{authorize, unauthorized_response, AuthGate, AuthenticatedUser};
pub use cors::cors_middleware;
