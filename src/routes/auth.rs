/// Authentication Routes
///
/// Register, login, refresh, logout and current-user handlers. Tokens travel
/// in cookies; response bodies only carry the account.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthOutcome, CredentialService};
use crate::cookies::{TokenCookies, REFRESH_COOKIE_NAME};
use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::store::Account;

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserResponse<'a> {
    pub user: &'a Account,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

fn with_tokens(
    mut response: actix_web::HttpResponseBuilder,
    outcome: &AuthOutcome,
    cookies: &TokenCookies,
) -> HttpResponse {
    cookies.set_token_cookies(&mut response, &outcome.tokens);
    response.json(UserResponse {
        user: &outcome.account,
    })
}

/// POST /api/auth/register
///
/// # Errors
/// - 400: Validation errors (invalid email/username/password)
/// - 409: Email or username already registered
/// - 503: Account store unavailable
pub async fn register(
    form: web::Json<RegisterRequest>,
    service: web::Data<CredentialService>,
    cookies: web::Data<TokenCookies>,
) -> Result<HttpResponse, AppError> {
    let outcome = service
        .register(&form.username, &form.email, &form.password)
        .await?;

    Ok(with_tokens(HttpResponse::Created(), &outcome, &cookies))
}

/// POST /api/auth/login
///
/// # Errors
/// - 401: Invalid credentials (email not found or wrong password)
/// - 503: Account store unavailable
pub async fn login(
    form: web::Json<LoginRequest>,
    service: web::Data<CredentialService>,
    cookies: web::Data<TokenCookies>,
) -> Result<HttpResponse, AppError> {
    let outcome = service.login(&form.email, &form.password).await?;

    Ok(with_tokens(HttpResponse::Ok(), &outcome, &cookies))
}

/// POST /api/auth/refresh
///
/// Reads the refresh token from its cookie and rotates both cookies.
///
/// # Errors
/// - 401: Missing or invalid refresh token
/// - 404: Token subject no longer exists
/// - 503: Account store unavailable
pub async fn refresh(
    req: HttpRequest,
    service: web::Data<CredentialService>,
    cookies: web::Data<TokenCookies>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = req
        .cookie(REFRESH_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string());

    let outcome = service.refresh(refresh_token.as_deref()).await?;

    Ok(with_tokens(HttpResponse::Ok(), &outcome, &cookies))
}

/// DELETE /api/auth/logout
///
/// **Requires a valid access token** (enforced by the auth gate).
pub async fn logout(
    user: web::ReqData<AuthenticatedUser>,
    service: web::Data<CredentialService>,
    cookies: web::Data<TokenCookies>,
) -> Result<HttpResponse, AppError> {
    service.logout()?;
    tracing::info!(user_id = %user.user_id, "User logged out");

    let mut response = HttpResponse::Ok();
    cookies.clear_token_cookies(&mut response);
    Ok(response.json(MessageResponse {
        message: "successful logout",
    }))
}

/// GET /api/auth/me
///
/// **Requires a valid access token** (enforced by the auth gate).
///
/// # Errors
/// - 404: Account was deleted after the token was issued
pub async fn get_current_user(
    user: web::ReqData<AuthenticatedUser>,
    service: web::Data<CredentialService>,
) -> Result<HttpResponse, AppError> {
    let account = service.current_account(user.user_id).await?;

    Ok(HttpResponse::Ok().json(UserResponse { user: &account }))
}
