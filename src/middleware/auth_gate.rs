/// Auth Gate Middleware
///
/// Guards protected routes. The access token is read from the
/// `accessToken` cookie, falling back to an `Authorization: Bearer` header.
/// On success an `AuthenticatedUser` is injected into request extensions.
/// Every rejection (missing, expired, tampered, malformed) produces the same
/// 401 response; the cause is only logged.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use uuid::Uuid;

use crate::auth::TokenCodec;
use crate::cookies::ACCESS_COOKIE_NAME;
use crate::error::AuthError;

/// Identity attached to requests that passed the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Decide whether a request carrying `token` may proceed
///
/// Never consults the codec when no token is present.
pub fn authorize(token: Option<&str>, codec: &TokenCodec) -> Result<AuthenticatedUser, AuthError> {
    let token = match token {
        Some(token) if !token.is_empty() => token,
        _ => {
            tracing::debug!("No access token on request");
            return Err(AuthError::Unauthorized);
        }
    };

    let claims = codec.verify_access(token).map_err(|e| {
        tracing::debug!(error = %e, "Access token rejected");
        AuthError::Unauthorized
    })?;

    let user_id = claims.account_id().map_err(|_| AuthError::Unauthorized)?;
    Ok(AuthenticatedUser { user_id })
}

/// The single response body used for every gate rejection
pub fn unauthorized_response() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({
        "error": "not authorized",
        "code": "UNAUTHORIZED"
    }))
}

fn extract_access_token(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(ACCESS_COOKIE_NAME) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

/// Auth gate for protecting routes
pub struct AuthGate {
    codec: TokenCodec,
}

impl AuthGate {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthGateService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthGateService {
            service: Rc::new(service),
            codec: self.codec.clone(),
        }))
    }
}

pub struct AuthGateService<S> {
    service: Rc<S>,
    codec: TokenCodec,
}

impl<S, B> Service<ServiceRequest> for AuthGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = extract_access_token(&req);

        match authorize(token.as_deref(), &self.codec) {
            Ok(user) => {
                req.extensions_mut().insert(user);

                tracing::debug!(user_id = %user.user_id, "Auth gate passed");

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(_) => {
                tracing::warn!(path = %req.path(), "Auth gate rejected request");
                Box::pin(async move {
                    Err(actix_web::error::InternalError::from_response(
                        "Unauthorized",
                        unauthorized_response(),
                    )
                    .into())
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::JwtSettings;
    use actix_web::body::to_bytes;
    use actix_web::cookie::Cookie;
    use actix_web::dev::Service as _;
    use actix_web::{test as actix_test, web, App};
    use chrono::{Duration, Utc};

    fn codec() -> TokenCodec {
        TokenCodec::new(&JwtSettings::new("gate-access-secret", "gate-refresh-secret")).unwrap()
    }

    async fn whoami(user: web::ReqData<AuthenticatedUser>) -> HttpResponse {
        HttpResponse::Ok().body(user.user_id.to_string())
    }

    #[test]
    fn test_authorize_valid_token() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let pair = codec.issue(user_id).unwrap();

        let user = authorize(Some(&pair.access_token), &codec).unwrap();
        assert_eq!(user.user_id, user_id);
    }

    #[test]
    fn test_authorize_collapses_failures() {
        let codec = codec();
        let expired = codec
            .issue_at(Uuid::new_v4(), Utc::now() - Duration::minutes(20))
            .unwrap();
        let valid = codec.issue(Uuid::new_v4()).unwrap();
        let tampered = format!("{}X", valid.access_token);

        for token in [
            None,
            Some(""),
            Some(expired.access_token.as_str()),
            Some(tampered.as_str()),
            Some(valid.refresh_token.as_str()),
        ] {
            assert_eq!(authorize(token, &codec), Err(AuthError::Unauthorized));
        }
    }

    #[actix_web::test]
    async fn test_gate_attaches_identity_from_cookie() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let pair = codec.issue(user_id).unwrap();

        let app = actix_test::init_service(
            App::new().service(
                web::scope("/api")
                    .wrap(AuthGate::new(codec.clone()))
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/api/whoami")
            .cookie(Cookie::new(ACCESS_COOKIE_NAME, pair.access_token))
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;

        assert_eq!(body, user_id.to_string());
    }

    #[actix_web::test]
    async fn test_gate_accepts_bearer_header() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let pair = codec.issue(user_id).unwrap();

        let app = actix_test::init_service(
            App::new().service(
                web::scope("/api")
                    .wrap(AuthGate::new(codec.clone()))
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/api/whoami")
            .insert_header(("Authorization", format!("Bearer {}", pair.access_token)))
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;

        assert_eq!(body, user_id.to_string());
    }

    #[actix_web::test]
    async fn test_gate_rejections_are_identical() {
        let codec = codec();
        let expired = codec
            .issue_at(Uuid::new_v4(), Utc::now() - Duration::minutes(20))
            .unwrap();
        let tampered = format!("{}X", codec.issue(Uuid::new_v4()).unwrap().access_token);

        let app = actix_test::init_service(
            App::new().service(
                web::scope("/api")
                    .wrap(AuthGate::new(codec.clone()))
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let mut responses = Vec::new();
        for token in [None, Some(expired.access_token), Some(tampered)] {
            let mut req = actix_test::TestRequest::get().uri("/api/whoami");
            if let Some(token) = token {
                req = req.cookie(Cookie::new(ACCESS_COOKIE_NAME, token));
            }

            let err = app
                .call(req.to_request())
                .await
                .err()
                .expect("gate should reject");
            let response = err.error_response();
            let status = response.status();
            let body = to_bytes(response.into_body()).await.unwrap();
            responses.push((status, body));
        }

        assert_eq!(responses[0].0, 401);
        assert!(responses.iter().all(|r| r == &responses[0]));
    }
}
