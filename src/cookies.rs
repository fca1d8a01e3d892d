/// Token cookie transport
///
/// Writes and clears the `accessToken` / `refreshToken` cookies. Both are
/// HttpOnly, SameSite=Strict and scoped to `/`; `Secure` is set only in
/// production. Max-age follows the token lifetimes.

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::HttpResponseBuilder;

use crate::auth::TokenPair;
use crate::configuration::{Environment, JwtSettings};

pub const ACCESS_COOKIE_NAME: &str = "accessToken";
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

#[derive(Debug, Clone)]
pub struct TokenCookies {
    secure: bool,
    access_max_age: Duration,
    refresh_max_age: Duration,
}

impl TokenCookies {
    pub fn new(secure: bool, access_max_age_secs: i64, refresh_max_age_secs: i64) -> Self {
        Self {
            secure,
            access_max_age: Duration::seconds(access_max_age_secs),
            refresh_max_age: Duration::seconds(refresh_max_age_secs),
        }
    }

    pub fn from_settings(environment: Environment, jwt: &JwtSettings) -> Self {
        Self::new(
            environment.is_production(),
            jwt.access_token_expiry,
            jwt.refresh_token_expiry,
        )
    }

    pub fn access_cookie(&self, token: &str) -> Cookie<'static> {
        self.token_cookie(ACCESS_COOKIE_NAME, token, self.access_max_age)
    }

    pub fn refresh_cookie(&self, token: &str) -> Cookie<'static> {
        self.token_cookie(REFRESH_COOKIE_NAME, token, self.refresh_max_age)
    }

    pub fn set_token_cookies(&self, response: &mut HttpResponseBuilder, tokens: &TokenPair) {
        response
            .cookie(self.access_cookie(&tokens.access_token))
            .cookie(self.refresh_cookie(&tokens.refresh_token));
    }

    pub fn clear_token_cookies(&self, response: &mut HttpResponseBuilder) {
        response
            .cookie(removal_cookie(ACCESS_COOKIE_NAME))
            .cookie(removal_cookie(REFRESH_COOKIE_NAME));
    }

    fn token_cookie(&self, name: &'static str, value: &str, max_age: Duration) -> Cookie<'static> {
        Cookie::build(name, value.to_string())
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .max_age(max_age)
            .finish()
    }
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "").path("/").finish();
    cookie.make_removal();
    cookie
}
