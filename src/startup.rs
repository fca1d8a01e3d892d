use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::CredentialService;
use crate::cookies::TokenCookies;
use crate::logger::LoggerMiddleware;
use crate::middleware::{cors_middleware, AuthGate};
use crate::routes::{get_current_user, health_check, login, logout, refresh, register};

pub fn run(
    listener: TcpListener,
    service: CredentialService,
    cookies: TokenCookies,
    client_url: String,
) -> Result<Server, std::io::Error> {
    let codec = service.codec().clone();
    let service = web::Data::new(service);
    let cookies = web::Data::new(cookies);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(cors_middleware(&client_url))
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)
            // Shared state
            .app_data(service.clone())
            .app_data(cookies.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/auth")
                    // Public routes
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    // Protected routes
                    .service(
                        web::resource("/logout")
                            .wrap(AuthGate::new(codec.clone()))
                            .route(web::delete().to(logout)),
                    )
                    .service(
                        web::resource("/me")
                            .wrap(AuthGate::new(codec.clone()))
                            .route(web::get().to(get_current_user)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
