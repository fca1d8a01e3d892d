use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use authgate::auth::{CredentialService, TokenCodec};
use authgate::configuration::get_configuration;
use authgate::cookies::TokenCookies;
use authgate::startup::run;
use authgate::store::PostgresAccountStore;
use authgate::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    configuration.application.validate().map_err(|e| {
        tracing::error!("Invalid application settings: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Application configuration error")
    })?;

    let codec = TokenCodec::new(&configuration.jwt).map_err(|e| {
        tracing::error!("Invalid token settings: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Token configuration error")
    })?;

    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "Database migration error")
    })?;

    tracing::info!("Database ready");

    let store = Arc::new(PostgresAccountStore::new(pool));
    let service = CredentialService::new(store, codec);
    let cookies = TokenCookies::from_settings(
        configuration.application.environment,
        &configuration.jwt,
    );

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!(environment = ?configuration.application.environment, "Server listening on: {}", address);

    run(
        listener,
        service,
        cookies,
        configuration.application.client_url.clone(),
    )?
    .await
}
