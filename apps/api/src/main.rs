//! Warden API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use tracing::info;
use warden_core::AppError;

use crate::api_config::{ApiCommand, ApiConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;
    let pool = api_services::connect_and_migrate(&config).await?;

    match config.command.clone() {
        ApiCommand::Migrate => {
            info!("database migrations applied successfully");
            Ok(())
        }
        ApiCommand::Seed {
            reset,
            administrator,
        } => {
            let bootstrap = api_services::build_catalog_bootstrap_service(&pool);
            let report = bootstrap.seed(reset).await?;
            info!(
                permissions_created = report.permissions_created,
                permissions_existing = report.permissions_existing,
                roles_created = report.roles_created,
                roles_existing = report.roles_existing,
                reset,
                "permission catalog seeded"
            );

            if let Some(administrator) = administrator {
                bootstrap
                    .grant_system_role(administrator, "saas_administrator")
                    .await?;
                info!(user_id = %administrator, "platform administrator granted");
            }

            Ok(())
        }
        ApiCommand::Serve => {
            let app_state = api_services::build_app_state(&pool).await?;
            let app = api_router::build_router(app_state, config.frontend_url.as_deref())?;

            let address = config.socket_address()?;
            let listener = tokio::net::TcpListener::bind(address)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to bind API listener: {error}"))
                })?;

            info!(%address, "warden api listening");
            axum::serve(listener, app)
                .await
                .map_err(|error| AppError::Internal(format!("API server error: {error}")))
        }
    }
}
