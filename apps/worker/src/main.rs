//! Warden grant maintenance worker.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use warden_application::GrantMaintenanceService;
use warden_core::{AppError, AppResult};
use warden_infrastructure::PostgresRbacRepository;

#[derive(Debug, Clone)]
struct WorkerConfig {
    database_url: String,
    sweep_interval_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;
    let maintenance_service =
        GrantMaintenanceService::new(Arc::new(PostgresRbacRepository::new(pool)));

    info!(
        sweep_interval_seconds = config.sweep_interval_seconds,
        "warden-worker started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.sweep_interval_seconds));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        match maintenance_service.sweep(Utc::now()).await {
            Ok(sweep) if sweep.total() > 0 => {
                info!(
                    user_roles = sweep.user_roles,
                    user_permissions = sweep.user_permissions,
                    group_permissions = sweep.group_permissions,
                    memberships = sweep.memberships,
                    group_roles = sweep.group_roles,
                    "expired grants deactivated"
                );
            }
            Ok(_) => {}
            Err(error) => {
                warn!(error = %error, "expired grant sweep failed");
            }
        }
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let sweep_interval_seconds =
            parse_interval(env::var("WORKER_SWEEP_INTERVAL_SECONDS").ok())?;

        Ok(Self {
            database_url,
            sweep_interval_seconds,
        })
    }
}

fn parse_interval(value: Option<String>) -> AppResult<u64> {
    let Some(value) = value.filter(|value| !value.trim().is_empty()) else {
        return Ok(300);
    };

    let seconds = value.trim().parse::<u64>().map_err(|error| {
        AppError::Validation(format!(
            "invalid WORKER_SWEEP_INTERVAL_SECONDS value '{value}': {error}"
        ))
    })?;
    if seconds == 0 {
        return Err(AppError::Validation(
            "WORKER_SWEEP_INTERVAL_SECONDS must be greater than zero".to_owned(),
        ));
    }

    Ok(seconds)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
