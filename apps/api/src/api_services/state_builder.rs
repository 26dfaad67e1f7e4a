use std::sync::Arc;

use sqlx::PgPool;
use warden_application::{AuthorizationService, CatalogBootstrapService, RbacAdminService};
use warden_core::AppError;
use warden_infrastructure::PostgresRbacRepository;

use crate::state::AppState;

pub fn build_catalog_bootstrap_service(pool: &PgPool) -> CatalogBootstrapService {
    let repository = Arc::new(PostgresRbacRepository::new(pool.clone()));
    CatalogBootstrapService::new(repository.clone(), repository.clone(), repository)
}

/// Wires services over one Postgres repository and checks the access map
/// against the stored catalog.
pub async fn build_app_state(pool: &PgPool) -> Result<AppState, AppError> {
    let repository = Arc::new(PostgresRbacRepository::new(pool.clone()));
    let access_map = Arc::new(
        build_catalog_bootstrap_service(pool)
            .validated_access_map()
            .await
            .map_err(|error| {
                AppError::Validation(format!(
                    "resource access map does not match the catalog, run `seed` first: {error}"
                ))
            })?,
    );

    let authorization_service = AuthorizationService::new(repository.clone());
    let admin_service = RbacAdminService::new(
        authorization_service.clone(),
        access_map.clone(),
        repository.clone(),
        repository.clone(),
        repository.clone(),
        repository,
    );

    Ok(AppState {
        authorization_service,
        admin_service,
        access_map,
        postgres_pool: pool.clone(),
    })
}
