use std::sync::Arc;

use sqlx::PgPool;
use warden_application::{AuthorizationService, RbacAdminService};
use warden_domain::ResourceAccessMap;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub authorization_service: AuthorizationService,
    pub admin_service: RbacAdminService,
    pub access_map: Arc<ResourceAccessMap>,
    pub postgres_pool: PgPool,
}
