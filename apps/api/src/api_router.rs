use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::from_fn;
use axum::routing::{get, post, put};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use warden_core::AppError;

use crate::middleware::{ORGANIZATION_HEADER, PRINCIPAL_HEADER};
use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState, frontend_url: Option<&str>) -> Result<Router, AppError> {
    let protected_routes = Router::new()
        .route(
            "/api/principals/{user_id}/permissions",
            get(handlers::authorization::effective_permissions_handler),
        )
        .route(
            "/api/principals/{user_id}/details",
            get(handlers::authorization::permission_details_handler),
        )
        .route(
            "/api/authorize",
            post(handlers::authorization::authorize_handler),
        )
        .route(
            "/api/permissions",
            get(handlers::catalog::list_permissions_handler),
        )
        .route(
            "/api/permissions/codename/{codename}",
            get(handlers::catalog::lookup_permission_handler),
        )
        .route(
            "/api/permissions/{permission_id}/active",
            put(handlers::catalog::set_permission_active_handler),
        )
        .route(
            "/api/roles",
            get(handlers::roles::list_roles_handler).post(handlers::roles::create_role_handler),
        )
        .route(
            "/api/roles/system",
            get(handlers::roles::list_system_roles_handler),
        )
        .route(
            "/api/roles/{role_id}/permissions",
            get(handlers::roles::list_role_permissions_handler)
                .put(handlers::roles::assign_role_permissions_handler),
        )
        .route(
            "/api/organizations/{organization_id}/groups",
            get(handlers::groups::list_groups_handler)
                .post(handlers::groups::create_group_handler),
        )
        .route(
            "/api/groups/{group_id}/members",
            get(handlers::groups::list_group_members_handler)
                .post(handlers::groups::add_group_members_handler),
        )
        .route(
            "/api/groups/{group_id}/member-removals",
            post(handlers::groups::remove_group_members_handler),
        )
        .route(
            "/api/groups/{group_id}/roles",
            put(handlers::groups::assign_group_roles_handler),
        )
        .route(
            "/api/groups/{group_id}/permissions",
            put(handlers::groups::assign_group_permissions_handler),
        )
        .route(
            "/api/users/{user_id}/roles",
            put(handlers::users::assign_user_roles_handler),
        )
        .route(
            "/api/users/{user_id}/permissions",
            put(handlers::users::assign_user_permissions_handler),
        )
        .route_layer(from_fn(middleware::require_principal));

    let router = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http());

    let router = match frontend_url {
        Some(frontend_url) => router.layer(cors_layer(frontend_url)?),
        None => router,
    };

    Ok(router.with_state(app_state))
}

fn cors_layer(frontend_url: &str) -> Result<CorsLayer, AppError> {
    Ok(CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(PRINCIPAL_HEADER),
            HeaderName::from_static(ORGANIZATION_HEADER),
        ]))
}
