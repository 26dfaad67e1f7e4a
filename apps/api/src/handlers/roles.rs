use std::str::FromStr;

use warden_application::CreateRoleInput;
use warden_domain::RoleType;

use super::*;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .admin_service
        .list_roles(&user, query.scope())
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn list_system_roles_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .admin_service
        .list_system_roles(&user)
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state
        .admin_service
        .create_role(
            &user,
            CreateRoleInput {
                name: payload.name,
                codename: payload.codename,
                description: payload.description,
                role_type: RoleType::from_str(payload.role_type.as_str())?,
                organization_id: payload.organization_id.map(OrganizationId::from_uuid),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn list_role_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(role_id): Path<uuid::Uuid>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let permissions = state
        .admin_service
        .list_role_permissions(&user, RoleId::from_uuid(role_id))
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}

pub async fn assign_role_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(role_id): Path<uuid::Uuid>,
    Json(payload): Json<RolePermissionsRequest>,
) -> ApiResult<StatusCode> {
    state
        .admin_service
        .assign_role_permissions(
            &user,
            RoleId::from_uuid(role_id),
            &permission_ids(&payload.permission_ids),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
