use super::*;

pub async fn list_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(query): Query<PermissionListQuery>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    require_access(
        &state,
        &user,
        ProtectedResource::Permission,
        ResourceAction::List,
        user.organization_id(),
    )
    .await?;

    let permissions = state
        .admin_service
        .list_active_permissions(query.resource.as_deref())
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}

pub async fn lookup_permission_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(codename): Path<String>,
) -> ApiResult<Json<PermissionResponse>> {
    require_access(
        &state,
        &user,
        ProtectedResource::Permission,
        ResourceAction::Read,
        user.organization_id(),
    )
    .await?;

    let permission = state
        .admin_service
        .lookup_permission(codename.as_str())
        .await?;

    Ok(Json(PermissionResponse::from(permission)))
}

pub async fn set_permission_active_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(permission_id): Path<uuid::Uuid>,
    Json(payload): Json<SetPermissionActiveRequest>,
) -> ApiResult<StatusCode> {
    state
        .admin_service
        .set_permission_active(
            &user,
            PermissionId::from_uuid(permission_id),
            payload.is_active,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
