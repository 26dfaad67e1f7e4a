use super::*;

pub async fn assign_user_roles_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(user_id): Path<uuid::Uuid>,
    Json(payload): Json<AssignRolesRequest>,
) -> ApiResult<StatusCode> {
    state
        .admin_service
        .assign_user_roles(
            &user,
            UserId::from_uuid(user_id),
            &role_ids(&payload.role_ids),
            payload.expires_at,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_user_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(user_id): Path<uuid::Uuid>,
    Json(payload): Json<AssignPermissionsRequest>,
) -> ApiResult<StatusCode> {
    state
        .admin_service
        .assign_user_permissions(
            &user,
            UserId::from_uuid(user_id),
            &permission_ids(&payload.permission_ids),
            payload.expires_at,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
