use warden_application::CreateGroupInput;

use super::*;

pub async fn list_groups_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(organization_id): Path<uuid::Uuid>,
) -> ApiResult<Json<Vec<GroupResponse>>> {
    let groups = state
        .admin_service
        .list_groups(&user, OrganizationId::from_uuid(organization_id))
        .await?
        .into_iter()
        .map(GroupResponse::from)
        .collect();

    Ok(Json(groups))
}

pub async fn create_group_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(organization_id): Path<uuid::Uuid>,
    Json(payload): Json<CreateGroupRequest>,
) -> ApiResult<(StatusCode, Json<GroupResponse>)> {
    let group = state
        .admin_service
        .create_group(
            &user,
            CreateGroupInput {
                name: payload.name,
                description: payload.description,
                organization_id: OrganizationId::from_uuid(organization_id),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(GroupResponse::from(group))))
}

pub async fn list_group_members_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(group_id): Path<uuid::Uuid>,
) -> ApiResult<Json<Vec<MembershipResponse>>> {
    let members = state
        .admin_service
        .list_group_members(&user, GroupId::from_uuid(group_id))
        .await?
        .into_iter()
        .map(MembershipResponse::from)
        .collect();

    Ok(Json(members))
}

pub async fn add_group_members_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(group_id): Path<uuid::Uuid>,
    Json(payload): Json<GroupMembersRequest>,
) -> ApiResult<StatusCode> {
    state
        .admin_service
        .add_group_members(
            &user,
            GroupId::from_uuid(group_id),
            &user_ids(&payload.user_ids),
            payload.expires_at,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_group_members_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(group_id): Path<uuid::Uuid>,
    Json(payload): Json<GroupMembersRequest>,
) -> ApiResult<Json<RemovedMembersResponse>> {
    let removed = state
        .admin_service
        .remove_group_members(
            &user,
            GroupId::from_uuid(group_id),
            &user_ids(&payload.user_ids),
        )
        .await?;

    Ok(Json(RemovedMembersResponse { removed }))
}

pub async fn assign_group_roles_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(group_id): Path<uuid::Uuid>,
    Json(payload): Json<AssignRolesRequest>,
) -> ApiResult<StatusCode> {
    state
        .admin_service
        .assign_group_roles(
            &user,
            GroupId::from_uuid(group_id),
            &role_ids(&payload.role_ids),
            payload.expires_at,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_group_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(group_id): Path<uuid::Uuid>,
    Json(payload): Json<AssignPermissionsRequest>,
) -> ApiResult<StatusCode> {
    state
        .admin_service
        .assign_group_permissions(
            &user,
            GroupId::from_uuid(group_id),
            &permission_ids(&payload.permission_ids),
            payload.expires_at,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
