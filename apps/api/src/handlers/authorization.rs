use warden_application::PermissionDetails;

use super::*;

/// Reading another principal's grants needs `user.read` in the queried scope.
async fn ensure_principal_visible(
    state: &AppState,
    user: &UserIdentity,
    principal_id: UserId,
    scope: Option<OrganizationId>,
) -> ApiResult<()> {
    if principal_id == user.user_id() {
        return Ok(());
    }

    require_access(
        state,
        user,
        ProtectedResource::User,
        ResourceAction::Read,
        scope,
    )
    .await
}

pub async fn effective_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(principal_id): Path<uuid::Uuid>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<Json<EffectivePermissionsResponse>> {
    let principal_id = UserId::from_uuid(principal_id);
    let scope = query.scope();
    ensure_principal_visible(&state, &user, principal_id, scope).await?;

    let codenames = state
        .authorization_service
        .effective_permissions(principal_id, scope)
        .await?
        .into_iter()
        .collect();

    Ok(Json(EffectivePermissionsResponse { codenames }))
}

pub async fn permission_details_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(principal_id): Path<uuid::Uuid>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<Json<PermissionDetails>> {
    let principal_id = UserId::from_uuid(principal_id);
    let scope = query.scope();
    ensure_principal_visible(&state, &user, principal_id, scope).await?;

    let details = state
        .authorization_service
        .permission_details(principal_id, scope)
        .await?;

    Ok(Json(details))
}

pub async fn authorize_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<AuthorizeRequest>,
) -> ApiResult<Json<AuthorizeResponse>> {
    let principal_id = UserId::from_uuid(payload.principal_id);
    let scope = payload.organization_id.map(OrganizationId::from_uuid);
    ensure_principal_visible(&state, &user, principal_id, scope).await?;

    let principal = UserIdentity::new(principal_id, principal_id.to_string(), None, None);
    let allowed = state
        .authorization_service
        .permit(
            Some(&principal),
            payload.permissions.as_slice(),
            payload.require_all,
            scope,
        )
        .await?;

    Ok(Json(AuthorizeResponse { allowed }))
}
