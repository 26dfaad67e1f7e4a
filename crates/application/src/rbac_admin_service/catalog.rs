use tracing::info;

use super::*;

use crate::PermissionQuery;

impl RbacAdminService {
    /// Looks a permission up by codename. Callers never fabricate missing entries.
    pub async fn lookup_permission(&self, codename: &str) -> AppResult<Permission> {
        self.catalog_repository
            .find_permission_by_codename(codename)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("permission '{codename}' is not registered"))
            })
    }

    /// Lists active permissions, optionally restricted to one resource.
    pub async fn list_active_permissions(
        &self,
        resource: Option<&str>,
    ) -> AppResult<Vec<Permission>> {
        self.catalog_repository
            .list_permissions(PermissionQuery::active(resource))
            .await
    }

    /// Enables or soft-disables a permission everywhere it is linked.
    ///
    /// The catalog is global, so this needs platform authority.
    pub async fn set_permission_active(
        &self,
        actor: &UserIdentity,
        permission_id: PermissionId,
        is_active: bool,
    ) -> AppResult<()> {
        self.authorize_platform(actor, ProtectedResource::Permission, ResourceAction::Update)
            .await?;

        self.catalog_repository
            .set_permission_active(permission_id, is_active)
            .await?;

        info!(
            permission_id = %permission_id,
            is_active,
            actor = %actor.user_id(),
            "permission activity changed"
        );
        Ok(())
    }
}
