use warden_application::{PermissionCatalogRepository, PermissionQuery, RoleRepository};
use warden_core::OrganizationId;

use super::*;

#[async_trait]
impl PermissionCatalogRepository for InMemoryRbacRepository {
    async fn save_permission(&self, permission: Permission) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .permissions
            .values()
            .any(|existing| existing.codename() == permission.codename())
        {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.codename()
            )));
        }

        tables.permissions.insert(permission.id(), permission);
        Ok(())
    }

    async fn find_permission(&self, permission_id: PermissionId) -> AppResult<Option<Permission>> {
        Ok(self.tables.read().await.permissions.get(&permission_id).cloned())
    }

    async fn find_permission_by_codename(&self, codename: &str) -> AppResult<Option<Permission>> {
        Ok(self
            .tables
            .read()
            .await
            .permissions
            .values()
            .find(|permission| permission.codename() == codename)
            .cloned())
    }

    async fn list_permissions(&self, query: PermissionQuery) -> AppResult<Vec<Permission>> {
        let tables = self.tables.read().await;
        let mut values: Vec<Permission> = tables
            .permissions
            .values()
            .filter(|permission| !query.active_only || permission.is_active())
            .filter(|permission| {
                query
                    .resource
                    .as_deref()
                    .is_none_or(|resource| permission.resource() == resource)
            })
            .cloned()
            .collect();
        values.sort_by(|left, right| {
            (left.resource(), left.permission_type().as_str())
                .cmp(&(right.resource(), right.permission_type().as_str()))
        });

        Ok(values)
    }

    async fn set_permission_active(
        &self,
        permission_id: PermissionId,
        is_active: bool,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let permission = tables.permissions.get_mut(&permission_id).ok_or_else(|| {
            AppError::NotFound(format!("permission '{permission_id}' does not exist"))
        })?;
        permission.set_active(is_active);
        Ok(())
    }

    async fn clear_catalog(&self) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.permissions.clear();
        tables.roles.clear();
        tables.role_permissions.clear();
        tables.user_roles.clear();
        tables.user_permissions.clear();
        tables.group_roles.clear();
        tables.group_permissions.clear();
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for InMemoryRbacRepository {
    async fn save_role(&self, role: Role) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.roles.values().any(|existing| {
            existing.codename() == role.codename()
                && existing.organization_id() == role.organization_id()
        }) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists in this scope",
                role.codename()
            )));
        }

        tables.roles.insert(role.id(), role);
        Ok(())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.tables.read().await.roles.get(&role_id).cloned())
    }

    async fn find_role_by_codename(
        &self,
        codename: &str,
        organization_id: Option<OrganizationId>,
    ) -> AppResult<Option<Role>> {
        Ok(self
            .tables
            .read()
            .await
            .roles
            .values()
            .find(|role| role.codename() == codename && role.organization_id() == organization_id)
            .cloned())
    }

    async fn list_roles(&self, scope: Option<OrganizationId>) -> AppResult<Vec<Role>> {
        let tables = self.tables.read().await;
        let mut values: Vec<Role> = tables
            .roles
            .values()
            .filter(|role| role.applies_in_scope(scope))
            .cloned()
            .collect();
        values.sort_by(|left, right| {
            (left.codename(), left.organization_id())
                .cmp(&(right.codename(), right.organization_id()))
        });

        Ok(values)
    }

    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        grants: &[RolePermissionGrant],
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.require_role(role_id)?;
        let replacement = keyed_rows(
            role_id,
            grants,
            |grant| grant.role_id,
            |grant| grant.permission_id,
            "role permission",
        )?;
        for grant in grants {
            tables.check_permission_reference(grant.permission_id)?;
        }

        tables
            .role_permissions
            .retain(|(stored_role_id, _), _| *stored_role_id != role_id);
        tables.role_permissions.extend(replacement);
        Ok(())
    }

    async fn list_role_permissions(&self, role_id: RoleId) -> AppResult<Vec<Permission>> {
        let tables = self.tables.read().await;
        let mut values: Vec<Permission> = tables
            .role_permissions
            .keys()
            .filter(|(stored_role_id, _)| *stored_role_id == role_id)
            .filter_map(|(_, permission_id)| tables.permissions.get(permission_id).cloned())
            .collect();
        values.sort_by(|left, right| {
            (left.resource(), left.permission_type().as_str())
                .cmp(&(right.resource(), right.permission_type().as_str()))
        });

        Ok(values)
    }
}
