use tracing::warn;
use warden_application::{PermissionCatalogRepository, PermissionQuery, RoleRepository};
use warden_domain::RolePermissionGrant;

use crate::grant_rows::keyed_rows;

use super::*;

#[async_trait]
impl PermissionCatalogRepository for PostgresRbacRepository {
    async fn save_permission(&self, permission: Permission) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rbac_permissions (
                id, codename, name, description, permission_type, resource, is_active, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(permission.id().as_uuid())
        .bind(permission.codename())
        .bind(permission.name())
        .bind(permission.description())
        .bind(permission.permission_type().as_str())
        .bind(permission.resource())
        .bind(permission.is_active())
        .bind(permission.created_at())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_write_error(
                error,
                "save permission",
                format!("permission '{}'", permission.codename()).as_str(),
            )
        })?;

        Ok(())
    }

    async fn find_permission(&self, permission_id: PermissionId) -> AppResult<Option<Permission>> {
        sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, codename, name, description, permission_type, resource, is_active, created_at
            FROM rbac_permissions
            WHERE id = $1
            "#,
        )
        .bind(permission_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find permission: {error}")))?
        .map(Permission::try_from)
        .transpose()
    }

    async fn find_permission_by_codename(&self, codename: &str) -> AppResult<Option<Permission>> {
        sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, codename, name, description, permission_type, resource, is_active, created_at
            FROM rbac_permissions
            WHERE codename = $1
            "#,
        )
        .bind(codename)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find permission: {error}")))?
        .map(Permission::try_from)
        .transpose()
    }

    async fn list_permissions(&self, query: PermissionQuery) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, codename, name, description, permission_type, resource, is_active, created_at
            FROM rbac_permissions
            WHERE ($1 = FALSE OR is_active)
                AND ($2::TEXT IS NULL OR resource = $2)
            ORDER BY resource, permission_type
            "#,
        )
        .bind(query.active_only)
        .bind(query.resource.as_deref())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list permissions: {error}")))?;

        rows.into_iter().map(Permission::try_from).collect()
    }

    async fn set_permission_active(
        &self,
        permission_id: PermissionId,
        is_active: bool,
    ) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE rbac_permissions
            SET is_active = $2
            WHERE id = $1
            "#,
        )
        .bind(permission_id.as_uuid())
        .bind(is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update permission: {error}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "permission '{permission_id}' does not exist"
            )));
        }

        Ok(())
    }

    async fn clear_catalog(&self) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(begin_error)?;

        sqlx::query("DELETE FROM rbac_roles")
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to clear roles: {error}")))?;
        sqlx::query("DELETE FROM rbac_permissions")
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear permissions: {error}"))
            })?;

        transaction.commit().await.map_err(commit_error)?;
        warn!("cleared permission catalog and roles");
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for PostgresRbacRepository {
    async fn save_role(&self, role: Role) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rbac_roles (
                id,
                name,
                codename,
                description,
                role_type,
                organization_id,
                is_system_role,
                is_active,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(role.id().as_uuid())
        .bind(role.name())
        .bind(role.codename())
        .bind(role.description())
        .bind(role.role_type().as_str())
        .bind(role.organization_id().map(|organization_id| organization_id.as_uuid()))
        .bind(role.is_system_role())
        .bind(role.is_active())
        .bind(role.created_at())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_write_error(
                error,
                "save role",
                format!("role '{}'", role.codename()).as_str(),
            )
        })?;

        Ok(())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT
                id,
                name,
                codename,
                description,
                role_type,
                organization_id,
                is_system_role,
                is_active,
                created_at
            FROM rbac_roles
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role: {error}")))?
        .map(Role::try_from)
        .transpose()
    }

    async fn find_role_by_codename(
        &self,
        codename: &str,
        organization_id: Option<OrganizationId>,
    ) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT
                id,
                name,
                codename,
                description,
                role_type,
                organization_id,
                is_system_role,
                is_active,
                created_at
            FROM rbac_roles
            WHERE codename = $1
                AND organization_id IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(codename)
        .bind(organization_id.map(|organization_id| organization_id.as_uuid()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role: {error}")))?
        .map(Role::try_from)
        .transpose()
    }

    async fn list_roles(&self, scope: Option<OrganizationId>) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT
                id,
                name,
                codename,
                description,
                role_type,
                organization_id,
                is_system_role,
                is_active,
                created_at
            FROM rbac_roles
            WHERE $1::UUID IS NULL
                OR role_type = 'system'
                OR organization_id = $1
            ORDER BY codename, organization_id NULLS FIRST
            "#,
        )
        .bind(scope.map(|organization_id| organization_id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        rows.into_iter().map(Role::try_from).collect()
    }

    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        grants: &[RolePermissionGrant],
    ) -> AppResult<()> {
        keyed_rows(
            role_id,
            grants,
            |grant| grant.role_id,
            |grant| grant.permission_id,
            "role permission",
        )?;

        let mut transaction = self.pool.begin().await.map_err(begin_error)?;

        sqlx::query_scalar::<_, uuid::Uuid>("SELECT id FROM rbac_roles WHERE id = $1 FOR UPDATE")
            .bind(role_id.as_uuid())
            .fetch_optional(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to resolve role: {error}")))?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;
        let permission_ids: Vec<PermissionId> =
            grants.iter().map(|grant| grant.permission_id).collect();
        require_active_permissions(&mut transaction, &permission_ids).await?;

        sqlx::query("DELETE FROM rbac_role_permissions WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear role permissions: {error}"))
            })?;

        for grant in grants {
            sqlx::query(
                r#"
                INSERT INTO rbac_role_permissions (role_id, permission_id, granted_by, granted_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(grant.role_id.as_uuid())
            .bind(grant.permission_id.as_uuid())
            .bind(grant.granted_by.map(|user_id| user_id.as_uuid()))
            .bind(grant.granted_at)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                map_write_error(
                    error,
                    "persist role permission",
                    format!("role permission '{}'", grant.permission_id).as_str(),
                )
            })?;
        }

        transaction.commit().await.map_err(commit_error)
    }

    async fn list_role_permissions(&self, role_id: RoleId) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT
                permissions.id,
                permissions.codename,
                permissions.name,
                permissions.description,
                permissions.permission_type,
                permissions.resource,
                permissions.is_active,
                permissions.created_at
            FROM rbac_role_permissions AS role_permissions
            INNER JOIN rbac_permissions AS permissions
                ON permissions.id = role_permissions.permission_id
            WHERE role_permissions.role_id = $1
            ORDER BY permissions.resource, permissions.permission_type
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list role permissions: {error}"))
        })?;

        rows.into_iter().map(Permission::try_from).collect()
    }
}
