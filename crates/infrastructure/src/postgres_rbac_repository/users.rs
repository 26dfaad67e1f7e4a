use sqlx::{Postgres, Transaction};
use warden_application::{ExpiredGrantSweep, GrantMaintenanceRepository, UserAssignmentRepository};
use warden_domain::{UserPermissionGrant, UserRoleGrant};

use crate::grant_rows::keyed_rows;

use super::*;

#[async_trait]
impl UserAssignmentRepository for PostgresRbacRepository {
    async fn replace_user_roles(&self, user_id: UserId, grants: &[UserRoleGrant]) -> AppResult<()> {
        keyed_rows(
            user_id,
            grants,
            |grant| grant.user_id,
            |grant| grant.role_id,
            "user role",
        )?;

        let mut transaction = self.pool.begin().await.map_err(begin_error)?;
        let role_ids: Vec<RoleId> = grants.iter().map(|grant| grant.role_id).collect();
        require_active_roles(&mut transaction, &role_ids).await?;

        sqlx::query("DELETE FROM rbac_user_roles WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to clear user roles: {error}")))?;

        for grant in grants {
            insert_user_role(&mut transaction, grant, false).await?;
        }

        transaction.commit().await.map_err(commit_error)
    }

    async fn replace_user_permissions(
        &self,
        user_id: UserId,
        grants: &[UserPermissionGrant],
    ) -> AppResult<()> {
        keyed_rows(
            user_id,
            grants,
            |grant| grant.user_id,
            |grant| grant.permission_id,
            "user permission",
        )?;

        let mut transaction = self.pool.begin().await.map_err(begin_error)?;
        let permission_ids: Vec<PermissionId> =
            grants.iter().map(|grant| grant.permission_id).collect();
        require_active_permissions(&mut transaction, &permission_ids).await?;

        sqlx::query("DELETE FROM rbac_user_permissions WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear user permissions: {error}"))
            })?;

        for grant in grants {
            sqlx::query(
                r#"
                INSERT INTO rbac_user_permissions (
                    user_id, permission_id, granted_by, granted_at, expires_at, is_active
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(user_id.as_uuid())
            .bind(grant.permission_id.as_uuid())
            .bind(grant.granted_by.map(|granted_by| granted_by.as_uuid()))
            .bind(grant.window.granted_at())
            .bind(grant.window.expires_at())
            .bind(grant.window.is_active())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                map_write_error(
                    error,
                    "persist user permission",
                    format!("user permission '{}'", grant.permission_id).as_str(),
                )
            })?;
        }

        transaction.commit().await.map_err(commit_error)
    }

    async fn upsert_user_role(&self, grant: UserRoleGrant) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(begin_error)?;
        insert_user_role(&mut transaction, &grant, true).await?;
        transaction.commit().await.map_err(commit_error)
    }
}

async fn insert_user_role(
    transaction: &mut Transaction<'_, Postgres>,
    grant: &UserRoleGrant,
    overwrite: bool,
) -> AppResult<()> {
    let statement = if overwrite {
        r#"
        INSERT INTO rbac_user_roles (
            user_id, role_id, assigned_by, granted_at, expires_at, is_active
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (user_id, role_id) DO UPDATE
        SET assigned_by = EXCLUDED.assigned_by,
            granted_at = EXCLUDED.granted_at,
            expires_at = EXCLUDED.expires_at,
            is_active = EXCLUDED.is_active
        "#
    } else {
        r#"
        INSERT INTO rbac_user_roles (
            user_id, role_id, assigned_by, granted_at, expires_at, is_active
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        "#
    };

    sqlx::query(statement)
        .bind(grant.user_id.as_uuid())
        .bind(grant.role_id.as_uuid())
        .bind(grant.assigned_by.map(|assigned_by| assigned_by.as_uuid()))
        .bind(grant.window.granted_at())
        .bind(grant.window.expires_at())
        .bind(grant.window.is_active())
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            map_write_error(
                error,
                "persist user role",
                format!("user role '{}'", grant.role_id).as_str(),
            )
        })?;

    Ok(())
}

async fn deactivate_expired(
    transaction: &mut Transaction<'_, Postgres>,
    statement: &'static str,
    relation: &str,
    now: DateTime<Utc>,
) -> AppResult<u64> {
    sqlx::query(statement)
        .bind(now)
        .execute(&mut **transaction)
        .await
        .map(|result| result.rows_affected())
        .map_err(|error| {
            AppError::Internal(format!("failed to deactivate expired {relation}: {error}"))
        })
}

#[async_trait]
impl GrantMaintenanceRepository for PostgresRbacRepository {
    async fn deactivate_expired_grants(&self, now: DateTime<Utc>) -> AppResult<ExpiredGrantSweep> {
        let mut transaction = self.pool.begin().await.map_err(begin_error)?;

        let sweep = ExpiredGrantSweep {
            user_roles: deactivate_expired(
                &mut transaction,
                "UPDATE rbac_user_roles SET is_active = FALSE \
                 WHERE is_active AND expires_at <= $1",
                "user roles",
                now,
            )
            .await?,
            user_permissions: deactivate_expired(
                &mut transaction,
                "UPDATE rbac_user_permissions SET is_active = FALSE \
                 WHERE is_active AND expires_at <= $1",
                "user permissions",
                now,
            )
            .await?,
            group_permissions: deactivate_expired(
                &mut transaction,
                "UPDATE rbac_group_permissions SET is_active = FALSE \
                 WHERE is_active AND expires_at <= $1",
                "group permissions",
                now,
            )
            .await?,
            memberships: deactivate_expired(
                &mut transaction,
                "UPDATE rbac_group_memberships SET is_active = FALSE \
                 WHERE is_active AND expires_at <= $1",
                "group memberships",
                now,
            )
            .await?,
            group_roles: deactivate_expired(
                &mut transaction,
                "UPDATE rbac_group_roles SET is_active = FALSE \
                 WHERE is_active AND expires_at <= $1",
                "group roles",
                now,
            )
            .await?,
        };

        transaction.commit().await.map_err(commit_error)?;
        Ok(sweep)
    }
}
