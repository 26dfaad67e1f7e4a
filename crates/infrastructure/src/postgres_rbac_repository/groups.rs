use sqlx::{Postgres, Transaction};
use warden_application::GroupRepository;
use warden_domain::{GroupMembership, GroupPermissionGrant, GroupRoleGrant, ScopedResource};

use crate::grant_rows::keyed_rows;

use super::*;

#[derive(Debug, FromRow)]
struct MembershipRow {
    user_id: uuid::Uuid,
    group_id: uuid::Uuid,
    added_by: Option<uuid::Uuid>,
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl From<MembershipRow> for GroupMembership {
    fn from(row: MembershipRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            group_id: GroupId::from_uuid(row.group_id),
            added_by: row.added_by.map(UserId::from_uuid),
            window: GrantWindow::restore(row.granted_at, row.expires_at, row.is_active),
        }
    }
}

/// Locks the group row for the rest of the transaction.
async fn lock_group(
    transaction: &mut Transaction<'_, Postgres>,
    group_id: GroupId,
) -> AppResult<()> {
    sqlx::query_scalar::<_, uuid::Uuid>("SELECT id FROM rbac_groups WHERE id = $1 FOR UPDATE")
        .bind(group_id.as_uuid())
        .fetch_optional(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve group: {error}")))?
        .ok_or_else(|| AppError::NotFound(format!("group '{group_id}' does not exist")))?;

    Ok(())
}

/// Rejects memberships whose new expiry has already passed.
fn reject_lapsed(memberships: &[GroupMembership], now: DateTime<Utc>) -> AppResult<()> {
    match memberships
        .iter()
        .find(|membership| membership.window.is_expired_at(now))
    {
        Some(membership) => Err(AppError::Validation(format!(
            "membership of '{}' would already be expired",
            membership.user_id
        ))),
        None => Ok(()),
    }
}

#[async_trait]
impl GroupRepository for PostgresRbacRepository {
    async fn save_group(&self, group: Group) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rbac_groups (
                id, name, description, organization_id, created_by, is_active, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(group.id().as_uuid())
        .bind(group.name())
        .bind(group.description())
        .bind(group.organization_id().as_uuid())
        .bind(group.created_by().map(|user_id| user_id.as_uuid()))
        .bind(group.is_active())
        .bind(group.created_at())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_write_error(
                error,
                "save group",
                format!(
                    "group '{}' in organization '{}'",
                    group.name(),
                    group.organization_id()
                )
                .as_str(),
            )
        })?;

        Ok(())
    }

    async fn find_group(&self, group_id: GroupId) -> AppResult<Option<Group>> {
        sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT id, name, description, organization_id, created_by, is_active, created_at
            FROM rbac_groups
            WHERE id = $1
            "#,
        )
        .bind(group_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find group: {error}")))?
        .map(Group::try_from)
        .transpose()
    }

    async fn list_groups(&self, organization_id: OrganizationId) -> AppResult<Vec<Group>> {
        let rows = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT id, name, description, organization_id, created_by, is_active, created_at
            FROM rbac_groups
            WHERE organization_id = $1
            ORDER BY name
            "#,
        )
        .bind(organization_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list groups: {error}")))?;

        rows.into_iter().map(Group::try_from).collect()
    }

    async fn upsert_memberships(
        &self,
        group_id: GroupId,
        memberships: &[GroupMembership],
    ) -> AppResult<()> {
        keyed_rows(
            group_id,
            memberships,
            |membership| membership.group_id,
            |membership| membership.user_id,
            "group membership",
        )?;
        reject_lapsed(memberships, Utc::now())?;

        let mut transaction = self.pool.begin().await.map_err(begin_error)?;
        lock_group(&mut transaction, group_id).await?;

        for membership in memberships {
            sqlx::query(
                r#"
                INSERT INTO rbac_group_memberships (
                    group_id, user_id, added_by, granted_at, expires_at, is_active
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (group_id, user_id) DO UPDATE
                SET added_by = EXCLUDED.added_by,
                    expires_at = EXCLUDED.expires_at,
                    is_active = EXCLUDED.is_active
                "#,
            )
            .bind(group_id.as_uuid())
            .bind(membership.user_id.as_uuid())
            .bind(membership.added_by.map(|user_id| user_id.as_uuid()))
            .bind(membership.window.granted_at())
            .bind(membership.window.expires_at())
            .bind(membership.window.is_active())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                map_write_error(
                    error,
                    "persist group membership",
                    format!("membership of '{}'", membership.user_id).as_str(),
                )
            })?;
        }

        transaction.commit().await.map_err(commit_error)
    }

    async fn deactivate_memberships(
        &self,
        group_id: GroupId,
        user_ids: &[UserId],
    ) -> AppResult<u64> {
        let mut transaction = self.pool.begin().await.map_err(begin_error)?;
        lock_group(&mut transaction, group_id).await?;

        let user_ids: Vec<uuid::Uuid> = user_ids.iter().map(UserId::as_uuid).collect();
        let rows_affected = sqlx::query(
            r#"
            UPDATE rbac_group_memberships
            SET is_active = FALSE
            WHERE group_id = $1
                AND user_id = ANY($2)
                AND is_active
            "#,
        )
        .bind(group_id.as_uuid())
        .bind(user_ids)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to remove group members: {error}")))?
        .rows_affected();

        transaction.commit().await.map_err(commit_error)?;
        Ok(rows_affected)
    }

    async fn list_memberships(&self, group_id: GroupId) -> AppResult<Vec<GroupMembership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT user_id, group_id, added_by, granted_at, expires_at, is_active
            FROM rbac_group_memberships
            WHERE group_id = $1
            ORDER BY user_id
            "#,
        )
        .bind(group_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list group members: {error}")))?;

        Ok(rows.into_iter().map(GroupMembership::from).collect())
    }

    async fn replace_group_roles(
        &self,
        group_id: GroupId,
        grants: &[GroupRoleGrant],
    ) -> AppResult<()> {
        keyed_rows(
            group_id,
            grants,
            |grant| grant.group_id,
            |grant| grant.role_id,
            "group role",
        )?;

        let mut transaction = self.pool.begin().await.map_err(begin_error)?;
        lock_group(&mut transaction, group_id).await?;
        let role_ids: Vec<RoleId> = grants.iter().map(|grant| grant.role_id).collect();
        require_active_roles(&mut transaction, &role_ids).await?;

        sqlx::query("DELETE FROM rbac_group_roles WHERE group_id = $1")
            .bind(group_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to clear group roles: {error}")))?;

        for grant in grants {
            sqlx::query(
                r#"
                INSERT INTO rbac_group_roles (
                    group_id, role_id, assigned_by, granted_at, expires_at, is_active
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(group_id.as_uuid())
            .bind(grant.role_id.as_uuid())
            .bind(grant.assigned_by.map(|user_id| user_id.as_uuid()))
            .bind(grant.window.granted_at())
            .bind(grant.window.expires_at())
            .bind(grant.window.is_active())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                map_write_error(
                    error,
                    "persist group role",
                    format!("group role '{}'", grant.role_id).as_str(),
                )
            })?;
        }

        transaction.commit().await.map_err(commit_error)
    }

    async fn replace_group_permissions(
        &self,
        group_id: GroupId,
        grants: &[GroupPermissionGrant],
    ) -> AppResult<()> {
        keyed_rows(
            group_id,
            grants,
            |grant| grant.group_id,
            |grant| grant.permission_id,
            "group permission",
        )?;

        let mut transaction = self.pool.begin().await.map_err(begin_error)?;
        lock_group(&mut transaction, group_id).await?;
        let permission_ids: Vec<PermissionId> =
            grants.iter().map(|grant| grant.permission_id).collect();
        require_active_permissions(&mut transaction, &permission_ids).await?;

        sqlx::query("DELETE FROM rbac_group_permissions WHERE group_id = $1")
            .bind(group_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear group permissions: {error}"))
            })?;

        for grant in grants {
            sqlx::query(
                r#"
                INSERT INTO rbac_group_permissions (
                    group_id, permission_id, granted_by, granted_at, expires_at, is_active
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(group_id.as_uuid())
            .bind(grant.permission_id.as_uuid())
            .bind(grant.granted_by.map(|user_id| user_id.as_uuid()))
            .bind(grant.window.granted_at())
            .bind(grant.window.expires_at())
            .bind(grant.window.is_active())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                map_write_error(
                    error,
                    "persist group permission",
                    format!("group permission '{}'", grant.permission_id).as_str(),
                )
            })?;
        }

        transaction.commit().await.map_err(commit_error)
    }
}
