use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use warden_core::{AppError, AppResult, OrganizationId, UserId};
use warden_domain::{
    GrantWindow, Group, GroupId, Permission, PermissionId, PermissionType, Role, RoleDraft,
    RoleId, RoleType,
};

mod catalog;
mod groups;
mod resolution;
mod users;

/// PostgreSQL-backed RBAC store implementing every repository port.
#[derive(Clone)]
pub struct PostgresRbacRepository {
    pool: PgPool,
}

impl PostgresRbacRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: uuid::Uuid,
    codename: String,
    name: String,
    description: String,
    permission_type: String,
    resource: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<PermissionRow> for Permission {
    type Error = AppError;

    fn try_from(row: PermissionRow) -> Result<Self, Self::Error> {
        let permission_type = PermissionType::from_str(row.permission_type.as_str())
            .map_err(|error| {
                AppError::Internal(format!(
                    "invalid stored permission type for '{}': {error}",
                    row.codename
                ))
            })?;

        Permission::restore(
            PermissionId::from_uuid(row.id),
            row.codename,
            row.name,
            row.description,
            permission_type,
            row.resource,
            row.is_active,
            row.created_at,
        )
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: uuid::Uuid,
    name: String,
    codename: String,
    description: String,
    role_type: String,
    organization_id: Option<uuid::Uuid>,
    is_system_role: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<RoleRow> for Role {
    type Error = AppError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        let role_type = RoleType::from_str(row.role_type.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "invalid stored role type for '{}': {error}",
                row.codename
            ))
        })?;

        Role::restore(
            RoleId::from_uuid(row.id),
            RoleDraft {
                name: row.name,
                codename: row.codename,
                description: row.description,
                role_type,
                organization_id: row.organization_id.map(OrganizationId::from_uuid),
                is_system_role: row.is_system_role,
            },
            row.is_active,
            row.created_at,
        )
    }
}

#[derive(Debug, FromRow)]
struct GroupRow {
    id: uuid::Uuid,
    name: String,
    description: String,
    organization_id: uuid::Uuid,
    created_by: Option<uuid::Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<GroupRow> for Group {
    type Error = AppError;

    fn try_from(row: GroupRow) -> Result<Self, Self::Error> {
        Group::restore(
            GroupId::from_uuid(row.id),
            row.name,
            row.description,
            OrganizationId::from_uuid(row.organization_id),
            row.created_by.map(UserId::from_uuid),
            row.is_active,
            row.created_at,
        )
    }
}

fn begin_error(error: sqlx::Error) -> AppError {
    AppError::Internal(format!("failed to begin transaction: {error}"))
}

fn commit_error(error: sqlx::Error) -> AppError {
    AppError::Internal(format!("failed to commit transaction: {error}"))
}

/// Share-locks the referenced permissions and rejects missing or inactive ones,
/// so a concurrent deactivation cannot interleave with the write.
async fn require_active_permissions(
    transaction: &mut Transaction<'_, Postgres>,
    permission_ids: &[PermissionId],
) -> AppResult<()> {
    let ids: Vec<uuid::Uuid> = permission_ids.iter().map(PermissionId::as_uuid).collect();
    let active = lock_active_rows(
        transaction,
        "SELECT id FROM rbac_permissions WHERE id = ANY($1) AND is_active FOR SHARE",
        &ids,
        "permissions",
    )
    .await?;

    match permission_ids
        .iter()
        .find(|permission_id| !active.contains(&permission_id.as_uuid()))
    {
        Some(permission_id) => Err(AppError::Validation(format!(
            "permission '{permission_id}' does not exist or is inactive"
        ))),
        None => Ok(()),
    }
}

/// Role counterpart of [`require_active_permissions`].
async fn require_active_roles(
    transaction: &mut Transaction<'_, Postgres>,
    role_ids: &[RoleId],
) -> AppResult<()> {
    let ids: Vec<uuid::Uuid> = role_ids.iter().map(RoleId::as_uuid).collect();
    let active = lock_active_rows(
        transaction,
        "SELECT id FROM rbac_roles WHERE id = ANY($1) AND is_active FOR SHARE",
        &ids,
        "roles",
    )
    .await?;

    match role_ids
        .iter()
        .find(|role_id| !active.contains(&role_id.as_uuid()))
    {
        Some(role_id) => Err(AppError::Validation(format!(
            "role '{role_id}' does not exist or is inactive"
        ))),
        None => Ok(()),
    }
}

async fn lock_active_rows(
    transaction: &mut Transaction<'_, Postgres>,
    statement: &'static str,
    ids: &[uuid::Uuid],
    kind: &str,
) -> AppResult<Vec<uuid::Uuid>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_scalar::<_, uuid::Uuid>(statement)
        .bind(ids)
        .fetch_all(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to lock {kind}: {error}")))
}

/// Maps unique violations to `Conflict` and dangling references to `Validation`.
fn map_write_error(error: sqlx::Error, action: &str, subject: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error {
        match database_error.code().as_deref() {
            Some("23505") => {
                return AppError::Conflict(format!("{subject} already exists"));
            }
            Some("23503") => {
                return AppError::Validation(format!("{subject} references an unknown row"));
            }
            Some("23514") => {
                return AppError::Validation(format!("{subject} violates a check constraint"));
            }
            _ => {}
        }
    }

    AppError::Internal(format!("failed to {action}: {error}"))
}
