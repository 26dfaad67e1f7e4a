use std::collections::BTreeMap;

use warden_application::AuthorizationRepository;
use warden_domain::{GroupGrants, Granted, PrincipalGrantGraph};

use super::*;

#[derive(Debug, FromRow)]
struct GrantedPermissionRow {
    owner_id: uuid::Uuid,
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    grant_active: bool,
    #[sqlx(flatten)]
    permission: PermissionRow,
}

impl GrantedPermissionRow {
    fn into_granted(self) -> AppResult<(uuid::Uuid, Granted<Permission>)> {
        let window = GrantWindow::restore(self.granted_at, self.expires_at, self.grant_active);
        Ok((
            self.owner_id,
            Granted::new(window, Permission::try_from(self.permission)?),
        ))
    }
}

#[derive(Debug, FromRow)]
struct GrantedRoleRow {
    owner_id: uuid::Uuid,
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    grant_active: bool,
    #[sqlx(flatten)]
    role: RoleRow,
}

impl GrantedRoleRow {
    fn into_granted(self) -> AppResult<(uuid::Uuid, Granted<Role>)> {
        let window = GrantWindow::restore(self.granted_at, self.expires_at, self.grant_active);
        Ok((self.owner_id, Granted::new(window, Role::try_from(self.role)?)))
    }
}

#[derive(Debug, FromRow)]
struct MembershipGroupRow {
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    grant_active: bool,
    #[sqlx(flatten)]
    group: GroupRow,
}

#[derive(Debug, FromRow)]
struct RolePermissionRow {
    role_id: uuid::Uuid,
    #[sqlx(flatten)]
    permission: PermissionRow,
}

fn group_by_owner<T>(
    rows: Vec<(uuid::Uuid, Granted<T>)>,
) -> BTreeMap<uuid::Uuid, Vec<Granted<T>>> {
    let mut grouped: BTreeMap<uuid::Uuid, Vec<Granted<T>>> = BTreeMap::new();
    for (owner_id, granted) in rows {
        grouped.entry(owner_id).or_default().push(granted);
    }
    grouped
}

#[async_trait]
impl AuthorizationRepository for PostgresRbacRepository {
    async fn load_grant_graph(&self, user_id: UserId) -> AppResult<PrincipalGrantGraph> {
        let mut transaction = self.pool.begin().await.map_err(begin_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to configure snapshot: {error}"))
            })?;

        let direct_permissions = sqlx::query_as::<_, GrantedPermissionRow>(
            r#"
            SELECT
                grants.user_id AS owner_id,
                grants.granted_at,
                grants.expires_at,
                grants.is_active AS grant_active,
                permissions.id,
                permissions.codename,
                permissions.name,
                permissions.description,
                permissions.permission_type,
                permissions.resource,
                permissions.is_active,
                permissions.created_at
            FROM rbac_user_permissions AS grants
            INNER JOIN rbac_permissions AS permissions
                ON permissions.id = grants.permission_id
            WHERE grants.user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load user permissions: {error}"))
        })?
        .into_iter()
        .map(|row| row.into_granted().map(|(_, granted)| granted))
        .collect::<AppResult<Vec<_>>>()?;

        let direct_roles = sqlx::query_as::<_, GrantedRoleRow>(
            r#"
            SELECT
                grants.user_id AS owner_id,
                grants.granted_at,
                grants.expires_at,
                grants.is_active AS grant_active,
                roles.id,
                roles.name,
                roles.codename,
                roles.description,
                roles.role_type,
                roles.organization_id,
                roles.is_system_role,
                roles.is_active,
                roles.created_at
            FROM rbac_user_roles AS grants
            INNER JOIN rbac_roles AS roles
                ON roles.id = grants.role_id
            WHERE grants.user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load user roles: {error}")))?
        .into_iter()
        .map(|row| row.into_granted().map(|(_, granted)| granted))
        .collect::<AppResult<Vec<_>>>()?;

        let membership_rows = sqlx::query_as::<_, MembershipGroupRow>(
            r#"
            SELECT
                memberships.granted_at,
                memberships.expires_at,
                memberships.is_active AS grant_active,
                groups.id,
                groups.name,
                groups.description,
                groups.organization_id,
                groups.created_by,
                groups.is_active,
                groups.created_at
            FROM rbac_group_memberships AS memberships
            INNER JOIN rbac_groups AS groups
                ON groups.id = memberships.group_id
            WHERE memberships.user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load memberships: {error}")))?;
        let group_ids: Vec<uuid::Uuid> = membership_rows.iter().map(|row| row.group.id).collect();

        let group_permission_rows = sqlx::query_as::<_, GrantedPermissionRow>(
            r#"
            SELECT
                grants.group_id AS owner_id,
                grants.granted_at,
                grants.expires_at,
                grants.is_active AS grant_active,
                permissions.id,
                permissions.codename,
                permissions.name,
                permissions.description,
                permissions.permission_type,
                permissions.resource,
                permissions.is_active,
                permissions.created_at
            FROM rbac_group_permissions AS grants
            INNER JOIN rbac_permissions AS permissions
                ON permissions.id = grants.permission_id
            WHERE grants.group_id = ANY($1)
            "#,
        )
        .bind(&group_ids)
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load group permissions: {error}"))
        })?
        .into_iter()
        .map(GrantedPermissionRow::into_granted)
        .collect::<AppResult<Vec<_>>>()?;

        let group_role_rows = sqlx::query_as::<_, GrantedRoleRow>(
            r#"
            SELECT
                grants.group_id AS owner_id,
                grants.granted_at,
                grants.expires_at,
                grants.is_active AS grant_active,
                roles.id,
                roles.name,
                roles.codename,
                roles.description,
                roles.role_type,
                roles.organization_id,
                roles.is_system_role,
                roles.is_active,
                roles.created_at
            FROM rbac_group_roles AS grants
            INNER JOIN rbac_roles AS roles
                ON roles.id = grants.role_id
            WHERE grants.group_id = ANY($1)
            "#,
        )
        .bind(&group_ids)
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load group roles: {error}")))?
        .into_iter()
        .map(GrantedRoleRow::into_granted)
        .collect::<AppResult<Vec<_>>>()?;

        let mut permissions_by_group = group_by_owner(group_permission_rows);
        let mut roles_by_group = group_by_owner(group_role_rows);
        let memberships = membership_rows
            .into_iter()
            .map(|row| {
                let group_id = row.group.id;
                let window = GrantWindow::restore(row.granted_at, row.expires_at, row.grant_active);
                Ok(GroupGrants {
                    membership: Granted::new(window, Group::try_from(row.group)?),
                    permissions: permissions_by_group.remove(&group_id).unwrap_or_default(),
                    roles: roles_by_group.remove(&group_id).unwrap_or_default(),
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let role_ids: Vec<uuid::Uuid> = direct_roles
            .iter()
            .chain(memberships.iter().flat_map(|grants| grants.roles.iter()))
            .map(|granted| granted.item.id().as_uuid())
            .collect();
        let role_permission_rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT
                role_permissions.role_id,
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
            WHERE role_permissions.role_id = ANY($1)
            "#,
        )
        .bind(&role_ids)
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load role permissions: {error}"))
        })?;

        transaction.commit().await.map_err(commit_error)?;

        let mut role_permissions: BTreeMap<RoleId, Vec<Permission>> = BTreeMap::new();
        for row in role_permission_rows {
            role_permissions
                .entry(RoleId::from_uuid(row.role_id))
                .or_default()
                .push(Permission::try_from(row.permission)?);
        }

        Ok(PrincipalGrantGraph {
            direct_permissions,
            direct_roles,
            memberships,
            role_permissions,
        })
    }
}
