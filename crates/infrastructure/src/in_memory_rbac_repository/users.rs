use chrono::{DateTime, Utc};
use warden_application::{ExpiredGrantSweep, GrantMaintenanceRepository, UserAssignmentRepository};
use warden_domain::GrantWindow;

use super::*;

#[async_trait]
impl UserAssignmentRepository for InMemoryRbacRepository {
    async fn replace_user_roles(&self, user_id: UserId, grants: &[UserRoleGrant]) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let replacement = keyed_rows(
            user_id,
            grants,
            |grant| grant.user_id,
            |grant| grant.role_id,
            "user role",
        )?;
        for grant in grants {
            tables.check_role_reference(grant.role_id)?;
        }

        tables
            .user_roles
            .retain(|(stored_user_id, _), _| *stored_user_id != user_id);
        tables.user_roles.extend(replacement);
        Ok(())
    }

    async fn replace_user_permissions(
        &self,
        user_id: UserId,
        grants: &[UserPermissionGrant],
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let replacement = keyed_rows(
            user_id,
            grants,
            |grant| grant.user_id,
            |grant| grant.permission_id,
            "user permission",
        )?;
        for grant in grants {
            tables.check_permission_reference(grant.permission_id)?;
        }

        tables
            .user_permissions
            .retain(|(stored_user_id, _), _| *stored_user_id != user_id);
        tables.user_permissions.extend(replacement);
        Ok(())
    }

    async fn upsert_user_role(&self, grant: UserRoleGrant) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.check_role_reference(grant.role_id)?;
        tables
            .user_roles
            .insert((grant.user_id, grant.role_id), grant);
        Ok(())
    }
}

fn deactivate_expired<'a>(
    windows: impl Iterator<Item = &'a mut GrantWindow>,
    now: DateTime<Utc>,
) -> u64 {
    let mut changed = 0;
    for window in windows {
        if window.is_active() && window.is_expired_at(now) {
            window.deactivate();
            changed += 1;
        }
    }
    changed
}

#[async_trait]
impl GrantMaintenanceRepository for InMemoryRbacRepository {
    async fn deactivate_expired_grants(&self, now: DateTime<Utc>) -> AppResult<ExpiredGrantSweep> {
        let mut tables = self.tables.write().await;
        Ok(ExpiredGrantSweep {
            user_roles: deactivate_expired(
                tables.user_roles.values_mut().map(|grant| &mut grant.window),
                now,
            ),
            user_permissions: deactivate_expired(
                tables
                    .user_permissions
                    .values_mut()
                    .map(|grant| &mut grant.window),
                now,
            ),
            group_permissions: deactivate_expired(
                tables
                    .group_permissions
                    .values_mut()
                    .map(|grant| &mut grant.window),
                now,
            ),
            memberships: deactivate_expired(
                tables
                    .memberships
                    .values_mut()
                    .map(|membership| &mut membership.window),
                now,
            ),
            group_roles: deactivate_expired(
                tables.group_roles.values_mut().map(|grant| &mut grant.window),
                now,
            ),
        })
    }
}
