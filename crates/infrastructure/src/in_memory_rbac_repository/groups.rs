use chrono::Utc;
use warden_application::GroupRepository;
use warden_core::OrganizationId;
use warden_domain::{GrantWindow, ScopedResource};

use super::*;

#[async_trait]
impl GroupRepository for InMemoryRbacRepository {
    async fn save_group(&self, group: Group) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.groups.values().any(|existing| {
            existing.name() == group.name() && existing.organization_id() == group.organization_id()
        }) {
            return Err(AppError::Conflict(format!(
                "group '{}' already exists in organization '{}'",
                group.name(),
                group.organization_id()
            )));
        }

        tables.groups.insert(group.id(), group);
        Ok(())
    }

    async fn find_group(&self, group_id: GroupId) -> AppResult<Option<Group>> {
        Ok(self.tables.read().await.groups.get(&group_id).cloned())
    }

    async fn list_groups(&self, organization_id: OrganizationId) -> AppResult<Vec<Group>> {
        let tables = self.tables.read().await;
        let mut values: Vec<Group> = tables
            .groups
            .values()
            .filter(|group| group.organization_id() == organization_id)
            .cloned()
            .collect();
        values.sort_by(|left, right| left.name().cmp(right.name()));

        Ok(values)
    }

    async fn upsert_memberships(
        &self,
        group_id: GroupId,
        memberships: &[GroupMembership],
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.require_group(group_id)?;
        let mut rows = keyed_rows(
            group_id,
            memberships,
            |membership| membership.group_id,
            |membership| membership.user_id,
            "group membership",
        )?;

        let now = Utc::now();
        for (key, membership) in &mut rows {
            if membership.window.is_expired_at(now) {
                return Err(AppError::Validation(format!(
                    "membership of '{}' would already be expired",
                    membership.user_id
                )));
            }
            if let Some(existing) = tables.memberships.get(key) {
                membership.window = GrantWindow::restore(
                    existing.window.granted_at(),
                    membership.window.expires_at(),
                    membership.window.is_active(),
                );
            }
        }

        tables.memberships.extend(rows);
        Ok(())
    }

    async fn deactivate_memberships(
        &self,
        group_id: GroupId,
        user_ids: &[UserId],
    ) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        tables.require_group(group_id)?;

        let mut changed = 0;
        for user_id in user_ids {
            if let Some(membership) = tables.memberships.get_mut(&(group_id, *user_id))
                && membership.window.is_active()
            {
                membership.window.deactivate();
                changed += 1;
            }
        }

        Ok(changed)
    }

    async fn list_memberships(&self, group_id: GroupId) -> AppResult<Vec<GroupMembership>> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .filter(|((stored_group_id, _), _)| *stored_group_id == group_id)
            .map(|(_, membership)| membership.clone())
            .collect())
    }

    async fn replace_group_roles(
        &self,
        group_id: GroupId,
        grants: &[GroupRoleGrant],
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.require_group(group_id)?;
        let replacement = keyed_rows(
            group_id,
            grants,
            |grant| grant.group_id,
            |grant| grant.role_id,
            "group role",
        )?;
        for grant in grants {
            tables.check_role_reference(grant.role_id)?;
        }

        tables
            .group_roles
            .retain(|(stored_group_id, _), _| *stored_group_id != group_id);
        tables.group_roles.extend(replacement);
        Ok(())
    }

    async fn replace_group_permissions(
        &self,
        group_id: GroupId,
        grants: &[GroupPermissionGrant],
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.require_group(group_id)?;
        let replacement = keyed_rows(
            group_id,
            grants,
            |grant| grant.group_id,
            |grant| grant.permission_id,
            "group permission",
        )?;
        for grant in grants {
            tables.check_permission_reference(grant.permission_id)?;
        }

        tables
            .group_permissions
            .retain(|(stored_group_id, _), _| *stored_group_id != group_id);
        tables.group_permissions.extend(replacement);
        Ok(())
    }
}
