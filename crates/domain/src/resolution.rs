use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::OrganizationId;

use crate::{GrantWindow, Group, GroupId, Permission, Role, RoleId, RoleType, ScopedResource};

/// Catalog entity reached through an expiring grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Granted<T> {
    /// Validity of the grant that reached the entity.
    pub window: GrantWindow,
    /// The granted entity.
    pub item: T,
}

impl<T> Granted<T> {
    /// Pairs an entity with the window of the grant that reached it.
    pub fn new(window: GrantWindow, item: T) -> Self {
        Self { window, item }
    }
}

/// One group membership of the principal with everything the group itself holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupGrants {
    /// Membership window and the group.
    pub membership: Granted<Group>,
    /// Direct permission grants of the group.
    pub permissions: Vec<Granted<Permission>>,
    /// Role grants of the group.
    pub roles: Vec<Granted<Role>>,
}

/// Everything reachable from one principal, loaded without filtering.
///
/// Filtering by activity, expiry and scope happens here so every store feeds
/// the same predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalGrantGraph {
    /// User-permission grants.
    pub direct_permissions: Vec<Granted<Permission>>,
    /// User-role grants.
    pub direct_roles: Vec<Granted<Role>>,
    /// User-group memberships.
    pub memberships: Vec<GroupGrants>,
    /// Structural permissions of every role referenced above.
    pub role_permissions: BTreeMap<RoleId, Vec<Permission>>,
}

/// Display projection of a role held by a principal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleSummary {
    /// Role codename.
    pub codename: String,
    /// Role identifier.
    pub id: RoleId,
    /// Role name.
    pub name: String,
    /// Ownership class.
    pub role_type: RoleType,
    /// Owning organization, `None` for system roles.
    pub organization_id: Option<OrganizationId>,
}

impl From<&Role> for RoleSummary {
    fn from(role: &Role) -> Self {
        Self {
            codename: role.codename().to_owned(),
            id: role.id(),
            name: role.name().to_owned(),
            role_type: role.role_type(),
            organization_id: role.organization_id(),
        }
    }
}

/// Display projection of a group the principal belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Group name.
    pub name: String,
    /// Group identifier.
    pub id: GroupId,
    /// Owning organization.
    pub organization_id: OrganizationId,
}

impl From<&Group> for GroupSummary {
    fn from(group: &Group) -> Self {
        Self {
            name: group.name().to_owned(),
            id: group.id(),
            organization_id: group.organization_id(),
        }
    }
}

impl PrincipalGrantGraph {
    /// Union of the four resolution paths.
    #[must_use]
    pub fn effective_permissions(
        &self,
        scope: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> BTreeSet<String> {
        let mut codenames = self.direct_permission_codenames(now);
        codenames.extend(self.direct_role_codenames(scope, now));
        codenames.extend(self.group_permission_codenames(scope, now));
        codenames.extend(self.group_role_codenames(scope, now));
        codenames
    }

    /// Codenames the principal holds in every organization at once.
    ///
    /// Only direct permissions and directly held system roles count; anything
    /// reached through an organization role or a group is tenant-bound.
    #[must_use]
    pub fn platform_permissions(&self, now: DateTime<Utc>) -> BTreeSet<String> {
        let mut codenames = self.direct_permission_codenames(now);
        codenames.extend(
            self.effective_roles(&self.direct_roles, None, now)
                .filter(|role| role.role_type() == RoleType::System)
                .flat_map(|role| self.role_codenames(role.id())),
        );
        codenames
    }

    /// Path 1: active, unexpired user-permission grants of active permissions.
    ///
    /// Permissions are global, so no scope filter applies.
    #[must_use]
    pub fn direct_permission_codenames(&self, now: DateTime<Utc>) -> BTreeSet<String> {
        effective_permission_codenames(&self.direct_permissions, now)
    }

    /// Path 2: permissions of roles assigned directly to the principal.
    #[must_use]
    pub fn direct_role_codenames(
        &self,
        scope: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> BTreeSet<String> {
        self.effective_roles(&self.direct_roles, scope, now)
            .flat_map(|role| self.role_codenames(role.id()))
            .collect()
    }

    /// Path 3: direct permission grants of the principal's groups.
    #[must_use]
    pub fn group_permission_codenames(
        &self,
        scope: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> BTreeSet<String> {
        self.effective_memberships(scope, now)
            .flat_map(|grants| effective_permission_codenames(&grants.permissions, now))
            .collect()
    }

    /// Path 4: permissions of roles reached through the principal's groups.
    #[must_use]
    pub fn group_role_codenames(
        &self,
        scope: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> BTreeSet<String> {
        self.effective_memberships(scope, now)
            .flat_map(|grants| self.effective_roles(&grants.roles, scope, now))
            .flat_map(|role| self.role_codenames(role.id()))
            .collect()
    }

    /// Roles assigned directly to the principal, under the same filters as path 2.
    #[must_use]
    pub fn visible_roles(
        &self,
        scope: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> Vec<RoleSummary> {
        let summaries: BTreeSet<RoleSummary> = self
            .effective_roles(&self.direct_roles, scope, now)
            .map(RoleSummary::from)
            .collect();
        summaries.into_iter().collect()
    }

    /// Groups of the principal, under the same filters as path 3.
    #[must_use]
    pub fn visible_groups(
        &self,
        scope: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> Vec<GroupSummary> {
        let summaries: BTreeSet<GroupSummary> = self
            .effective_memberships(scope, now)
            .map(|grants| GroupSummary::from(&grants.membership.item))
            .collect();
        summaries.into_iter().collect()
    }

    fn effective_roles<'a>(
        &'a self,
        grants: &'a [Granted<Role>],
        scope: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a Role> + 'a {
        grants
            .iter()
            .filter(move |grant| grant.window.is_effective_at(now))
            .map(|grant| &grant.item)
            .filter(move |role| role.is_active() && role.applies_in_scope(scope))
    }

    fn effective_memberships(
        &self,
        scope: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = &GroupGrants> + '_ {
        self.memberships.iter().filter(move |grants| {
            let group = &grants.membership.item;
            grants.membership.window.is_effective_at(now)
                && group.is_active()
                && group.visible_in_scope(scope)
        })
    }

    fn role_codenames(&self, role_id: RoleId) -> impl Iterator<Item = String> + '_ {
        self.role_permissions
            .get(&role_id)
            .into_iter()
            .flatten()
            .filter(|permission| permission.is_active())
            .map(|permission| permission.codename().to_owned())
    }
}

fn effective_permission_codenames(
    grants: &[Granted<Permission>],
    now: DateTime<Utc>,
) -> BTreeSet<String> {
    grants
        .iter()
        .filter(|grant| grant.window.is_effective_at(now) && grant.item.is_active())
        .map(|grant| grant.item.codename().to_owned())
        .collect()
}
