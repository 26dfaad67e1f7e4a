use warden_core::OrganizationId;
use warden_domain::RoleType;

/// Filter for permission catalog listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionQuery {
    /// Optional resource filter.
    pub resource: Option<String>,
    /// Whether to return only active permissions.
    pub active_only: bool,
}

impl PermissionQuery {
    /// Active permissions, optionally restricted to one resource.
    #[must_use]
    pub fn active(resource: Option<&str>) -> Self {
        Self {
            resource: resource.map(str::to_owned),
            active_only: true,
        }
    }
}

/// Input payload for defining a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Display name.
    pub name: String,
    /// Codename, unique per organization.
    pub codename: String,
    /// Free-form description.
    pub description: String,
    /// Ownership class.
    pub role_type: RoleType,
    /// Owning organization; `None` exactly for system roles.
    pub organization_id: Option<OrganizationId>,
}

/// Input payload for defining a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateGroupInput {
    /// Name, unique within the organization.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Owning organization.
    pub organization_id: OrganizationId,
}

/// Rows soft-disabled by one expired-grant sweep, per relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiredGrantSweep {
    /// User-role rows.
    pub user_roles: u64,
    /// User-permission rows.
    pub user_permissions: u64,
    /// Group-permission rows.
    pub group_permissions: u64,
    /// Group membership rows.
    pub memberships: u64,
    /// Group-role rows.
    pub group_roles: u64,
}

impl ExpiredGrantSweep {
    /// Total rows touched.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.user_roles
            + self.user_permissions
            + self.group_permissions
            + self.memberships
            + self.group_roles
    }
}
