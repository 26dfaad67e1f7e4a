//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod access_map;
mod catalog_seed;
mod grant;
mod group;
mod ids;
mod permission;
mod resolution;
mod role;
mod scope;

pub use access_map::{AccessRequirement, ProtectedResource, ResourceAccessMap, ResourceAction};
pub use catalog_seed::{
    PermissionSelector, SYSTEM_ROLE_SEEDS, SystemRoleSeed, default_permission_drafts,
};
pub use grant::{
    GrantWindow, GroupMembership, GroupPermissionGrant, GroupRoleGrant, RolePermissionGrant,
    UserPermissionGrant, UserRoleGrant,
};
pub use group::Group;
pub use ids::{GroupId, PermissionId, RoleId};
pub use permission::{Permission, PermissionDraft, PermissionType, validate_codename};
pub use resolution::{GroupGrants, GroupSummary, Granted, PrincipalGrantGraph, RoleSummary};
pub use role::{OrganizationRole, Role, RoleDraft, RoleType};
pub use scope::ScopedResource;
