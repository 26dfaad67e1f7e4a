//! Application services and ports.

#![forbid(unsafe_code)]

mod authorization_service;
mod catalog_bootstrap_service;
mod grant_maintenance_service;
mod rbac_admin_service;
mod rbac_ports;

#[cfg(test)]
mod test_support;

pub use authorization_service::{AuthorizationService, PermissionDetails, satisfies};
pub use catalog_bootstrap_service::{CatalogBootstrapService, SeedReport};
pub use grant_maintenance_service::GrantMaintenanceService;
pub use rbac_admin_service::RbacAdminService;
pub use rbac_ports::{
    AuthorizationRepository, CreateGroupInput, CreateRoleInput, ExpiredGrantSweep,
    GrantMaintenanceRepository, GroupRepository, PermissionCatalogRepository, PermissionQuery,
    RoleRepository, UserAssignmentRepository,
};
