mod queries;
mod repositories;

pub use queries::{CreateGroupInput, CreateRoleInput, ExpiredGrantSweep, PermissionQuery};
pub use repositories::{
    AuthorizationRepository, GrantMaintenanceRepository, GroupRepository,
    PermissionCatalogRepository, RoleRepository, UserAssignmentRepository,
};
