//! Default permission catalog and system roles installed by bootstrap.

use crate::{Permission, PermissionDraft, PermissionType};

/// Resources receiving the full create/read/update/delete/list set, with the
/// plural used in their codenames.
const CRUD_RESOURCES: &[(&str, &str)] = &[
    ("account", "accounts"),
    ("organization", "organizations"),
    ("user", "users"),
    ("team", "teams"),
    ("role", "roles"),
    ("permission", "permissions"),
    ("group", "groups"),
    ("subscription", "subscriptions"),
];

const CRUD_TYPES: &[(PermissionType, &str)] = &[
    (PermissionType::Create, "Create"),
    (PermissionType::Read, "Read"),
    (PermissionType::Update, "Update"),
    (PermissionType::Delete, "Delete"),
    (PermissionType::List, "List"),
];

const ADMIN_PERMISSIONS: &[(&str, &str, &str)] = &[
    ("admin_access", "admin:access", "Admin access"),
    ("admin_manage", "admin:manage", "Admin management"),
];

/// Returns the default catalog in seeding order.
#[must_use]
pub fn default_permission_drafts() -> Vec<PermissionDraft> {
    let crud = CRUD_RESOURCES.iter().flat_map(|(resource, plural)| {
        CRUD_TYPES
            .iter()
            .map(move |(permission_type, verb)| PermissionDraft {
                resource: (*resource).to_owned(),
                permission_type: *permission_type,
                codename: Some(format!("{plural}_{}", permission_type.as_str())),
                name: Some(format!("{plural}:{}", permission_type.as_str())),
                description: format!("{verb} {plural}"),
            })
    });

    let admin = ADMIN_PERMISSIONS
        .iter()
        .map(|(codename, name, description)| PermissionDraft {
            resource: "admin".to_owned(),
            permission_type: PermissionType::Manage,
            codename: Some((*codename).to_owned()),
            name: Some((*name).to_owned()),
            description: (*description).to_owned(),
        });

    crud.chain(admin).collect()
}

/// Chooses which catalog permissions a seeded role receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionSelector {
    /// Every active permission.
    All,
    /// Every permission of the listed resources.
    Resources(&'static [&'static str]),
    /// Permissions of the listed resources restricted to the listed types.
    ResourcesWithTypes(&'static [&'static str], &'static [PermissionType]),
    /// Every permission of the listed types.
    Types(&'static [PermissionType]),
}

impl PermissionSelector {
    /// Returns whether an active `permission` is selected.
    #[must_use]
    pub fn matches(&self, permission: &Permission) -> bool {
        if !permission.is_active() {
            return false;
        }

        match self {
            Self::All => true,
            Self::Resources(resources) => resources.contains(&permission.resource()),
            Self::ResourcesWithTypes(resources, types) => {
                resources.contains(&permission.resource())
                    && types.contains(&permission.permission_type())
            }
            Self::Types(types) => types.contains(&permission.permission_type()),
        }
    }
}

/// Global role installed by bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemRoleSeed {
    /// Stable codename.
    pub codename: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Description.
    pub description: &'static str,
    /// Permissions granted when the role is first created.
    pub permissions: PermissionSelector,
}

/// System roles in seeding order.
pub const SYSTEM_ROLE_SEEDS: &[SystemRoleSeed] = &[
    SystemRoleSeed {
        codename: "saas_administrator",
        name: "SaaS Administrator",
        description: "Full platform access for managing accounts, organizations and global \
                      configurations",
        permissions: PermissionSelector::All,
    },
    SystemRoleSeed {
        codename: "saas_account_manager",
        name: "SaaS Account Manager",
        description: "Manages multiple organizations on behalf of enterprise accounts",
        permissions: PermissionSelector::Resources(&["account", "organization"]),
    },
    SystemRoleSeed {
        codename: "organization_administrator",
        name: "Organization Administrator",
        description: "Full administrative access within a specific organization",
        permissions: PermissionSelector::Resources(&[
            "user",
            "team",
            "role",
            "group",
            "subscription",
        ]),
    },
    SystemRoleSeed {
        codename: "team_manager",
        name: "Team Manager",
        description: "Manages team members and team-specific resources",
        permissions: PermissionSelector::ResourcesWithTypes(
            &["team", "user"],
            &[PermissionType::Read, PermissionType::Update],
        ),
    },
    SystemRoleSeed {
        codename: "user",
        name: "User",
        description: "Standard user with basic platform access based on assigned permissions",
        permissions: PermissionSelector::Types(&[PermissionType::Read]),
    },
];

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;

    use super::{PermissionSelector, SYSTEM_ROLE_SEEDS, default_permission_drafts};
    use crate::{Permission, PermissionId, PermissionType};

    fn catalog() -> Vec<Permission> {
        default_permission_drafts()
            .into_iter()
            .map(|draft| {
                Permission::new(PermissionId::new(), draft, Utc::now())
                    .unwrap_or_else(|_| unreachable!())
            })
            .collect()
    }

    fn selected(selector: PermissionSelector) -> BTreeSet<String> {
        catalog()
            .into_iter()
            .filter(|permission| selector.matches(permission))
            .map(|permission| permission.codename().to_owned())
            .collect()
    }

    #[test]
    fn default_catalog_has_unique_valid_codenames() {
        let permissions = catalog();
        let codenames: BTreeSet<&str> = permissions
            .iter()
            .map(|permission| permission.codename())
            .collect();

        assert_eq!(permissions.len(), 42);
        assert_eq!(codenames.len(), permissions.len());
        assert!(codenames.contains("users_create"));
        assert!(codenames.contains("admin_manage"));
    }

    #[test]
    fn team_manager_gets_read_and_update_on_teams_and_users() {
        let seed = SYSTEM_ROLE_SEEDS
            .iter()
            .find(|seed| seed.codename == "team_manager")
            .unwrap_or_else(|| unreachable!());

        let expected: BTreeSet<String> =
            ["teams_read", "teams_update", "users_read", "users_update"]
                .into_iter()
                .map(str::to_owned)
                .collect();
        assert_eq!(selected(seed.permissions), expected);
    }

    #[test]
    fn user_role_gets_only_read_permissions() {
        let codenames = selected(PermissionSelector::Types(&[PermissionType::Read]));
        assert_eq!(codenames.len(), 8);
        assert!(codenames.iter().all(|codename| codename.ends_with("_read")));
    }

    #[test]
    fn selectors_skip_inactive_permissions() {
        let mut permission = catalog().remove(0);
        permission.set_active(false);
        assert!(!PermissionSelector::All.matches(&permission));
    }
}
