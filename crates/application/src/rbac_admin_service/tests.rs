use chrono::{Duration, Utc};
use warden_core::{AppError, OrganizationId, UserId, UserIdentity};
use warden_domain::{Permission, PermissionType, Role, RoleType};

use crate::test_support::Fixture;
use crate::{CreateGroupInput, CreateRoleInput, PermissionCatalogRepository};

const ADMIN_CODENAMES: &[(&str, PermissionType)] = &[
    ("roles", PermissionType::Create),
    ("roles", PermissionType::Read),
    ("roles", PermissionType::Update),
    ("roles", PermissionType::List),
    ("groups", PermissionType::Create),
    ("groups", PermissionType::Read),
    ("groups", PermissionType::Update),
    ("groups", PermissionType::List),
    ("users", PermissionType::Update),
    ("permissions", PermissionType::Update),
];

/// Fixture with an organization-scoped administrator and a platform operator,
/// both holding every admin permission.
struct AdminSetup {
    fixture: Fixture,
    organization: OrganizationId,
    admin: UserIdentity,
    operator: UserIdentity,
    docs_read: Permission,
    docs_update: Permission,
}

async fn admin_setup() -> AdminSetup {
    let fixture = Fixture::new();
    let organization = OrganizationId::new();

    let mut admin_permissions = Vec::new();
    for (resource, permission_type) in ADMIN_CODENAMES {
        admin_permissions.push(fixture.permission(resource, *permission_type).await);
    }
    let references: Vec<&Permission> = admin_permissions.iter().collect();
    let administrator = fixture
        .role("tenant_admin", Some(organization), &references)
        .await;
    let admin = fixture
        .actor_with_role(&administrator, Some(organization))
        .await;
    let platform = fixture.role("platform_operator", None, &references).await;
    let operator = fixture.actor_with_role(&platform, None).await;

    let docs_read = fixture.permission("docs", PermissionType::Read).await;
    let docs_update = fixture.permission("docs", PermissionType::Update).await;

    AdminSetup {
        fixture,
        organization,
        admin,
        operator,
        docs_read,
        docs_update,
    }
}

fn role_input(codename: &str, organization_id: Option<OrganizationId>) -> CreateRoleInput {
    CreateRoleInput {
        name: codename.to_owned(),
        codename: codename.to_owned(),
        description: String::new(),
        role_type: if organization_id.is_some() {
            RoleType::Custom
        } else {
            RoleType::System
        },
        organization_id,
    }
}

async fn custom_role(setup: &AdminSetup, codename: &str) -> Role {
    setup
        .fixture
        .admin
        .create_role(&setup.admin, role_input(codename, Some(setup.organization)))
        .await
        .unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn role_permission_replace_all_is_idempotent() {
    let setup = admin_setup().await;
    let editor = custom_role(&setup, "editor").await;
    let ids = [setup.docs_read.id(), setup.docs_update.id()];

    for _ in 0..2 {
        let result = setup
            .fixture
            .admin
            .assign_role_permissions(&setup.admin, editor.id(), &ids)
            .await;
        assert!(result.is_ok());
    }
    let mut stored = setup.fixture.store.role_permission_ids(editor.id()).await;
    stored.sort();
    let mut expected = ids.to_vec();
    expected.sort();
    assert_eq!(stored, expected);

    let result = setup
        .fixture
        .admin
        .assign_role_permissions(&setup.admin, editor.id(), &[setup.docs_read.id()])
        .await;
    assert!(result.is_ok());
    assert_eq!(
        setup.fixture.store.role_permission_ids(editor.id()).await,
        vec![setup.docs_read.id()]
    );
}

#[tokio::test]
async fn inactive_permission_aborts_replace_without_partial_effect() {
    let setup = admin_setup().await;
    let editor = custom_role(&setup, "editor").await;
    setup
        .fixture
        .admin
        .assign_role_permissions(&setup.admin, editor.id(), &[setup.docs_read.id()])
        .await
        .unwrap_or_else(|_| unreachable!());

    setup
        .fixture
        .store
        .set_permission_active(setup.docs_update.id(), false)
        .await
        .unwrap_or_else(|_| unreachable!());

    let result = setup
        .fixture
        .admin
        .assign_role_permissions(
            &setup.admin,
            editor.id(),
            &[setup.docs_read.id(), setup.docs_update.id()],
        )
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(
        setup.fixture.store.role_permission_ids(editor.id()).await,
        vec![setup.docs_read.id()]
    );
}

#[tokio::test]
async fn duplicate_permission_ids_are_rejected() {
    let setup = admin_setup().await;
    let editor = custom_role(&setup, "editor").await;

    let result = setup
        .fixture
        .admin
        .assign_role_permissions(
            &setup.admin,
            editor.id(),
            &[setup.docs_read.id(), setup.docs_read.id()],
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn unknown_role_is_not_found() {
    let setup = admin_setup().await;
    let result = setup
        .fixture
        .admin
        .assign_role_permissions(&setup.admin, warden_domain::RoleId::new(), &[])
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn actor_without_grant_is_forbidden() {
    let setup = admin_setup().await;
    let editor = custom_role(&setup, "editor").await;
    let outsider = UserIdentity::new(UserId::new(), "Outsider", None, Some(setup.organization));

    let result = setup
        .fixture
        .admin
        .assign_role_permissions(&outsider, editor.id(), &[setup.docs_read.id()])
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn tenant_admin_cannot_edit_other_organization_role() {
    let setup = admin_setup().await;
    let foreign = setup
        .fixture
        .role("foreign", Some(OrganizationId::new()), &[])
        .await;

    let result = setup
        .fixture
        .admin
        .assign_role_permissions(&setup.admin, foreign.id(), &[setup.docs_read.id()])
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn role_ownership_invariant_and_uniqueness_are_enforced() {
    let setup = admin_setup().await;

    let mut system_with_owner = role_input("auditor", Some(setup.organization));
    system_with_owner.role_type = RoleType::System;
    let result = setup
        .fixture
        .admin
        .create_role(&setup.admin, system_with_owner)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    custom_role(&setup, "editor").await;
    let duplicate = setup
        .fixture
        .admin
        .create_role(&setup.admin, role_input("editor", Some(setup.organization)))
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn duplicate_group_name_in_organization_conflicts() {
    let setup = admin_setup().await;
    let input = CreateGroupInput {
        name: "Support".to_owned(),
        description: String::new(),
        organization_id: setup.organization,
    };

    let first = setup
        .fixture
        .admin
        .create_group(&setup.admin, input.clone())
        .await;
    assert_eq!(
        first.map(|group| group.created_by()).ok(),
        Some(Some(setup.admin.user_id()))
    );

    let second = setup.fixture.admin.create_group(&setup.admin, input).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn add_members_upserts_and_remove_soft_disables() {
    let setup = admin_setup().await;
    let group = setup.fixture.group("Support", setup.organization).await;
    let member = UserId::new();

    setup
        .fixture
        .admin
        .add_group_members(
            &setup.admin,
            group.id(),
            &[member],
            Some(Utc::now() + Duration::days(1)),
        )
        .await
        .unwrap_or_else(|_| unreachable!());
    setup
        .fixture
        .admin
        .add_group_members(&setup.admin, group.id(), &[member], None)
        .await
        .unwrap_or_else(|_| unreachable!());

    let rows = setup.fixture.store.membership_rows(group.id()).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].window.expires_at(), None);
    assert!(rows[0].window.is_active());

    let removed = setup
        .fixture
        .admin
        .remove_group_members(&setup.admin, group.id(), &[member])
        .await;
    assert_eq!(removed.ok(), Some(1));

    let rows = setup.fixture.store.membership_rows(group.id()).await;
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].window.is_active());

    let listed = setup
        .fixture
        .admin
        .list_group_members(&setup.admin, group.id())
        .await;
    assert_eq!(listed.map(|rows| rows.len()).ok(), Some(0));
}

#[tokio::test]
async fn removing_no_members_is_rejected() {
    let setup = admin_setup().await;
    let group = setup.fixture.group("Support", setup.organization).await;

    let result = setup
        .fixture
        .admin
        .remove_group_members(&setup.admin, group.id(), &[])
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn group_roles_must_be_system_or_same_organization() {
    let setup = admin_setup().await;
    let group = setup.fixture.group("Support", setup.organization).await;
    let foreign = setup
        .fixture
        .role("foreign", Some(OrganizationId::new()), &[])
        .await;
    let global = setup.fixture.role("global_viewer", None, &[]).await;
    let local = custom_role(&setup, "local").await;

    let rejected = setup
        .fixture
        .admin
        .assign_group_roles(&setup.admin, group.id(), &[foreign.id()], None)
        .await;
    assert!(matches!(rejected, Err(AppError::Validation(_))));

    let accepted = setup
        .fixture
        .admin
        .assign_group_roles(&setup.admin, group.id(), &[global.id(), local.id()], None)
        .await;
    assert!(accepted.is_ok());
}

#[tokio::test]
async fn user_role_replace_all_validates_expiry() {
    let setup = admin_setup().await;
    let first = custom_role(&setup, "first").await;
    let second = custom_role(&setup, "second").await;
    let user_id = UserId::new();

    let past = setup
        .fixture
        .admin
        .assign_user_roles(
            &setup.admin,
            user_id,
            &[first.id()],
            Some(Utc::now() - Duration::minutes(1)),
        )
        .await;
    assert!(matches!(past, Err(AppError::Validation(_))));

    setup
        .fixture
        .admin
        .assign_user_roles(&setup.admin, user_id, &[first.id()], None)
        .await
        .unwrap_or_else(|_| unreachable!());
    setup
        .fixture
        .admin
        .assign_user_roles(&setup.admin, user_id, &[second.id()], None)
        .await
        .unwrap_or_else(|_| unreachable!());

    let rows = setup.fixture.store.user_role_rows(user_id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].role_id, second.id());
}

#[tokio::test]
async fn disabling_permission_removes_it_from_effective_set() {
    let setup = admin_setup().await;
    let user_id = UserId::new();
    setup
        .fixture
        .admin
        .assign_user_permissions(&setup.operator, user_id, &[setup.docs_read.id()], None)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(
        setup
            .fixture
            .authorization
            .has_permission(user_id, "docs_read", None)
            .await
            .ok(),
        Some(true)
    );

    setup
        .fixture
        .admin
        .set_permission_active(&setup.operator, setup.docs_read.id(), false)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(
        setup
            .fixture
            .authorization
            .has_permission(user_id, "docs_read", None)
            .await
            .ok(),
        Some(false)
    );
}

#[tokio::test]
async fn role_listings_apply_scope_and_activity() {
    let setup = admin_setup().await;
    let editor = custom_role(&setup, "editor").await;
    setup.fixture.role("global_viewer", None, &[]).await;
    setup
        .fixture
        .role("foreign", Some(OrganizationId::new()), &[])
        .await;

    setup
        .fixture
        .admin
        .assign_role_permissions(
            &setup.admin,
            editor.id(),
            &[setup.docs_read.id(), setup.docs_update.id()],
        )
        .await
        .unwrap_or_else(|_| unreachable!());
    setup
        .fixture
        .store
        .set_permission_active(setup.docs_update.id(), false)
        .await
        .unwrap_or_else(|_| unreachable!());

    let permissions = setup
        .fixture
        .admin
        .list_role_permissions(&setup.admin, editor.id())
        .await
        .unwrap_or_default();
    assert_eq!(permissions.len(), 1);
    assert_eq!(permissions[0].codename(), "docs_read");

    let roles: Vec<String> = setup
        .fixture
        .admin
        .list_roles(&setup.admin, Some(setup.organization))
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|role| role.codename().to_owned())
        .collect();
    assert_eq!(
        roles,
        vec![
            "editor".to_owned(),
            "global_viewer".to_owned(),
            "platform_operator".to_owned(),
            "tenant_admin".to_owned()
        ]
    );

    let system: Vec<String> = setup
        .fixture
        .admin
        .list_system_roles(&setup.admin)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|role| role.codename().to_owned())
        .collect();
    assert_eq!(
        system,
        vec!["global_viewer".to_owned(), "platform_operator".to_owned()]
    );
}

#[tokio::test]
async fn lookup_reports_unregistered_codename() {
    let setup = admin_setup().await;

    let found = setup.fixture.admin.lookup_permission("docs_read").await;
    assert_eq!(found.map(|permission| permission.id()).ok(), Some(setup.docs_read.id()));

    let missing = setup.fixture.admin.lookup_permission("docs_publish").await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let docs = setup
        .fixture
        .admin
        .list_active_permissions(Some("docs"))
        .await
        .unwrap_or_default();
    let codenames: Vec<&str> = docs.iter().map(|permission| permission.codename()).collect();
    assert_eq!(codenames, vec!["docs_read", "docs_update"]);
}

#[tokio::test]
async fn headerless_actor_cannot_grant_roles_of_other_organization() {
    let setup = admin_setup().await;
    let secrets_read = setup.fixture.permission("secrets", PermissionType::Read).await;
    let foreign = setup
        .fixture
        .role("vault_reader", Some(OrganizationId::new()), &[&secrets_read])
        .await;
    let headerless = UserIdentity::new(setup.admin.user_id(), "Admin", None, None);

    let result = setup
        .fixture
        .admin
        .assign_user_roles(&headerless, headerless.user_id(), &[foreign.id()], None)
        .await;
    assert!(matches!(
        result,
        Err(AppError::Validation(_) | AppError::Forbidden(_))
    ));

    let effective = setup
        .fixture
        .authorization
        .effective_permissions(headerless.user_id(), foreign.organization_id())
        .await
        .unwrap_or_default();
    assert!(!effective.contains("secrets_read"));
}

#[tokio::test]
async fn tenant_admin_cannot_grant_roles_of_other_organization() {
    let setup = admin_setup().await;
    let foreign = setup
        .fixture
        .role("foreign", Some(OrganizationId::new()), &[])
        .await;

    let result = setup
        .fixture
        .admin
        .assign_user_roles(&setup.admin, UserId::new(), &[foreign.id()], None)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn tenant_admin_cannot_revoke_roles_held_in_other_organization() {
    let setup = admin_setup().await;
    let foreign = setup
        .fixture
        .role("foreign", Some(OrganizationId::new()), &[])
        .await;
    let member = setup
        .fixture
        .actor_with_role(&foreign, foreign.organization_id())
        .await;
    let local = custom_role(&setup, "local").await;

    let result = setup
        .fixture
        .admin
        .assign_user_roles(&setup.admin, member.user_id(), &[local.id()], None)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    let rows = setup.fixture.store.user_role_rows(member.user_id()).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].role_id, foreign.id());
}

#[tokio::test]
async fn headerless_actor_without_platform_grant_is_forbidden() {
    let setup = admin_setup().await;
    let headerless = UserIdentity::new(setup.admin.user_id(), "Admin", None, None);

    let result = setup
        .fixture
        .admin
        .assign_user_roles(&headerless, UserId::new(), &[], None)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn tenant_admin_cannot_change_global_state() {
    let setup = admin_setup().await;
    let shared = setup.fixture.role("user", None, &[]).await;

    let role_permissions = setup
        .fixture
        .admin
        .assign_role_permissions(&setup.admin, shared.id(), &[setup.docs_update.id()])
        .await;
    assert!(matches!(role_permissions, Err(AppError::Forbidden(_))));
    assert!(
        setup
            .fixture
            .store
            .role_permission_ids(shared.id())
            .await
            .is_empty()
    );

    let created = setup
        .fixture
        .admin
        .create_role(&setup.admin, role_input("auditor", None))
        .await;
    assert!(matches!(created, Err(AppError::Forbidden(_))));

    let system_grant = setup
        .fixture
        .admin
        .assign_user_roles(&setup.admin, UserId::new(), &[shared.id()], None)
        .await;
    assert!(matches!(system_grant, Err(AppError::Forbidden(_))));

    let direct = setup
        .fixture
        .admin
        .assign_user_permissions(&setup.admin, UserId::new(), &[setup.docs_read.id()], None)
        .await;
    assert!(matches!(direct, Err(AppError::Forbidden(_))));

    let disabled = setup
        .fixture
        .admin
        .set_permission_active(&setup.admin, setup.docs_read.id(), false)
        .await;
    assert!(matches!(disabled, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn group_grants_do_not_confer_platform_authority() {
    let setup = admin_setup().await;
    let shared = setup.fixture.role("user", None, &[]).await;
    let admins = setup.fixture.group("Admins", setup.organization).await;
    let roles_update = setup
        .fixture
        .admin
        .lookup_permission("roles_update")
        .await
        .unwrap_or_else(|_| unreachable!());
    let member = UserIdentity::new(UserId::new(), "Member", None, Some(setup.organization));

    setup
        .fixture
        .admin
        .add_group_members(&setup.admin, admins.id(), &[member.user_id()], None)
        .await
        .unwrap_or_else(|_| unreachable!());
    setup
        .fixture
        .admin
        .assign_group_permissions(&setup.admin, admins.id(), &[roles_update.id()], None)
        .await
        .unwrap_or_else(|_| unreachable!());

    let result = setup
        .fixture
        .admin
        .assign_role_permissions(&member, shared.id(), &[setup.docs_read.id()])
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn platform_operator_edits_system_roles() {
    let setup = admin_setup().await;
    let shared = setup.fixture.role("user", None, &[]).await;

    let result = setup
        .fixture
        .admin
        .assign_role_permissions(&setup.operator, shared.id(), &[setup.docs_read.id()])
        .await;
    assert!(result.is_ok());
    assert_eq!(
        setup.fixture.store.role_permission_ids(shared.id()).await,
        vec![setup.docs_read.id()]
    );

    let created = setup
        .fixture
        .admin
        .create_role(&setup.operator, role_input("auditor", None))
        .await;
    assert_eq!(
        created.map(|role| role.role_type()).ok(),
        Some(RoleType::System)
    );

    let granted = setup
        .fixture
        .admin
        .assign_user_roles(&setup.operator, UserId::new(), &[shared.id()], None)
        .await;
    assert!(granted.is_ok());
}
