mod common;

use chrono::Duration;
use gmao_core::db::open_db_in_memory;
use gmao_core::model::user::{NewUser, RoleInput};
use gmao_core::repo::rbac_repo::SqliteRbacRepository;
use gmao_core::service::auth_service::{AuthService, ADMIN_ROLE_NAME};
use gmao_core::{Action, Permission, Resource, ServiceError};
use uuid::Uuid;

fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        name: "Chef atelier".to_string(),
        password: "s3cret-pass".to_string(),
    }
}

#[test]
fn login_opens_a_session_that_resolves_to_permissions() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(SqliteRbacRepository::new(&conn));

    let user = auth.register_user(&new_user("Chef@Mine.dz")).unwrap();
    assert_eq!(user.email, "chef@mine.dz");

    let role = auth
        .create_role(&RoleInput {
            name: "saisie".to_string(),
            description: None,
        })
        .unwrap();
    auth.set_role_permissions(
        role.id,
        &[
            Permission::new(Action::Create, Resource::Saisiehrm),
            Permission::new(Action::Read, Resource::Report),
        ],
    )
    .unwrap();
    auth.assign_role(user.id, role.id).unwrap();

    let session = auth.authenticate("chef@mine.dz", "s3cret-pass").unwrap();
    let caller = auth.resolve_session(session.token).unwrap();

    assert_eq!(caller.user.id, user.id);
    assert!(caller.require(Action::Create, Resource::Saisiehrm).is_ok());
    assert!(matches!(
        caller.require(Action::Delete, Resource::Engin),
        Err(ServiceError::Forbidden(_))
    ));
}

#[test]
fn bad_credentials_fail_uniformly() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(SqliteRbacRepository::new(&conn));
    let user = auth.register_user(&new_user("chef@mine.dz")).unwrap();

    assert!(matches!(
        auth.authenticate("chef@mine.dz", "wrong-pass"),
        Err(ServiceError::Unauthorized)
    ));
    assert!(matches!(
        auth.authenticate("nobody@mine.dz", "s3cret-pass"),
        Err(ServiceError::Unauthorized)
    ));

    auth.set_user_active(user.id, false).unwrap();
    assert!(matches!(
        auth.authenticate("chef@mine.dz", "s3cret-pass"),
        Err(ServiceError::Unauthorized)
    ));
}

#[test]
fn deactivating_a_user_invalidates_open_sessions() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(SqliteRbacRepository::new(&conn));
    let user = auth.register_user(&new_user("chef@mine.dz")).unwrap();
    let session = auth.authenticate("chef@mine.dz", "s3cret-pass").unwrap();

    auth.set_user_active(user.id, false).unwrap();
    assert!(matches!(
        auth.resolve_session(session.token),
        Err(ServiceError::Unauthorized)
    ));
}

#[test]
fn expired_and_logged_out_sessions_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let expiring = AuthService::with_session_ttl(
        SqliteRbacRepository::new(&conn),
        Duration::milliseconds(-1),
    );
    expiring.register_user(&new_user("chef@mine.dz")).unwrap();
    let stale = expiring.authenticate("chef@mine.dz", "s3cret-pass").unwrap();
    assert!(matches!(
        expiring.resolve_session(stale.token),
        Err(ServiceError::Unauthorized)
    ));
    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM sessions;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);

    let auth = AuthService::new(SqliteRbacRepository::new(&conn));
    let session = auth.authenticate("chef@mine.dz", "s3cret-pass").unwrap();
    auth.logout(session.token).unwrap();
    auth.logout(Uuid::new_v4()).unwrap();
    assert!(matches!(
        auth.resolve_session(session.token),
        Err(ServiceError::Unauthorized)
    ));
}

#[test]
fn bootstrap_admin_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(SqliteRbacRepository::new(&conn));

    let first = auth.bootstrap_admin("admin@mine.dz", "admin-pass-1").unwrap();
    let second = auth.bootstrap_admin("admin@mine.dz", "ignored-pass").unwrap();
    assert_eq!(first.id, second.id);

    let roles = auth.list_roles().unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].role.name, ADMIN_ROLE_NAME);
    assert_eq!(
        roles[0].permissions,
        vec![Permission::new(Action::Manage, Resource::All)]
    );

    auth.authenticate("admin@mine.dz", "admin-pass-1").unwrap();
    let session = auth.authenticate("admin@mine.dz", "admin-pass-1").unwrap();
    let admin = auth.resolve_session(session.token).unwrap();
    assert!(admin.require(Action::Delete, Resource::Engin).is_ok());
    assert!(admin.require(Action::Update, Resource::Role).is_ok());
}

#[test]
fn revoking_a_role_drops_its_permissions() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(SqliteRbacRepository::new(&conn));
    let user = auth.register_user(&new_user("chef@mine.dz")).unwrap();
    let role = auth
        .create_role(&RoleInput {
            name: "lecteur".to_string(),
            description: Some("Lecture seule".to_string()),
        })
        .unwrap();
    auth.set_role_permissions(role.id, &[Permission::new(Action::Read, Resource::All)])
        .unwrap();
    auth.assign_role(user.id, role.id).unwrap();
    assert_eq!(auth.user_roles(user.id).unwrap().len(), 1);

    auth.revoke_role(user.id, role.id).unwrap();
    let session = auth.authenticate("chef@mine.dz", "s3cret-pass").unwrap();
    let caller = auth.resolve_session(session.token).unwrap();
    assert!(caller.permissions.is_empty());
    assert!(auth.user_roles(user.id).unwrap().is_empty());
}

#[test]
fn duplicate_email_is_a_conflict() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(SqliteRbacRepository::new(&conn));
    auth.register_user(&new_user("chef@mine.dz")).unwrap();

    let err = auth.register_user(&new_user("CHEF@mine.dz")).unwrap_err();
    assert!(matches!(err, ServiceError::Conflict { entity: "user", .. }));
}
