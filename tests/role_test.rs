/// Integration tests for built-in roles, the admin bootstrap and role assignment

mod common;
use serial_test::serial;

use canvass::app_config::AdminConfig;
use canvass::orm::roles;
use canvass::role::{self, RoleError, ADMIN, SUPERVISOR};
use canvass::user::Profile;
use common::*;
use sea_orm::{EntityTrait, PaginatorTrait};

fn admin_config(name: &str, password: &str) -> AdminConfig {
    AdminConfig {
        name: name.to_owned(),
        password: password.to_owned(),
        email: "Root@Example.com".to_owned(),
    }
}

#[actix_rt::test]
#[serial]
async fn test_builtin_roles_are_created_once() {
    let db = setup_test_database().await.expect("Failed to set up database");

    // setup_test_database already ran it once.
    role::ensure_builtin_roles(&db).await.unwrap();
    role::ensure_builtin_roles(&db).await.unwrap();

    assert_eq!(roles::Entity::find().count(&db).await.unwrap(), 2);
    assert!(role::find_role_by_name(&db, ADMIN).await.unwrap().is_some());
    assert!(role::find_role_by_name(&db, SUPERVISOR).await.unwrap().is_some());
}

#[actix_rt::test]
#[serial]
async fn test_admin_bootstrap() {
    let db = setup_test_database().await.expect("Failed to set up database");

    let disabled = role::ensure_admin_account(&db, &admin_config("root", ""))
        .await
        .unwrap();
    assert_eq!(disabled, None);

    let config = admin_config("root", "s3cret-pass");
    let admin_id = role::ensure_admin_account(&db, &config)
        .await
        .unwrap()
        .expect("bootstrap should be enabled");
    // Running again finds the same account.
    let again = role::ensure_admin_account(&db, &config).await.unwrap();
    assert_eq!(again, Some(admin_id));

    let profile = Profile::get_by_id(&db, admin_id).await.unwrap().unwrap();
    assert_eq!(profile.name, "root");
    assert_eq!(profile.email.as_deref(), Some("root@example.com"));
    assert!(profile.has_role(ADMIN));
    assert_eq!(profile.roles.len(), 1);

    let result = canvass::web::login::login(&db, "root", "s3cret-pass").await.unwrap();
    assert_eq!(result, canvass::web::login::LoginResult::Success(admin_id));
}

#[actix_rt::test]
#[serial]
async fn test_create_and_delete_roles() {
    let db = setup_test_database().await.expect("Failed to set up database");

    let analyst = role::create_role(&db, "  Analyst ").await.unwrap();
    assert_eq!(analyst.name, "Analyst");

    assert!(matches!(
        role::create_role(&db, "analyst").await,
        Err(RoleError::Duplicate(_))
    ));
    assert!(matches!(
        role::create_role(&db, "admin").await,
        Err(RoleError::Duplicate(_))
    ));
    assert!(matches!(
        role::create_role(&db, "   ").await,
        Err(RoleError::InvalidName)
    ));
    assert!(matches!(
        role::create_role(&db, &"x".repeat(role::ROLE_NAME_MAX + 1)).await,
        Err(RoleError::InvalidName)
    ));

    let user = create_test_user_with_role(&db, "carol", "Analyst").await.unwrap();
    assert_eq!(role::roles_for_user(&db, user.id).await.unwrap(), vec!["Analyst"]);

    assert_eq!(role::delete_role(&db, analyst.id).await.unwrap(), "Analyst");
    assert!(role::roles_for_user(&db, user.id).await.unwrap().is_empty());
    assert!(matches!(
        role::delete_role(&db, analyst.id).await,
        Err(RoleError::NotFound)
    ));

    let admin = role::find_role_by_name(&db, ADMIN).await.unwrap().unwrap();
    assert!(matches!(
        role::delete_role(&db, admin.id).await,
        Err(RoleError::Protected)
    ));
}

#[actix_rt::test]
#[serial]
async fn test_set_user_roles_replaces_membership() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let user = create_test_user_with_role(&db, "dave", ADMIN).await.unwrap();
    let supervisor = role::find_role_by_name(&db, SUPERVISOR).await.unwrap().unwrap();

    // Unknown ids are ignored.
    let names = role::set_user_roles(&db, user.id, &[supervisor.id, 9999])
        .await
        .unwrap();
    assert_eq!(names, vec![SUPERVISOR.to_owned()]);
    assert_eq!(
        role::roles_for_user(&db, user.id).await.unwrap(),
        vec![SUPERVISOR.to_owned()]
    );

    role::set_user_roles(&db, user.id, &[]).await.unwrap();
    assert!(role::roles_for_user(&db, user.id).await.unwrap().is_empty());

    let listed = role::list_users_with_roles(&db).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].roles_label(), "-");
}
