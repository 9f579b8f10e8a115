/// Integration tests for login sessions

mod common;
use serial_test::serial;

use canvass::orm::sessions;
use canvass::session::{
    authenticate_by_uuid, get_sess, new_session, reap_expired_sessions, remove_session, Session,
};
use chrono::{Duration, Utc};
use common::*;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use uuid::Uuid;

#[actix_rt::test]
#[serial]
async fn test_new_session_authenticates() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let user = create_test_user(&db, "erin", "password123").await.unwrap();

    let uuid = new_session(&db, get_sess(), user.id).await.unwrap();
    let session = authenticate_by_uuid(&db, get_sess(), uuid)
        .await
        .expect("session should be valid");
    assert_eq!(session.user_id, user.id);
    assert!(!session.is_expired());

    // Falls back to the database when the cache is cold.
    get_sess().remove(&uuid);
    let session = authenticate_by_uuid(&db, get_sess(), uuid).await;
    assert_eq!(session.map(|s| s.user_id), Some(user.id));

    assert!(authenticate_by_uuid(&db, get_sess(), Uuid::new_v4()).await.is_none());
}

#[actix_rt::test]
#[serial]
async fn test_remove_session() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let user = create_test_user(&db, "frank", "password123").await.unwrap();

    let uuid = new_session(&db, get_sess(), user.id).await.unwrap();
    remove_session(&db, get_sess(), uuid).await.unwrap();

    assert!(get_sess().get(&uuid).is_none());
    assert!(authenticate_by_uuid(&db, get_sess(), uuid).await.is_none());
    assert_eq!(sessions::Entity::find().count(&db).await.unwrap(), 0);
}

#[actix_rt::test]
#[serial]
async fn test_expired_sessions_are_rejected_and_reaped() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let user = create_test_user(&db, "grace", "password123").await.unwrap();

    let live = new_session(&db, get_sess(), user.id).await.unwrap();

    let stale = Uuid::new_v4();
    let now = Utc::now().naive_utc();
    sessions::ActiveModel {
        id: Set(stale.to_string()),
        user_id: Set(user.id),
        created_at: Set(now - Duration::hours(2)),
        expires_at: Set(now - Duration::hours(1)),
    }
    .insert(&db)
    .await
    .unwrap();
    get_sess().insert(
        stale,
        Session {
            user_id: user.id,
            expires_at: now - Duration::hours(1),
        },
    );

    assert!(authenticate_by_uuid(&db, get_sess(), stale).await.is_none());
    // Rejection also evicts the cache entry.
    assert!(get_sess().get(&stale).is_none());

    let reaped = reap_expired_sessions(&db, get_sess()).await.unwrap();
    assert_eq!(reaped, 1);
    assert_eq!(sessions::Entity::find().count(&db).await.unwrap(), 1);
    assert!(authenticate_by_uuid(&db, get_sess(), live).await.is_some());

    remove_session(&db, get_sess(), live).await.unwrap();
}
