//! Login sessions and password hashing.
//!
//! A session is a UUID stored in the signed cookie jar under `token`, backed by
//! a row in `sessions` and mirrored in an in-memory map so that most requests
//! never touch the database to authenticate.

use crate::orm::sessions;
use crate::user::Profile;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};
use chrono::{Duration, NaiveDateTime, Utc};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
use uuid::Uuid;

pub type SessionMap = DashMap<Uuid, Session>;

static ARGON2: OnceCell<Argon2<'static>> = OnceCell::new();
static SESSIONS: OnceCell<SessionMap> = OnceCell::new();

/// Cookie key holding the session UUID.
pub const TOKEN_KEY: &str = "token";

#[derive(Clone, Copy, Debug)]
pub struct Session {
    pub user_id: i32,
    pub expires_at: NaiveDateTime,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now().naive_utc()
    }
}

impl From<sessions::Model> for Session {
    fn from(model: sessions::Model) -> Self {
        Self {
            user_id: model.user_id,
            expires_at: model.expires_at,
        }
    }
}

/// Initializes the hasher and the session cache. Safe to call repeatedly.
pub fn init() {
    let _ = ARGON2.set(Argon2::default());
    let _ = SESSIONS.set(DashMap::new());
}

pub fn get_argon2() -> &'static Argon2<'static> {
    ARGON2.get_or_init(Argon2::default)
}

pub fn get_sess() -> &'static SessionMap {
    SESSIONS.get_or_init(DashMap::new)
}

/// Hashes a password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(get_argon2()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Checks a password against a PHC string. Malformed hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => get_argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::error!("verify_password: stored hash is malformed: {}", e);
            false
        }
    }
}

/// Issues a new session for `user_id` and returns its token.
pub async fn new_session(
    db: &DatabaseConnection,
    ses_map: &SessionMap,
    user_id: i32,
) -> Result<Uuid, DbErr> {
    let now = Utc::now().naive_utc();
    let timeout = crate::app_config::security().session_timeout_minutes;
    let expires_at = now + Duration::minutes(timeout as i64);
    let uuid = Uuid::new_v4();

    sessions::ActiveModel {
        id: Set(uuid.to_string()),
        user_id: Set(user_id),
        created_at: Set(now),
        expires_at: Set(expires_at),
    }
    .insert(db)
    .await?;

    ses_map.insert(
        uuid,
        Session {
            user_id,
            expires_at,
        },
    );

    Ok(uuid)
}

/// Resolves a token to a live session, consulting the cache first.
pub async fn authenticate_by_uuid(
    db: &DatabaseConnection,
    ses_map: &SessionMap,
    uuid: Uuid,
) -> Option<Session> {
    if let Some(session) = ses_map.get(&uuid).map(|s| *s) {
        if session.is_expired() {
            ses_map.remove(&uuid);
            return None;
        }
        return Some(session);
    }

    let session: Session = match sessions::Entity::find_by_id(uuid.to_string())
        .one(db)
        .await
    {
        Ok(Some(model)) => model.into(),
        Ok(None) => return None,
        Err(e) => {
            log::error!("authenticate_by_uuid: {}", e);
            return None;
        }
    };

    if session.is_expired() {
        return None;
    }

    ses_map.insert(uuid, session);
    Some(session)
}

/// Reads the session token out of the cookie jar and authenticates it.
pub async fn authenticate_by_cookie(
    cookies: &actix_session::Session,
) -> Option<(Uuid, Session)> {
    let token = match cookies.get::<String>(TOKEN_KEY) {
        Ok(Some(token)) => token,
        Ok(None) => return None,
        Err(e) => {
            log::error!("authenticate_by_cookie: {}", e);
            return None;
        }
    };
    let uuid = Uuid::parse_str(&token).ok()?;
    let db = crate::db::get_db_pool();
    authenticate_by_uuid(db, get_sess(), uuid)
        .await
        .map(|session| (uuid, session))
}

/// Returns the profile of the logged in user, if any.
pub async fn authenticate_client_by_session(cookies: &actix_session::Session) -> Option<Profile> {
    let (_, session) = authenticate_by_cookie(cookies).await?;
    match Profile::get_by_id(crate::db::get_db_pool(), session.user_id).await {
        Ok(profile) => profile,
        Err(e) => {
            log::error!("authenticate_client_by_session: {}", e);
            None
        }
    }
}

pub async fn remove_session(
    db: &DatabaseConnection,
    ses_map: &SessionMap,
    uuid: Uuid,
) -> Result<(), DbErr> {
    ses_map.remove(&uuid);
    sessions::Entity::delete_by_id(uuid.to_string())
        .exec(db)
        .await?;
    Ok(())
}

/// Drops expired sessions from the cache and the database.
/// Returns the number of database rows removed.
pub async fn reap_expired_sessions(
    db: &DatabaseConnection,
    ses_map: &SessionMap,
) -> Result<u64, DbErr> {
    ses_map.retain(|_, session| !session.is_expired());
    let res = sessions::Entity::delete_many()
        .filter(sessions::Column::ExpiresAt.lte(Utc::now().naive_utc()))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("battery staple", &hash));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn test_session_expiry() {
        let live = Session {
            user_id: 1,
            expires_at: Utc::now().naive_utc() + Duration::minutes(5),
        };
        let dead = Session {
            user_id: 1,
            expires_at: Utc::now().naive_utc() - Duration::minutes(5),
        };
        assert!(!live.is_expired());
        assert!(dead.is_expired());
    }
}
