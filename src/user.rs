use crate::orm::users;
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};
use std::collections::HashMap;

/// A struct to hold display information for a user.
#[derive(Clone, Debug)]
pub struct Profile {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    /// Role names, e.g. "Admin".
    pub roles: Vec<String>,
}

impl Profile {
    /// Returns a fully qualified user profile by id.
    pub async fn get_by_id<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<Self>, DbErr> {
        let user = match users::Entity::find_by_id(id).one(db).await? {
            Some(user) => user,
            None => return Ok(None),
        };
        let roles = crate::role::roles_for_user(db, id).await?;

        Ok(Some(Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
            roles,
        }))
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

pub async fn get_user_id_from_name<C: ConnectionTrait>(db: &C, name: &str) -> Option<i32> {
    users::Entity::find()
        .filter(users::Column::Name.eq(name))
        .one(db)
        .await
        .unwrap_or(None)
        .map(|user| user.id)
}

/// Maps user ids to names for display, skipping ids that no longer exist.
pub async fn names_by_id<C: ConnectionTrait>(
    db: &C,
    ids: Vec<i32>,
) -> Result<HashMap<i32, String>, DbErr> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    Ok(users::Entity::find()
        .filter(users::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect())
}
