//! Named roles and the queries behind role administration.

use crate::app_config::AdminConfig;
use crate::orm::{roles, user_roles, users};
use chrono::Utc;
use sea_orm::{
    entity::*, query::*, ConnectionTrait, DatabaseConnection, DbErr, TransactionTrait,
};
use std::collections::HashMap;

pub const ADMIN: &str = "Admin";
pub const SUPERVISOR: &str = "Supervisor";

/// Roles created at startup when absent.
pub const BUILTIN_ROLES: [&str; 2] = [ADMIN, SUPERVISOR];

/// Maximum length of a role name.
pub const ROLE_NAME_MAX: usize = 64;

#[derive(Debug)]
pub enum RoleError {
    /// Role name is empty or too long.
    InvalidName,
    /// A role with this name already exists.
    Duplicate(String),
    /// The Admin role is permanent.
    Protected,
    NotFound,
    Db(DbErr),
}

impl std::fmt::Display for RoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleError::InvalidName => write!(
                f,
                "Role name must be between 1 and {} characters.",
                ROLE_NAME_MAX
            ),
            RoleError::Duplicate(name) => write!(f, "Role '{}' already exists.", name),
            RoleError::Protected => write!(f, "The {} role cannot be deleted.", ADMIN),
            RoleError::NotFound => write!(f, "Role not found."),
            RoleError::Db(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for RoleError {}

impl From<DbErr> for RoleError {
    fn from(e: DbErr) -> Self {
        RoleError::Db(e)
    }
}

/// A user row joined with the names of their roles.
#[derive(Clone, Debug)]
pub struct UserWithRoles {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl UserWithRoles {
    pub fn roles_label(&self) -> String {
        if self.roles.is_empty() {
            "-".to_owned()
        } else {
            self.roles.join(", ")
        }
    }
}

pub async fn roles_for_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<String>, DbErr> {
    let role_ids: Vec<i32> = user_roles::Entity::find()
        .filter(user_roles::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|ur| ur.role_id)
        .collect();

    if role_ids.is_empty() {
        return Ok(Vec::new());
    }

    Ok(roles::Entity::find()
        .filter(roles::Column::Id.is_in(role_ids))
        .order_by_asc(roles::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.name)
        .collect())
}

pub async fn find_role_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<Option<roles::Model>, DbErr> {
    roles::Entity::find()
        .filter(roles::Column::Name.eq(name))
        .one(db)
        .await
}

pub async fn list_roles<C: ConnectionTrait>(db: &C) -> Result<Vec<roles::Model>, DbErr> {
    roles::Entity::find()
        .order_by_asc(roles::Column::Name)
        .all(db)
        .await
}

pub async fn create_role<C: ConnectionTrait>(db: &C, name: &str) -> Result<roles::Model, RoleError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > ROLE_NAME_MAX {
        return Err(RoleError::InvalidName);
    }
    // Comparison is case-insensitive so "admin" cannot shadow "Admin".
    let existing = list_roles(db).await?;
    if existing.iter().any(|r| r.name.eq_ignore_ascii_case(name)) {
        return Err(RoleError::Duplicate(name.to_owned()));
    }

    Ok(roles::ActiveModel {
        name: Set(name.to_owned()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Deletes a role and its memberships. Returns the deleted role's name.
pub async fn delete_role(db: &DatabaseConnection, role_id: i32) -> Result<String, RoleError> {
    let role = roles::Entity::find_by_id(role_id)
        .one(db)
        .await?
        .ok_or(RoleError::NotFound)?;

    if role.name == ADMIN {
        return Err(RoleError::Protected);
    }

    let txn = db.begin().await?;
    user_roles::Entity::delete_many()
        .filter(user_roles::Column::RoleId.eq(role_id))
        .exec(&txn)
        .await?;
    roles::Entity::delete_by_id(role_id).exec(&txn).await?;
    txn.commit().await?;

    Ok(role.name)
}

/// Creates the built-in roles that do not exist yet.
pub async fn ensure_builtin_roles<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    for name in BUILTIN_ROLES {
        if find_role_by_name(db, name).await?.is_none() {
            roles::ActiveModel {
                name: Set(name.to_owned()),
                ..Default::default()
            }
            .insert(db)
            .await?;
            log::info!("Created built-in role {}", name);
        }
    }
    Ok(())
}

/// Adds `user_id` to `role_name` unless already a member.
pub async fn grant_role<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    role_name: &str,
) -> Result<(), RoleError> {
    let role = find_role_by_name(db, role_name)
        .await?
        .ok_or(RoleError::NotFound)?;

    let existing = user_roles::Entity::find_by_id((user_id, role.id))
        .one(db)
        .await?;
    if existing.is_none() {
        user_roles::ActiveModel {
            user_id: Set(user_id),
            role_id: Set(role.id),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Makes sure the configured bootstrap administrator exists and is an Admin.
/// Returns the administrator's user id when the bootstrap is enabled.
pub async fn ensure_admin_account(
    db: &DatabaseConnection,
    admin: &AdminConfig,
) -> Result<Option<i32>, RoleError> {
    if !admin.is_enabled() {
        log::debug!("Admin bootstrap disabled");
        return Ok(None);
    }

    let name = admin.name.trim();
    let user_id = match crate::user::get_user_id_from_name(db, name).await {
        Some(id) => id,
        None => {
            let password = crate::session::hash_password(&admin.password).map_err(|e| {
                RoleError::Db(DbErr::Custom(format!("Password hashing failed: {}", e)))
            })?;
            let email = if admin.email.trim().is_empty() {
                None
            } else {
                Some(admin.email.trim().to_lowercase())
            };
            let user = users::ActiveModel {
                name: Set(name.to_owned()),
                email: Set(email),
                password: Set(password),
                created_at: Set(Utc::now().naive_utc()),
                ..Default::default()
            }
            .insert(db)
            .await?;
            log::info!("Created bootstrap administrator {}", name);
            user.id
        }
    };

    grant_role(db, user_id, ADMIN).await?;
    Ok(Some(user_id))
}

/// Replaces the role set of a user with `role_ids`.
/// Unknown role ids are ignored.
pub async fn set_user_roles(
    db: &DatabaseConnection,
    user_id: i32,
    role_ids: &[i32],
) -> Result<Vec<String>, DbErr> {
    let known: Vec<roles::Model> = if role_ids.is_empty() {
        Vec::new()
    } else {
        roles::Entity::find()
            .filter(roles::Column::Id.is_in(role_ids.to_vec()))
            .all(db)
            .await?
    };

    let txn = db.begin().await?;
    user_roles::Entity::delete_many()
        .filter(user_roles::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    for role in &known {
        user_roles::ActiveModel {
            user_id: Set(user_id),
            role_id: Set(role.id),
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;

    Ok(known.into_iter().map(|r| r.name).collect())
}

/// Every user with their role names, ordered by name.
pub async fn list_users_with_roles<C: ConnectionTrait>(db: &C) -> Result<Vec<UserWithRoles>, DbErr> {
    let all_users = users::Entity::find()
        .order_by_asc(users::Column::Name)
        .all(db)
        .await?;
    let role_names: HashMap<i32, String> = roles::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.id, r.name))
        .collect();

    let mut memberships: HashMap<i32, Vec<String>> = HashMap::new();
    for ur in user_roles::Entity::find().all(db).await? {
        if let Some(name) = role_names.get(&ur.role_id) {
            memberships.entry(ur.user_id).or_default().push(name.clone());
        }
    }

    Ok(all_users
        .into_iter()
        .map(|u| {
            let mut roles = memberships.remove(&u.id).unwrap_or_default();
            roles.sort();
            UserWithRoles {
                id: u.id,
                name: u.name,
                email: u.email.unwrap_or_default(),
                roles,
            }
        })
        .collect())
}
