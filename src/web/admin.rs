//! Role administration. Every route requires the Admin role.

use crate::db::get_db_pool;
use crate::middleware::csrf::{validate_csrf_pairs, validate_csrf_token};
use crate::middleware::flash::set_flash;
use crate::middleware::ClientCtx;
use crate::orm::{roles, users};
use crate::role::{self, RoleError, UserWithRoles, ADMIN};
use crate::web::{internal_error, redirect, CsrfForm};
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama::Template;
use askama_actix::TemplateToResponse;
use sea_orm::EntityTrait;
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_roles)
        .service(create_role)
        .service(delete_role)
        .service(view_users)
        .service(view_user_roles)
        .service(update_user_roles);
}

pub struct RoleRow {
    pub id: i32,
    pub name: String,
    pub is_protected: bool,
}

pub struct RoleChoice {
    pub id: i32,
    pub name: String,
    pub checked: bool,
}

#[derive(Template)]
#[template(path = "admin/roles.html")]
pub struct RolesTemplate {
    pub client: ClientCtx,
    pub roles: Vec<RoleRow>,
    pub new_name: String,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub client: ClientCtx,
    pub users: Vec<UserWithRoles>,
}

#[derive(Template)]
#[template(path = "admin/user_roles.html")]
pub struct UserRolesTemplate {
    pub client: ClientCtx,
    pub user_id: i32,
    pub user_name: String,
    pub choices: Vec<RoleChoice>,
    pub errors: Vec<String>,
}

#[derive(Deserialize)]
pub struct NewRoleForm {
    name: String,
    csrf_token: String,
}

/// Role ids from repeated `role_ids` checkboxes.
fn checked_role_ids(pairs: &[(String, String)]) -> Vec<i32> {
    let mut ids: Vec<i32> = pairs
        .iter()
        .filter(|(k, _)| k == "role_ids")
        .filter_map(|(_, v)| v.trim().parse().ok())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

async fn roles_page(client: ClientCtx, new_name: String, errors: Vec<String>) -> Result<HttpResponse, Error> {
    let roles = role::list_roles(get_db_pool())
        .await
        .map_err(|e| internal_error("roles_page", e))?
        .into_iter()
        .map(|r| RoleRow {
            is_protected: r.name == ADMIN,
            id: r.id,
            name: r.name,
        })
        .collect();

    Ok(RolesTemplate {
        client,
        roles,
        new_name,
        errors,
    }
    .to_response())
}

async fn find_user(user_id: i32) -> Result<users::Model, Error> {
    users::Entity::find_by_id(user_id)
        .one(get_db_pool())
        .await
        .map_err(|e| internal_error("find_user", e))?
        .ok_or_else(|| error::ErrorNotFound("User not found."))
}

async fn user_roles_page(
    client: ClientCtx,
    user: users::Model,
    checked: &[String],
    errors: Vec<String>,
) -> Result<HttpResponse, Error> {
    let all: Vec<roles::Model> = role::list_roles(get_db_pool())
        .await
        .map_err(|e| internal_error("user_roles_page", e))?;

    Ok(UserRolesTemplate {
        client,
        user_id: user.id,
        user_name: user.name,
        choices: all
            .into_iter()
            .map(|r| RoleChoice {
                checked: checked.contains(&r.name),
                id: r.id,
                name: r.name,
            })
            .collect(),
        errors,
    }
    .to_response())
}

#[get("/admin/roles")]
pub async fn view_roles(client: ClientCtx) -> Result<impl Responder, Error> {
    client.require_admin()?;
    roles_page(client, String::new(), Vec::new()).await
}

#[post("/admin/roles")]
pub async fn create_role(
    client: ClientCtx,
    cookies: actix_session::Session,
    form: web::Form<NewRoleForm>,
) -> Result<HttpResponse, Error> {
    client.require_admin()?;
    validate_csrf_token(&cookies, &form.csrf_token)?;

    match role::create_role(get_db_pool(), &form.name).await {
        Ok(created) => {
            log::info!("Role {} created by user {:?}", created.name, client.get_id());
            set_flash(&cookies, format!("Role \"{}\" created.", created.name));
            Ok(redirect("/admin/roles"))
        }
        Err(RoleError::Db(e)) => Err(internal_error("create_role", e)),
        Err(e) => roles_page(client, form.name.clone(), vec![e.to_string()]).await,
    }
}

#[post("/admin/roles/{role_id}/delete")]
pub async fn delete_role(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    client.require_admin()?;
    validate_csrf_token(&cookies, &form.csrf_token)?;

    match role::delete_role(get_db_pool(), path.into_inner()).await {
        Ok(name) => {
            log::info!("Role {} deleted by user {:?}", name, client.get_id());
            set_flash(&cookies, format!("Role \"{}\" deleted.", name));
            Ok(redirect("/admin/roles"))
        }
        Err(RoleError::NotFound) => Err(error::ErrorNotFound("Role not found.")),
        Err(RoleError::Db(e)) => Err(internal_error("delete_role", e)),
        Err(e) => roles_page(client, String::new(), vec![e.to_string()]).await,
    }
}

#[get("/admin/users")]
pub async fn view_users(client: ClientCtx) -> Result<impl Responder, Error> {
    client.require_admin()?;
    let users = role::list_users_with_roles(get_db_pool())
        .await
        .map_err(|e| internal_error("view_users", e))?;

    Ok(UsersTemplate { client, users }.to_response())
}

#[get("/admin/users/{user_id}/roles")]
pub async fn view_user_roles(
    client: ClientCtx,
    path: web::Path<i32>,
) -> Result<impl Responder, Error> {
    client.require_admin()?;
    let user = find_user(path.into_inner()).await?;
    let current = role::roles_for_user(get_db_pool(), user.id)
        .await
        .map_err(|e| internal_error("view_user_roles", e))?;

    user_roles_page(client, user, &current, Vec::new()).await
}

#[post("/admin/users/{user_id}/roles")]
pub async fn update_user_roles(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<Vec<(String, String)>>,
) -> Result<HttpResponse, Error> {
    let admin_id = client.require_admin()?;
    validate_csrf_pairs(&cookies, &form)?;
    let user = find_user(path.into_inner()).await?;
    let role_ids = checked_role_ids(&form);

    if user.id == admin_id {
        let admin_role = role::find_role_by_name(get_db_pool(), ADMIN)
            .await
            .map_err(|e| internal_error("update_user_roles", e))?;
        let keeps_admin = admin_role
            .map(|r| role_ids.contains(&r.id))
            .unwrap_or(true);
        if !keeps_admin {
            let current = role::roles_for_user(get_db_pool(), user.id)
                .await
                .map_err(|e| internal_error("update_user_roles", e))?;
            let errors = vec!["You cannot remove your own Admin role.".to_owned()];
            return user_roles_page(client, user, &current, errors).await;
        }
    }

    let granted = role::set_user_roles(get_db_pool(), user.id, &role_ids)
        .await
        .map_err(|e| internal_error("update_user_roles", e))?;

    log::info!(
        "Roles of user {} set to {:?} by user {}",
        user.id,
        granted,
        admin_id
    );
    set_flash(&cookies, format!("Roles updated for {}.", user.name));
    Ok(redirect("/admin/users"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_role_ids() {
        let pairs = vec![
            ("csrf_token".to_owned(), "t".to_owned()),
            ("role_ids".to_owned(), "3".to_owned()),
            ("role_ids".to_owned(), "1".to_owned()),
            ("role_ids".to_owned(), "3".to_owned()),
            ("role_ids".to_owned(), "x".to_owned()),
        ];
        assert_eq!(checked_role_ids(&pairs), vec![1, 3]);
    }
}
