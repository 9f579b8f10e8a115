use crate::db::get_db_pool;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::flash::set_flash;
use crate::middleware::ClientCtx;
use crate::orm::users;
use crate::session::{self, get_sess, verify_password, TOKEN_KEY};
use crate::web::{internal_error, redirect};
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama::Template;
use askama_actix::TemplateToResponse;
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(post_login).service(view_login);
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub client: ClientCtx,
    pub username: String,
    pub errors: Vec<String>,
}

#[derive(Deserialize)]
pub struct FormData {
    username: String,
    password: String,
    csrf_token: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum LoginResult {
    Success(i32),
    BadName,
    BadPassword,
}

/// Checks a name and password pair against the users table.
pub async fn login<C: ConnectionTrait>(db: &C, name: &str, pass: &str) -> Result<LoginResult, DbErr> {
    let user = users::Entity::find()
        .filter(users::Column::Name.eq(name.trim()))
        .one(db)
        .await?;

    let user = match user {
        Some(user) => user,
        None => return Ok(LoginResult::BadName),
    };

    if !verify_password(pass, &user.password) {
        return Ok(LoginResult::BadPassword);
    }

    Ok(LoginResult::Success(user.id))
}

#[post("/login")]
pub async fn post_login(
    client: ClientCtx,
    cookies: actix_session::Session,
    form: web::Form<FormData>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let result = login(get_db_pool(), &form.username, &form.password)
        .await
        .map_err(|e| internal_error("post_login", e))?;

    let user_id = match result {
        LoginResult::Success(user_id) => user_id,
        LoginResult::BadName | LoginResult::BadPassword => {
            log::debug!("login failure: {:?} for {}", result, form.username);
            // Same message for both, so names cannot be probed.
            return Ok(LoginTemplate {
                client,
                username: form.username.clone(),
                errors: vec!["Invalid username or password.".to_owned()],
            }
            .to_response());
        }
    };

    let uuid = session::new_session(get_db_pool(), get_sess(), user_id)
        .await
        .map_err(|e| internal_error("post_login: new_session", e))?;

    cookies.renew();
    cookies
        .insert(TOKEN_KEY, uuid.to_string())
        .map_err(|_| error::ErrorInternalServerError("middleware error"))?;
    set_flash(&cookies, format!("Welcome back, {}.", form.username.trim()));

    log::info!("User {} logged in", user_id);
    Ok(redirect("/surveys"))
}

#[get("/login")]
pub async fn view_login(client: ClientCtx) -> Result<impl Responder, Error> {
    if client.is_user() {
        return Ok(redirect("/surveys"));
    }

    Ok(LoginTemplate {
        client,
        username: String::new(),
        errors: Vec::new(),
    }
    .to_response())
}
