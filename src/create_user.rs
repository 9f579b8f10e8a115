use crate::db::get_db_pool;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::flash::set_flash;
use crate::middleware::ClientCtx;
use crate::orm::users;
use crate::session::hash_password;
use crate::web::{internal_error, redirect};
use actix_web::{get, post, web, Error, HttpResponse, Responder};
use askama::Template;
use askama_actix::TemplateToResponse;
use chrono::Utc;
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};
use serde::Deserialize;
use validator::{validate_email, Validate};

#[derive(Template)]
#[template(path = "create_user.html")]
pub struct CreateUserTemplate {
    pub client: ClientCtx,
    pub username: String,
    pub email: String,
    pub errors: Vec<String>,
}

#[derive(Deserialize, Validate)]
pub struct FormData {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Username must be between 1 and 255 characters."
    ))]
    username: String,
    #[validate(length(
        min = 8,
        max = 1000,
        message = "Password must be between 8 and 1000 characters."
    ))]
    password: String,
    #[serde(default)]
    email: String,
    csrf_token: String,
}

#[derive(Debug)]
pub enum RegisterError {
    NameTaken,
    Hash(String),
    Db(DbErr),
}

impl std::fmt::Display for RegisterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterError::NameTaken => write!(f, "That username is already taken."),
            RegisterError::Hash(e) => write!(f, "Password hashing failed: {}", e),
            RegisterError::Db(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl From<DbErr> for RegisterError {
    fn from(e: DbErr) -> Self {
        RegisterError::Db(e)
    }
}

/// Inserts a user with an Argon2id hash of `pass`.
pub async fn insert_new_user<C: ConnectionTrait>(
    db: &C,
    name: &str,
    pass: &str,
    email: Option<&str>,
) -> Result<users::Model, RegisterError> {
    let taken = users::Entity::find()
        .filter(users::Column::Name.eq(name))
        .count(db)
        .await?;
    if taken > 0 {
        return Err(RegisterError::NameTaken);
    }

    let password = hash_password(pass).map_err(|e| RegisterError::Hash(e.to_string()))?;

    Ok(users::ActiveModel {
        name: Set(name.to_owned()),
        email: Set(email.map(|e| e.to_owned())),
        password: Set(password),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

#[get("/create_user")]
pub async fn create_user_get(client: ClientCtx) -> impl Responder {
    CreateUserTemplate {
        client,
        username: String::new(),
        email: String::new(),
        errors: Vec::new(),
    }
    .to_response()
}

#[post("/create_user")]
pub async fn create_user_post(
    client: ClientCtx,
    cookies: actix_session::Session,
    form: web::Form<FormData>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let username = form.username.trim();
    let email = form.email.trim().to_lowercase();

    let mut errors = match form.validate() {
        Ok(()) => Vec::new(),
        Err(e) => crate::validation::messages(&e),
    };
    if !form.username.is_empty() && username.is_empty() {
        errors.push("Username must be between 1 and 255 characters.".to_owned());
    }
    // Email is optional; only a filled in value is checked.
    if !email.is_empty() && !validate_email(email.as_str()) {
        errors.push("Email address is not valid.".to_owned());
    }

    if errors.is_empty() {
        let email = if email.is_empty() { None } else { Some(email.as_str()) };
        match insert_new_user(get_db_pool(), username, &form.password, email).await {
            Ok(user) => {
                log::info!("New user registered: {} (user_id: {})", user.name, user.id);
                set_flash(&cookies, "Your account has been created. Please log in.");
                return Ok(redirect("/login"));
            }
            Err(RegisterError::NameTaken) => errors.push(RegisterError::NameTaken.to_string()),
            Err(e) => return Err(internal_error("create_user_post", e)),
        }
    }

    log::debug!("User registration rejected: {:?}", errors);
    Ok(CreateUserTemplate {
        client,
        username: username.to_owned(),
        email,
        errors,
    }
    .to_response())
}
