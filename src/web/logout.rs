use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::session::{get_sess, remove_session, TOKEN_KEY};
use actix_web::{get, Error, Responder};
use askama_actix::{Template, TemplateToResponse};
use uuid::Uuid;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_logout);
}

#[derive(Template)]
#[template(path = "logout.html")]
struct LogoutTemplate {
    client: ClientCtx,
}

#[get("/logout")]
pub async fn view_logout(cookies: actix_session::Session) -> Result<impl Responder, Error> {
    let token = cookies.get::<String>(TOKEN_KEY).unwrap_or_else(|e| {
        log::error!("view_logout: unreadable session cookie: {}", e);
        None
    });
    match token.as_deref().map(Uuid::parse_str) {
        Some(Ok(uuid)) => {
            if let Err(e) = remove_session(get_db_pool(), get_sess(), uuid).await {
                log::error!("view_logout: could not delete session {}: {}", uuid, e);
            }
        }
        Some(Err(e)) => log::warn!("view_logout: malformed session token: {}", e),
        None => log::debug!("view_logout: no session to end"),
    }

    // Drops the token, the CSRF token and any unlocked surveys with it.
    cookies.purge();

    // The context built by the middleware still holds the old user.
    Ok(LogoutTemplate {
        client: ClientCtx::from_profile(None),
    }
    .to_response())
}
