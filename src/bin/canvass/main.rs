use actix_files::Files;
use actix_session::{config::PersistentSession, storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{time, Key, SameSite};
use actix_web::http::header;
use actix_web::http::StatusCode;
use actix_web::middleware::{DefaultHeaders, ErrorHandlers, Logger};
use actix_web::{App, HttpServer};
use canvass::db::{get_db_pool, init_db};
use canvass::middleware::ClientCtx;
use env_logger::Env;
use rand::{distributions::Alphanumeric, Rng};
use std::time::Duration;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_lib_mods();
    init_our_mods();
    init_db(std::env::var("DATABASE_URL").expect("DATABASE_URL must be set.")).await;

    canvass::role::ensure_builtin_roles(get_db_pool())
        .await
        .expect("Failed to create built-in roles.");
    canvass::role::ensure_admin_account(get_db_pool(), &canvass::app_config::admin())
        .await
        .expect("Failed to create the bootstrap administrator.");

    let secret_key = match std::env::var("SECRET_KEY") {
        Ok(key) if key.len() >= 64 => Key::from(key.as_bytes()),
        other => {
            let random_string: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(128)
                .map(char::from)
                .collect();
            log::warn!("SECRET_KEY was invalid ({}). Session cookies will not survive a restart. A secret key must be at least 64 bytes to be accepted.",
                match other {
                    Ok(_) => "too short".to_owned(),
                    Err(e) => e.to_string(),
                });
            Key::from(random_string.as_bytes())
        }
    };

    let security = canvass::app_config::security();
    let site = canvass::app_config::site();

    // Sweep expired sessions out of the cache and the database.
    let sweep = Duration::from_secs(security.session_sweep_seconds.max(1));
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(sweep);
        loop {
            interval.tick().await;
            match canvass::session::reap_expired_sessions(get_db_pool(), canvass::session::get_sess())
                .await
            {
                Ok(0) => {}
                Ok(n) => log::debug!("Removed {} expired sessions", n),
                Err(e) => log::error!("Session sweep failed: {}", e),
            }
        }
    });

    let session_ttl = time::Duration::minutes(security.session_timeout_minutes as i64);
    let secure_cookies = security.secure_cookies;

    log::info!("{} listening on {}", site.name, site.bind);
    HttpServer::new(move || {
        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        // However, services are read top->down, higher traffic routes should be
        // placed higher
        App::new()
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_FRAME_OPTIONS, "DENY"))
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add(("X-XSS-Protection", "0"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
                    .add((
                        "Permissions-Policy",
                        "geolocation=(), microphone=(), camera=()",
                    )),
            )
            .wrap(
                ErrorHandlers::new()
                    .handler(StatusCode::BAD_REQUEST, canvass::web::error::render_400)
                    .handler(StatusCode::UNAUTHORIZED, canvass::web::error::render_401)
                    .handler(StatusCode::FORBIDDEN, canvass::web::error::render_403)
                    .handler(StatusCode::NOT_FOUND, canvass::web::error::render_404)
                    .handler(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        canvass::web::error::render_500,
                    ),
            )
            .wrap(ClientCtx::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_same_site(SameSite::Lax)
                    .cookie_secure(secure_cookies)
                    .session_lifecycle(PersistentSession::default().session_ttl(session_ttl))
                    .build(),
            )
            .wrap(Logger::new("%a %r %s %Dms"))
            .service(Files::new("/public", "./public"))
            .configure(canvass::web::configure)
    })
    .bind(&site.bind)?
    .run()
    .await
}

/// Initialize third party crates we rely on but don't have control over.
pub fn init_lib_mods() {
    if let Err(e) = dotenv::dotenv() {
        eprintln!("No .env file loaded: {}", e);
    }
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}

/// Initialize all local mods.
pub fn init_our_mods() {
    canvass::app_config::init();
    canvass::session::init();
}
