/// Integration tests for CSRF tokens carried in the cookie session

use actix_session::{storage::CookieSessionStore, Session, SessionMiddleware};
use actix_web::cookie::{Cookie, Key};
use actix_web::http::StatusCode;
use actix_web::{test, web, App, HttpResponse};
use canvass::middleware::csrf::{get_or_create_csrf_token, validate_csrf_token, CSRF_TOKEN_LENGTH};
use canvass::web::CsrfForm;

async fn issue(session: Session) -> actix_web::Result<HttpResponse> {
    let token = get_or_create_csrf_token(&session)?;
    Ok(HttpResponse::Ok().body(token))
}

async fn check(session: Session, form: web::Form<CsrfForm>) -> actix_web::Result<HttpResponse> {
    validate_csrf_token(&session, &form.csrf_token)?;
    Ok(HttpResponse::Ok().finish())
}

macro_rules! csrf_app {
    () => {
        test::init_service(
            App::new()
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                        .cookie_secure(false)
                        .build(),
                )
                .route("/issue", web::get().to(issue))
                .route("/check", web::post().to(check)),
        )
        .await
    };
}

#[actix_rt::test]
async fn test_matching_token_accepted() {
    let app = csrf_app!();

    let resp = test::call_service(&app, test::TestRequest::get().uri("/issue").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie: Cookie<'static> = resp
        .response()
        .cookies()
        .next()
        .expect("session cookie")
        .into_owned();
    let token = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert_eq!(token.len(), CSRF_TOKEN_LENGTH);

    let req = test::TestRequest::post()
        .uri("/check")
        .cookie(cookie)
        .set_form(&[("csrf_token", token.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_wrong_token_forbidden() {
    let app = csrf_app!();

    let resp = test::call_service(&app, test::TestRequest::get().uri("/issue").to_request()).await;
    let cookie: Cookie<'static> = resp
        .response()
        .cookies()
        .next()
        .expect("session cookie")
        .into_owned();

    let req = test::TestRequest::post()
        .uri("/check")
        .cookie(cookie)
        .set_form(&[("csrf_token", "not-the-token")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn test_missing_session_token_forbidden() {
    let app = csrf_app!();

    let req = test::TestRequest::post()
        .uri("/check")
        .set_form(&[("csrf_token", "anything")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
