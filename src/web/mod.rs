pub mod admin;
pub mod dashboard;
pub mod error;
pub mod index;
pub mod login;
pub mod logout;
pub mod responses;
pub mod results;
pub mod surveys;
pub mod take;

use crate::middleware::ClientCtx;
use crate::survey::{load_graph, SurveyGraph};
use actix_web::http::header;
use actix_web::{Error, HttpResponse};
use serde::Deserialize;
use std::fmt::Display;

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Descending order. Order is important.
    // Route resolution will stop at the first match.
    index::configure(conf);
    admin::configure(conf);
    dashboard::configure(conf);
    login::configure(conf);
    logout::configure(conf);
    // `take` registers `/take/unavailable` ahead of `/take/{id}`.
    take::configure(conf);
    surveys::configure(conf);
    results::configure(conf);
    responses::configure(conf);

    conf.service(crate::create_user::create_user_get)
        .service(crate::create_user::create_user_post);
}

/// A form that carries nothing but its CSRF token.
#[derive(Deserialize)]
pub struct CsrfForm {
    pub csrf_token: String,
}

/// 303 to `location`, so a POST is followed by a GET.
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, location))
        .finish()
}

/// Logs `e` and returns the generic failure the user sees.
pub fn internal_error<E: Display>(context: &str, e: E) -> Error {
    log::error!("{}: {}", context, e);
    actix_web::error::ErrorInternalServerError("Something went wrong. Please try again later.")
}

/// Loads a survey graph or fails with 404.
pub async fn find_survey(survey_id: i32) -> Result<SurveyGraph, Error> {
    load_graph(crate::db::get_db_pool(), survey_id)
        .await
        .map_err(|e| internal_error("find_survey", e))?
        .ok_or_else(|| actix_web::error::ErrorNotFound("Survey not found."))
}

/// Loads a survey the client owns, or any survey for admins.
pub async fn find_managed_survey(client: &ClientCtx, survey_id: i32) -> Result<SurveyGraph, Error> {
    client.require_login()?;
    let graph = find_survey(survey_id).await?;
    client.require_survey_manager(graph.survey.creator_id)?;
    Ok(graph)
}

/// A PDF download.
pub fn pdf_attachment(filename: &str, bytes: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(crate::pdf::CONTENT_TYPE)
        .append_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_is_see_other() {
        let res = redirect("/surveys/3");
        assert_eq!(res.status(), actix_web::http::StatusCode::SEE_OTHER);
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "/surveys/3"
        );
    }

    #[test]
    fn test_internal_error_hides_details() {
        let err = internal_error("find_survey", "connection reset");
        assert_eq!(
            err.as_response_error().status_code(),
            actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(err.to_string(), "Something went wrong. Please try again later.");
    }

    #[test]
    fn test_pdf_attachment_headers() {
        let res = pdf_attachment("Survey-Results-A-20250101.pdf", b"%PDF-1.3".to_vec());
        assert_eq!(
            res.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        assert_eq!(
            res.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"Survey-Results-A-20250101.pdf\""
        );
    }
}
