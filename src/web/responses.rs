use crate::db::get_db_pool;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::pdf::responses::responses_pdf;
use crate::survey::responses::{load_responses, SurveyResponses};
use crate::web::{find_managed_survey, internal_error, pdf_attachment, CsrfForm};
use actix_web::{get, post, web, Error, HttpResponse, Responder};
use askama::Template;
use askama_actix::TemplateToResponse;
use chrono::Utc;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_responses).service(export_responses);
}

#[derive(Template)]
#[template(path = "responses.html")]
pub struct ResponsesTemplate {
    pub client: ClientCtx,
    pub listing: SurveyResponses,
}

#[get("/surveys/{survey_id}/responses")]
pub async fn view_responses(
    client: ClientCtx,
    path: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let graph = find_managed_survey(&client, path.into_inner()).await?;
    let listing = load_responses(get_db_pool(), &graph)
        .await
        .map_err(|e| internal_error("view_responses", e))?;

    Ok(ResponsesTemplate { client, listing }.to_response())
}

#[post("/surveys/{survey_id}/responses/pdf")]
pub async fn export_responses(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    let graph = find_managed_survey(&client, path.into_inner()).await?;
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let listing = load_responses(get_db_pool(), &graph)
        .await
        .map_err(|e| internal_error("export_responses", e))?;
    let (filename, bytes) = responses_pdf(&listing, Utc::now().naive_utc())
        .map_err(|e| internal_error("export_responses", e))?;

    log::info!("Exported responses of survey {} as {}", graph.survey.id, filename);
    Ok(pdf_attachment(&filename, bytes))
}
