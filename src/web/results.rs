use crate::db::get_db_pool;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::pdf::results::results_pdf;
use crate::survey::results::{load_results, SurveyResults};
use crate::web::{find_managed_survey, internal_error, pdf_attachment, CsrfForm};
use actix_web::{get, post, web, Error, HttpResponse, Responder};
use askama::Template;
use askama_actix::TemplateToResponse;
use chrono::Utc;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_results).service(export_results);
}

#[derive(Template)]
#[template(path = "results.html")]
pub struct ResultsTemplate {
    pub client: ClientCtx,
    pub results: SurveyResults,
}

#[get("/surveys/{survey_id}/results")]
pub async fn view_results(client: ClientCtx, path: web::Path<i32>) -> Result<impl Responder, Error> {
    let graph = find_managed_survey(&client, path.into_inner()).await?;
    let results = load_results(get_db_pool(), &graph)
        .await
        .map_err(|e| internal_error("view_results", e))?;

    Ok(ResultsTemplate { client, results }.to_response())
}

#[post("/surveys/{survey_id}/results/pdf")]
pub async fn export_results(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    let graph = find_managed_survey(&client, path.into_inner()).await?;
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let results = load_results(get_db_pool(), &graph)
        .await
        .map_err(|e| internal_error("export_results", e))?;
    let (filename, bytes) = results_pdf(&results, graph.survey.created_at, Utc::now().naive_utc())
        .map_err(|e| internal_error("export_results", e))?;

    log::info!("Exported results of survey {} as {}", graph.survey.id, filename);
    Ok(pdf_attachment(&filename, bytes))
}
