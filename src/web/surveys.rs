//! Survey builder pages: list, create, view, edit and delete.

use crate::app_config;
use crate::db::get_db_pool;
use crate::middleware::csrf::{validate_csrf_pairs, validate_csrf_token};
use crate::middleware::flash::set_flash;
use crate::middleware::ClientCtx;
use crate::orm::questions::QuestionType;
use crate::survey::view::{EditSurvey, SurveyDetails, SurveyListItem, TypeChoice};
use crate::survey::{self, Scope, SurveyForm};
use crate::web::{find_managed_survey, internal_error, redirect, CsrfForm};
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama::Template;
use askama_actix::TemplateToResponse;
use chrono::Utc;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // `/surveys/new` must be registered before `/surveys/{id}`.
    conf.service(view_surveys)
        .service(view_new_survey)
        .service(create_survey)
        .service(view_survey)
        .service(view_edit_survey)
        .service(update_survey)
        .service(delete_survey);
}

#[derive(Template)]
#[template(path = "surveys/list.html")]
pub struct SurveyListTemplate {
    pub client: ClientCtx,
    pub surveys: Vec<SurveyListItem>,
    pub showing_all: bool,
}

#[derive(Template)]
#[template(path = "surveys/view.html")]
pub struct SurveyViewTemplate {
    pub client: ClientCtx,
    pub survey: SurveyDetails,
}

#[derive(Template)]
#[template(path = "surveys/builder.html")]
pub struct SurveyBuilderTemplate {
    pub client: ClientCtx,
    pub heading: String,
    pub action: String,
    pub survey: EditSurvey,
    pub errors: Vec<String>,
    /// Type choices for rows added by the builder script.
    pub new_types: Vec<TypeChoice>,
}

impl SurveyBuilderTemplate {
    fn new(client: ClientCtx, survey_id: Option<i32>, survey: EditSurvey, errors: Vec<String>) -> Self {
        let (heading, action) = match survey_id {
            Some(id) => ("Edit Survey".to_owned(), format!("/surveys/{}/edit", id)),
            None => ("Create Survey".to_owned(), "/surveys/new".to_owned()),
        };
        Self {
            client,
            heading,
            action,
            survey,
            errors,
            new_types: QuestionType::ALL
                .iter()
                .map(|t| TypeChoice {
                    value: t.as_str(),
                    label: t.label(),
                    selected: *t == QuestionType::SingleChoice,
                })
                .collect(),
        }
    }
}

#[get("/surveys")]
pub async fn view_surveys(client: ClientCtx) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let scope = if client.is_admin() {
        Scope::All
    } else {
        Scope::Owner(user_id)
    };

    let surveys = survey::list_surveys(get_db_pool(), scope)
        .await
        .map_err(|e| internal_error("view_surveys", e))?;

    Ok(SurveyListTemplate {
        client,
        surveys,
        showing_all: matches!(scope, Scope::All),
    }
    .to_response())
}

#[get("/surveys/new")]
pub async fn view_new_survey(client: ClientCtx) -> Result<impl Responder, Error> {
    client.require_login()?;
    let builder = EditSurvey::new(&SurveyForm::blank(), false);
    Ok(SurveyBuilderTemplate::new(client, None, builder, Vec::new()).to_response())
}

#[post("/surveys/new")]
pub async fn create_survey(
    client: ClientCtx,
    cookies: actix_session::Session,
    form: web::Form<Vec<(String, String)>>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    validate_csrf_pairs(&cookies, &form)?;

    let survey_form = SurveyForm::from_pairs(&form);
    let errors = survey_form.errors(&app_config::limits());
    if !errors.is_empty() {
        let builder = EditSurvey::new(&survey_form, false);
        return Ok(SurveyBuilderTemplate::new(client, None, builder, errors).to_response());
    }

    let created = survey::create_survey(get_db_pool(), user_id, &survey_form)
        .await
        .map_err(|e| internal_error("create_survey", e))?;

    set_flash(&cookies, "Survey created successfully.");
    Ok(redirect(&format!("/surveys/{}", created.id)))
}

#[get("/surveys/{survey_id}")]
pub async fn view_survey(client: ClientCtx, path: web::Path<i32>) -> Result<impl Responder, Error> {
    let graph = find_managed_survey(&client, path.into_inner()).await?;
    let response_count = survey::count_responses(get_db_pool(), graph.survey.id)
        .await
        .map_err(|e| internal_error("view_survey", e))?;

    Ok(SurveyViewTemplate {
        client,
        survey: SurveyDetails::new(&graph, response_count, Utc::now().naive_utc()),
    }
    .to_response())
}

#[get("/surveys/{survey_id}/edit")]
pub async fn view_edit_survey(
    client: ClientCtx,
    path: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let graph = find_managed_survey(&client, path.into_inner()).await?;
    let builder = EditSurvey::new(
        &SurveyForm::from_graph(&graph),
        graph.survey.is_password_protected(),
    );
    Ok(SurveyBuilderTemplate::new(client, Some(graph.survey.id), builder, Vec::new()).to_response())
}

#[post("/surveys/{survey_id}/edit")]
pub async fn update_survey(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<Vec<(String, String)>>,
) -> Result<HttpResponse, Error> {
    let graph = find_managed_survey(&client, path.into_inner()).await?;
    validate_csrf_pairs(&cookies, &form)?;

    let survey_form = SurveyForm::from_pairs(&form);
    let errors = survey_form.errors(&app_config::limits());
    if !errors.is_empty() {
        let builder = EditSurvey::new(&survey_form, graph.survey.is_password_protected());
        return Ok(
            SurveyBuilderTemplate::new(client, Some(graph.survey.id), builder, errors)
                .to_response(),
        );
    }

    survey::update_survey(get_db_pool(), &graph, &survey_form)
        .await
        .map_err(|e| internal_error("update_survey", e))?;

    set_flash(&cookies, "Survey updated successfully.");
    Ok(redirect(&format!("/surveys/{}", graph.survey.id)))
}

#[post("/surveys/{survey_id}/delete")]
pub async fn delete_survey(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    let graph = find_managed_survey(&client, path.into_inner()).await?;
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let deleted = survey::delete_survey(get_db_pool(), graph.survey.id)
        .await
        .map_err(|e| internal_error("delete_survey", e))?;
    if !deleted {
        return Err(error::ErrorNotFound("Survey not found."));
    }

    log::info!(
        "Survey {} deleted by user {:?}",
        graph.survey.id,
        client.get_id()
    );
    set_flash(&cookies, format!("Survey \"{}\" was deleted.", graph.survey.title));
    Ok(redirect("/surveys"))
}
