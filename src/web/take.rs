//! Respondent pages: password prompt, the survey form and its outcome pages.

use crate::db::get_db_pool;
use crate::middleware::csrf::{validate_csrf_pairs, validate_csrf_token};
use crate::middleware::ClientCtx;
use crate::orm::{responses, surveys};
use crate::session::verify_password;
use crate::survey::submission::{submit_response, SubmissionError, SurveySubmission};
use crate::survey::view::TakeSurvey;
use crate::survey::{Availability, SurveyGraph};
use crate::web::{find_survey, internal_error, redirect};
use actix_session::Session;
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama::Template;
use askama_actix::TemplateToResponse;
use chrono::Utc;
use sea_orm::EntityTrait;
use serde::Deserialize;

/// Session key listing the password protected surveys this visitor unlocked.
const UNLOCKED_KEY: &str = "unlocked_surveys";
/// Unlocked ids kept in the cookie session; the oldest are forgotten first.
pub const UNLOCKED_MAX: usize = 50;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Literal paths ahead of `/take/{id}`.
    conf.service(view_unavailable)
        .service(view_thanks)
        .service(view_take)
        .service(post_take)
        .service(view_password)
        .service(post_password);
}

#[derive(Template)]
#[template(path = "take/take.html")]
pub struct TakeTemplate {
    pub client: ClientCtx,
    pub survey: TakeSurvey,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "take/password.html")]
pub struct PasswordTemplate {
    pub client: ClientCtx,
    pub survey_id: i32,
    pub title: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "take/unavailable.html")]
pub struct UnavailableTemplate {
    pub client: ClientCtx,
    pub message: String,
}

#[derive(Template)]
#[template(path = "take/thanks.html")]
pub struct ThanksTemplate {
    pub client: ClientCtx,
    pub title: String,
    pub is_anonymous: bool,
}

#[derive(Deserialize)]
pub struct UnavailableQuery {
    message: Option<String>,
}

#[derive(Deserialize)]
pub struct PasswordForm {
    password: String,
    csrf_token: String,
}

pub fn unlocked_surveys(session: &Session) -> Vec<i32> {
    match session.get::<Vec<i32>>(UNLOCKED_KEY) {
        Ok(ids) => ids.unwrap_or_default(),
        Err(e) => {
            log::warn!("unlocked_surveys: {}", e);
            Vec::new()
        }
    }
}

/// Moves `survey_id` to the most recent end of `ids` and drops the oldest
/// entries past `UNLOCKED_MAX`.
fn remember_unlocked(mut ids: Vec<i32>, survey_id: i32) -> Vec<i32> {
    ids.retain(|id| *id != survey_id);
    ids.push(survey_id);
    if ids.len() > UNLOCKED_MAX {
        ids.drain(..ids.len() - UNLOCKED_MAX);
    }
    ids
}

pub fn unlock_survey(session: &Session, survey_id: i32) -> Result<(), Error> {
    let ids = remember_unlocked(unlocked_surveys(session), survey_id);
    session
        .insert(UNLOCKED_KEY, ids)
        .map_err(|_| error::ErrorInternalServerError("middleware error"))
}

/// Whether the visitor may see the questions of `survey`.
pub fn is_unlocked(session: &Session, survey: &surveys::Model) -> bool {
    !survey.is_password_protected() || unlocked_surveys(session).contains(&survey.id)
}

pub fn unavailable_location(message: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(message.as_bytes()).collect();
    format!("/take/unavailable?message={}", encoded)
}

/// Where to send a visitor who cannot take the survey right now.
pub fn gate(session: &Session, graph: &SurveyGraph) -> Option<HttpResponse> {
    let availability = Availability::of(&graph.survey, Utc::now().naive_utc());
    if let Some(message) = availability.message() {
        return Some(redirect(&unavailable_location(&message)));
    }
    if !is_unlocked(session, &graph.survey) {
        return Some(redirect(&format!("/take/{}/password", graph.survey.id)));
    }
    None
}

#[get("/take/unavailable")]
pub async fn view_unavailable(
    client: ClientCtx,
    query: web::Query<UnavailableQuery>,
) -> impl Responder {
    UnavailableTemplate {
        client,
        message: query
            .message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "This survey is not available.".to_owned()),
    }
    .to_response()
}

#[get("/take/thanks/{response_id}")]
pub async fn view_thanks(client: ClientCtx, path: web::Path<i32>) -> Result<impl Responder, Error> {
    let db = get_db_pool();
    let response = responses::Entity::find_by_id(path.into_inner())
        .one(db)
        .await
        .map_err(|e| internal_error("view_thanks", e))?
        .ok_or_else(|| error::ErrorNotFound("Response not found."))?;
    let survey = surveys::Entity::find_by_id(response.survey_id)
        .one(db)
        .await
        .map_err(|e| internal_error("view_thanks", e))?
        .ok_or_else(|| error::ErrorNotFound("Survey not found."))?;

    Ok(ThanksTemplate {
        client,
        title: survey.title,
        is_anonymous: response.is_anonymous,
    }
    .to_response())
}

#[get("/take/{survey_id}")]
pub async fn view_take(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let graph = find_survey(path.into_inner()).await?;
    if let Some(detour) = gate(&cookies, &graph) {
        return Ok(detour);
    }

    Ok(TakeTemplate {
        client,
        survey: TakeSurvey::new(&graph),
        errors: Vec::new(),
    }
    .to_response())
}

#[post("/take/{survey_id}")]
pub async fn post_take(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<i32>,
    form: web::Form<Vec<(String, String)>>,
) -> Result<HttpResponse, Error> {
    let graph = find_survey(path.into_inner()).await?;
    validate_csrf_pairs(&cookies, &form)?;
    if let Some(detour) = gate(&cookies, &graph) {
        return Ok(detour);
    }

    let submission = SurveySubmission::from_pairs(&form).map_err(|e| {
        log::debug!("post_take: {}", e);
        error::ErrorBadRequest(e.to_string())
    })?;

    match submit_response(get_db_pool(), &graph, &submission, client.get_id()).await {
        Ok(response) => Ok(redirect(&format!("/take/thanks/{}", response.id))),
        Err(SubmissionError::Db(e)) => Err(internal_error("post_take", e)),
        Err(e) => {
            log::debug!("Submission for survey {} rejected: {}", graph.survey.id, e);
            Ok(TakeTemplate {
                client,
                survey: TakeSurvey::new(&graph).with_submission(&submission),
                errors: vec![e.to_string()],
            }
            .to_response())
        }
    }
}

#[get("/take/{survey_id}/password")]
pub async fn view_password(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let graph = find_survey(path.into_inner()).await?;
    if is_unlocked(&cookies, &graph.survey) {
        return Ok(redirect(&format!("/take/{}", graph.survey.id)));
    }

    Ok(PasswordTemplate {
        client,
        survey_id: graph.survey.id,
        title: graph.survey.title,
        error: None,
    }
    .to_response())
}

#[post("/take/{survey_id}/password")]
pub async fn post_password(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<i32>,
    form: web::Form<PasswordForm>,
) -> Result<HttpResponse, Error> {
    let graph = find_survey(path.into_inner()).await?;
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let matches = graph
        .survey
        .password_hash
        .as_deref()
        .map(|hash| verify_password(&form.password, hash))
        .unwrap_or(true);
    if !matches {
        return Ok(PasswordTemplate {
            client,
            survey_id: graph.survey.id,
            title: graph.survey.title,
            error: Some("Incorrect password. Please try again.".to_owned()),
        }
        .to_response());
    }

    unlock_survey(&cookies, graph.survey.id)?;
    Ok(redirect(&format!("/take/{}", graph.survey.id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_location_encodes_message() {
        assert_eq!(
            unavailable_location("This survey ended on March 05, 2025."),
            "/take/unavailable?message=This+survey+ended+on+March+05%2C+2025."
        );
    }

    #[test]
    fn test_remember_unlocked_keeps_most_recent() {
        let ids = remember_unlocked(vec![1, 2, 3], 2);
        assert_eq!(ids, vec![1, 3, 2]);

        let full: Vec<i32> = (1..=UNLOCKED_MAX as i32).collect();
        let ids = remember_unlocked(full, 999);
        assert_eq!(ids.len(), UNLOCKED_MAX);
        assert_eq!(ids.first(), Some(&2));
        assert_eq!(ids.last(), Some(&999));
    }
}
