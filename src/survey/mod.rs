//! Surveys and everything hanging off them.
//!
//! A survey is the aggregate root: its questions, answer options, responses
//! and answers are created, edited and deleted through the functions here,
//! each multi-row mutation inside one transaction.

pub mod dashboard;
pub mod edit;
pub mod form;
pub mod responses;
pub mod results;
pub mod submission;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

use crate::orm::{answer_options, answers, questions, responses as response_rows, surveys};
use chrono::{NaiveDateTime, Utc};
use sea_orm::{entity::*, query::*, ConnectionTrait, DatabaseConnection, DbErr};
use std::collections::HashMap;

pub use edit::{plan_edit, EditPlan};
pub use form::SurveyForm;

/// Lifecycle state shown to survey owners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurveyStatus {
    Inactive,
    Scheduled,
    Expired,
    Active,
}

impl SurveyStatus {
    pub fn of(survey: &surveys::Model, now: NaiveDateTime) -> Self {
        if !survey.is_active {
            return SurveyStatus::Inactive;
        }
        if matches!(survey.start_date, Some(start) if start > now) {
            return SurveyStatus::Scheduled;
        }
        if matches!(survey.end_date, Some(end) if end < now) {
            return SurveyStatus::Expired;
        }
        SurveyStatus::Active
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SurveyStatus::Inactive => "Inactive",
            SurveyStatus::Scheduled => "Scheduled",
            SurveyStatus::Expired => "Expired",
            SurveyStatus::Active => "Active",
        }
    }
}

impl std::fmt::Display for SurveyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a respondent may take a survey right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Availability {
    Open,
    Inactive,
    NotStarted(NaiveDateTime),
    Ended(NaiveDateTime),
}

impl Availability {
    pub fn of(survey: &surveys::Model, now: NaiveDateTime) -> Self {
        if !survey.is_active {
            return Availability::Inactive;
        }
        if let Some(start) = survey.start_date {
            if start > now {
                return Availability::NotStarted(start);
            }
        }
        if let Some(end) = survey.end_date {
            if end < now {
                return Availability::Ended(end);
            }
        }
        Availability::Open
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Availability::Open)
    }

    /// Message for the not-available page. None when open.
    pub fn message(&self) -> Option<String> {
        match self {
            Availability::Open => None,
            Availability::Inactive => Some("This survey is not currently active.".to_owned()),
            Availability::NotStarted(start) => Some(format!(
                "This survey will be available starting {}.",
                long_date(start)
            )),
            Availability::Ended(end) => Some(format!("This survey ended on {}.", long_date(end))),
        }
    }
}

/// "March 05, 2025"
pub fn long_date(date: &NaiveDateTime) -> String {
    date.format("%B %d, %Y").to_string()
}

/// A question with its answer options, both in display order.
#[derive(Clone, Debug)]
pub struct QuestionGraph {
    pub question: questions::Model,
    pub options: Vec<answer_options::Model>,
}

impl QuestionGraph {
    pub fn owns_option(&self, option_id: i32) -> bool {
        self.options.iter().any(|o| o.id == option_id)
    }

    pub fn option_text(&self, option_id: i32) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.id == option_id)
            .map(|o| o.option_text.as_str())
    }
}

/// A survey with its questions and options loaded.
#[derive(Clone, Debug)]
pub struct SurveyGraph {
    pub survey: surveys::Model,
    pub questions: Vec<QuestionGraph>,
}

impl SurveyGraph {
    pub fn question(&self, question_id: i32) -> Option<&QuestionGraph> {
        self.questions.iter().find(|q| q.question.id == question_id)
    }

    pub fn required_question_ids(&self) -> Vec<i32> {
        self.questions
            .iter()
            .filter(|q| q.question.is_required)
            .map(|q| q.question.id)
            .collect()
    }
}

pub async fn load_graph<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<SurveyGraph>, DbErr> {
    let survey = match surveys::Entity::find_by_id(id).one(db).await? {
        Some(survey) => survey,
        None => return Ok(None),
    };

    let question_rows = questions::Entity::find()
        .filter(questions::Column::SurveyId.eq(id))
        .order_by_asc(questions::Column::SortOrder)
        .order_by_asc(questions::Column::Id)
        .all(db)
        .await?;

    let question_ids: Vec<i32> = question_rows.iter().map(|q| q.id).collect();
    let mut options_by_question: HashMap<i32, Vec<answer_options::Model>> = HashMap::new();
    if !question_ids.is_empty() {
        for option in answer_options::Entity::find()
            .filter(answer_options::Column::QuestionId.is_in(question_ids))
            .order_by_asc(answer_options::Column::SortOrder)
            .order_by_asc(answer_options::Column::Id)
            .all(db)
            .await?
        {
            options_by_question
                .entry(option.question_id)
                .or_default()
                .push(option);
        }
    }

    let questions = question_rows
        .into_iter()
        .map(|question| QuestionGraph {
            options: options_by_question.remove(&question.id).unwrap_or_default(),
            question,
        })
        .collect();

    Ok(Some(SurveyGraph { survey, questions }))
}

fn hash_survey_password(password: &str) -> Result<String, DbErr> {
    crate::session::hash_password(password)
        .map_err(|e| DbErr::Custom(format!("Password hashing failed: {}", e)))
}

/// Inserts a survey with its questions and options. `form` must be valid.
pub async fn create_survey(
    db: &DatabaseConnection,
    creator_id: i32,
    form: &SurveyForm,
) -> Result<surveys::Model, DbErr> {
    let password_hash = if form.password.is_empty() {
        None
    } else {
        Some(hash_survey_password(&form.password)?)
    };

    let txn = db.begin().await?;

    let survey = surveys::ActiveModel {
        title: Set(form.title.trim().to_owned()),
        description: Set(form.description.trim().to_owned()),
        creator_id: Set(creator_id),
        created_at: Set(Utc::now().naive_utc()),
        start_date: Set(form.start()),
        end_date: Set(form.end()),
        is_active: Set(form.is_active),
        allow_anonymous: Set(form.allow_anonymous),
        password_hash: Set(password_hash),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for (position, question_form) in form.questions.iter().enumerate() {
        let kind = question_form.kind().unwrap_or(questions::QuestionType::Text);
        let question = questions::ActiveModel {
            survey_id: Set(survey.id),
            question_text: Set(question_form.text.trim().to_owned()),
            question_type: Set(kind),
            sort_order: Set(position as i32),
            is_required: Set(question_form.is_required),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        if kind.is_choice() {
            for (option_position, option_form) in question_form.options.iter().enumerate() {
                answer_options::ActiveModel {
                    question_id: Set(question.id),
                    option_text: Set(option_form.text.trim().to_owned()),
                    sort_order: Set(option_position as i32),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }
    }

    txn.commit().await?;

    log::info!(
        "Survey {} created by user {} with {} questions",
        survey.id,
        creator_id,
        form.questions.len()
    );
    Ok(survey)
}

async fn delete_questions<C: ConnectionTrait>(db: &C, question_ids: Vec<i32>) -> Result<(), DbErr> {
    if question_ids.is_empty() {
        return Ok(());
    }
    answers::Entity::delete_many()
        .filter(answers::Column::QuestionId.is_in(question_ids.clone()))
        .exec(db)
        .await?;
    answer_options::Entity::delete_many()
        .filter(answer_options::Column::QuestionId.is_in(question_ids.clone()))
        .exec(db)
        .await?;
    questions::Entity::delete_many()
        .filter(questions::Column::Id.is_in(question_ids))
        .exec(db)
        .await?;
    Ok(())
}

async fn delete_options<C: ConnectionTrait>(db: &C, option_ids: Vec<i32>) -> Result<(), DbErr> {
    if option_ids.is_empty() {
        return Ok(());
    }
    answers::Entity::delete_many()
        .filter(answers::Column::SelectedOptionId.is_in(option_ids.clone()))
        .exec(db)
        .await?;
    answer_options::Entity::delete_many()
        .filter(answer_options::Column::Id.is_in(option_ids))
        .exec(db)
        .await?;
    Ok(())
}

/// Applies an edited form to a stored survey. `form` must be valid.
pub async fn update_survey(
    db: &DatabaseConnection,
    graph: &SurveyGraph,
    form: &SurveyForm,
) -> Result<(), DbErr> {
    let plan = plan_edit(graph, form);

    let new_hash = if form.password.is_empty() {
        None
    } else {
        Some(hash_survey_password(&form.password)?)
    };

    let txn = db.begin().await?;

    let mut survey: surveys::ActiveModel = graph.survey.clone().into();
    survey.title = Set(form.title.trim().to_owned());
    survey.description = Set(form.description.trim().to_owned());
    survey.start_date = Set(form.start());
    survey.end_date = Set(form.end());
    survey.is_active = Set(form.is_active);
    survey.allow_anonymous = Set(form.allow_anonymous);
    if new_hash.is_some() {
        survey.password_hash = Set(new_hash);
    } else if form.clear_password {
        survey.password_hash = Set(None);
    }
    survey.update(&txn).await?;

    delete_questions(&txn, plan.delete_questions.clone()).await?;

    for planned in &plan.questions {
        let question_id = match planned.id {
            Some(id) => {
                questions::ActiveModel {
                    id: Unchanged(id),
                    survey_id: Unchanged(graph.survey.id),
                    question_text: Set(planned.text.clone()),
                    question_type: Set(planned.question_type),
                    sort_order: Set(planned.sort_order),
                    is_required: Set(planned.is_required),
                }
                .update(&txn)
                .await?;
                id
            }
            None => {
                questions::ActiveModel {
                    survey_id: Set(graph.survey.id),
                    question_text: Set(planned.text.clone()),
                    question_type: Set(planned.question_type),
                    sort_order: Set(planned.sort_order),
                    is_required: Set(planned.is_required),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
                .id
            }
        };

        delete_options(&txn, planned.delete_options.clone()).await?;

        for option in &planned.options {
            match option.id {
                Some(id) => {
                    answer_options::ActiveModel {
                        id: Unchanged(id),
                        question_id: Unchanged(question_id),
                        option_text: Set(option.text.clone()),
                        sort_order: Set(option.sort_order),
                    }
                    .update(&txn)
                    .await?;
                }
                None => {
                    answer_options::ActiveModel {
                        question_id: Set(question_id),
                        option_text: Set(option.text.clone()),
                        sort_order: Set(option.sort_order),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await?;
                }
            }
        }
    }

    txn.commit().await?;

    log::info!(
        "Survey {} updated: {} questions kept or added, {} removed",
        graph.survey.id,
        plan.questions.len(),
        plan.delete_questions.len()
    );
    Ok(())
}

/// Deletes a survey with its questions, options, responses and answers.
/// Returns false when no such survey exists.
pub async fn delete_survey(db: &DatabaseConnection, id: i32) -> Result<bool, DbErr> {
    let txn = db.begin().await?;

    let response_ids: Vec<i32> = response_rows::Entity::find()
        .filter(response_rows::Column::SurveyId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();
    if !response_ids.is_empty() {
        answers::Entity::delete_many()
            .filter(answers::Column::ResponseId.is_in(response_ids.clone()))
            .exec(&txn)
            .await?;
        response_rows::Entity::delete_many()
            .filter(response_rows::Column::Id.is_in(response_ids))
            .exec(&txn)
            .await?;
    }

    let question_ids: Vec<i32> = questions::Entity::find()
        .filter(questions::Column::SurveyId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|q| q.id)
        .collect();
    delete_questions(&txn, question_ids).await?;

    let res = surveys::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    Ok(res.rows_affected > 0)
}

/// Which surveys a listing covers.
#[derive(Clone, Copy, Debug)]
pub enum Scope {
    All,
    Owner(i32),
}

/// Surveys newest first, with question and response counts.
pub async fn list_surveys<C: ConnectionTrait>(
    db: &C,
    scope: Scope,
) -> Result<Vec<view::SurveyListItem>, DbErr> {
    let mut query = surveys::Entity::find();
    if let Scope::Owner(user_id) = scope {
        query = query.filter(surveys::Column::CreatorId.eq(user_id));
    }
    let rows = query
        .order_by_desc(surveys::Column::CreatedAt)
        .order_by_desc(surveys::Column::Id)
        .all(db)
        .await?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = rows.iter().map(|s| s.id).collect();
    let mut question_counts: HashMap<i32, usize> = HashMap::new();
    for q in questions::Entity::find()
        .filter(questions::Column::SurveyId.is_in(ids.clone()))
        .all(db)
        .await?
    {
        *question_counts.entry(q.survey_id).or_default() += 1;
    }
    let mut response_counts: HashMap<i32, usize> = HashMap::new();
    for r in response_rows::Entity::find()
        .filter(response_rows::Column::SurveyId.is_in(ids))
        .all(db)
        .await?
    {
        *response_counts.entry(r.survey_id).or_default() += 1;
    }

    let now = Utc::now().naive_utc();
    Ok(rows
        .into_iter()
        .map(|survey| {
            let questions = question_counts.get(&survey.id).copied().unwrap_or(0);
            let responses = response_counts.get(&survey.id).copied().unwrap_or(0);
            view::SurveyListItem::new(&survey, questions, responses, now)
        })
        .collect())
}

/// Number of responses recorded for a survey.
pub async fn count_responses<C: ConnectionTrait>(db: &C, survey_id: i32) -> Result<usize, DbErr> {
    response_rows::Entity::find()
        .filter(response_rows::Column::SurveyId.eq(survey_id))
        .count(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::testing::{at, survey};
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_precedence() {
        let now = at(2025, 6, 1);
        let mut survey = survey(1);
        assert_eq!(SurveyStatus::of(&survey, now), SurveyStatus::Active);

        survey.end_date = Some(now - Duration::days(1));
        assert_eq!(SurveyStatus::of(&survey, now), SurveyStatus::Expired);

        // A future start wins over a past end.
        survey.start_date = Some(now + Duration::days(1));
        assert_eq!(SurveyStatus::of(&survey, now), SurveyStatus::Scheduled);

        survey.is_active = false;
        assert_eq!(SurveyStatus::of(&survey, now), SurveyStatus::Inactive);
    }

    #[test]
    fn test_availability_messages() {
        let now = at(2025, 6, 1);
        let mut survey = survey(1);
        assert!(Availability::of(&survey, now).is_open());
        assert_eq!(Availability::of(&survey, now).message(), None);

        survey.start_date = Some(at(2025, 7, 4));
        assert_eq!(
            Availability::of(&survey, now).message().unwrap(),
            "This survey will be available starting July 04, 2025."
        );

        survey.start_date = None;
        survey.end_date = Some(at(2025, 3, 15));
        assert_eq!(
            Availability::of(&survey, now).message().unwrap(),
            "This survey ended on March 15, 2025."
        );

        survey.is_active = false;
        assert_eq!(
            Availability::of(&survey, now).message().unwrap(),
            "This survey is not currently active."
        );
    }

    #[test]
    fn test_password_protection_flag() {
        let mut survey = survey(1);
        assert!(!survey.is_password_protected());
        survey.password_hash = Some(String::new());
        assert!(!survey.is_password_protected());
        survey.password_hash = Some("$argon2id$v=19$...".to_owned());
        assert!(survey.is_password_protected());
    }
}
