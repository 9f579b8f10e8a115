//! Taking a survey: binding answers, checking them, and storing a response.

use super::SurveyGraph;
use crate::orm::questions::QuestionType;
use crate::orm::{answers, responses, surveys};
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
use std::collections::BTreeMap;

pub const RATING_MIN: i32 = 1;
pub const RATING_MAX: i32 = 5;
/// Longest text answer stored, in characters.
pub const ANSWER_TEXT_MAX: usize = 2000;

/// What a respondent entered for one question.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnswerSubmission {
    pub question_id: i32,
    pub selected_option: Option<i32>,
    pub selected_options: Vec<i32>,
    pub text: Option<String>,
    pub rating: Option<i32>,
}

impl AnswerSubmission {
    pub fn has_answer(&self, kind: QuestionType) -> bool {
        match kind {
            QuestionType::SingleChoice => self.selected_option.is_some(),
            QuestionType::MultipleChoice => !self.selected_options.is_empty(),
            QuestionType::Text => self
                .text
                .as_deref()
                .map(|t| !t.trim().is_empty())
                .unwrap_or(false),
            QuestionType::Rating => self.rating.is_some(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SurveySubmission {
    /// Keyed by question id.
    pub answers: BTreeMap<i32, AnswerSubmission>,
    pub is_anonymous: bool,
}

#[derive(Debug)]
pub enum SubmissionError {
    /// A field could not be parsed.
    Malformed(String),
    MissingRequired,
    ForeignOption { question_id: i32, option_id: i32 },
    RatingOutOfRange { question_id: i32, rating: i32 },
    AnswerTooLong { question_id: i32 },
    Db(DbErr),
}

impl std::fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionError::Malformed(key) => write!(f, "Invalid value for {}.", key),
            SubmissionError::MissingRequired => write!(f, "Please answer all required questions."),
            SubmissionError::ForeignOption { .. } => {
                write!(f, "One of the selected options is not part of this survey.")
            }
            SubmissionError::RatingOutOfRange { .. } => write!(
                f,
                "Ratings must be between {} and {}.",
                RATING_MIN, RATING_MAX
            ),
            SubmissionError::AnswerTooLong { .. } => write!(
                f,
                "Text answers can be at most {} characters long.",
                ANSWER_TEXT_MAX
            ),
            SubmissionError::Db(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for SubmissionError {}

impl From<DbErr> for SubmissionError {
    fn from(e: DbErr) -> Self {
        SubmissionError::Db(e)
    }
}

/// Splits `answers[12].option` into `(12, "option")`.
fn answer_key(key: &str) -> Option<(i32, &str)> {
    let rest = key.strip_prefix("answers[")?;
    let close = rest.find(']')?;
    let question_id = rest[..close].parse().ok()?;
    let field = rest[close + 1..].strip_prefix('.')?;
    Some((question_id, field))
}

fn parse_id(key: &str, value: &str) -> Result<i32, SubmissionError> {
    value
        .trim()
        .parse()
        .map_err(|_| SubmissionError::Malformed(key.to_owned()))
}

impl SurveySubmission {
    /// Binds posted pairs. Empty values are treated as not answered.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, SubmissionError> {
        let mut submission = SurveySubmission::default();

        for (key, value) in pairs {
            if key == "is_anonymous" {
                submission.is_anonymous |= matches!(value.as_str(), "on" | "true" | "1");
                continue;
            }
            let (question_id, field) = match answer_key(key) {
                Some(parts) => parts,
                None => continue,
            };
            let answer = submission
                .answers
                .entry(question_id)
                .or_insert_with(|| AnswerSubmission {
                    question_id,
                    ..Default::default()
                });
            let blank = value.trim().is_empty();

            match field {
                "option" if !blank => answer.selected_option = Some(parse_id(key, value)?),
                "options" if !blank => {
                    let id = parse_id(key, value)?;
                    if !answer.selected_options.contains(&id) {
                        answer.selected_options.push(id);
                    }
                }
                "text" => answer.text = Some(value.clone()),
                "rating" if !blank => answer.rating = Some(parse_id(key, value)?),
                _ => {}
            }
        }

        Ok(submission)
    }

    pub fn answer(&self, question_id: i32) -> Option<&AnswerSubmission> {
        self.answers.get(&question_id)
    }
}

/// An answer row about to be inserted.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedAnswer {
    pub question_id: i32,
    pub selected_option_id: Option<i32>,
    pub answer_text: Option<String>,
    pub rating_value: Option<i32>,
}

impl PlannedAnswer {
    fn option(question_id: i32, option_id: i32) -> Self {
        Self {
            question_id,
            selected_option_id: Some(option_id),
            answer_text: None,
            rating_value: None,
        }
    }
}

/// Checks a submission and turns it into answer rows.
/// Answers for questions outside the survey are dropped.
pub fn plan_answers(
    graph: &SurveyGraph,
    submission: &SurveySubmission,
) -> Result<Vec<PlannedAnswer>, SubmissionError> {
    for question in graph.questions.iter().filter(|q| q.question.is_required) {
        let answered = submission
            .answer(question.question.id)
            .map(|a| a.has_answer(question.question.question_type))
            .unwrap_or(false);
        if !answered {
            return Err(SubmissionError::MissingRequired);
        }
    }

    let mut rows = Vec::new();
    for question in &graph.questions {
        let question_id = question.question.id;
        let answer = match submission.answer(question_id) {
            Some(answer) => answer,
            None => continue,
        };

        let check_option = |option_id: i32| {
            if question.owns_option(option_id) {
                Ok(())
            } else {
                Err(SubmissionError::ForeignOption {
                    question_id,
                    option_id,
                })
            }
        };

        match question.question.question_type {
            QuestionType::SingleChoice => {
                if let Some(option_id) = answer.selected_option {
                    check_option(option_id)?;
                    rows.push(PlannedAnswer::option(question_id, option_id));
                }
            }
            QuestionType::MultipleChoice => {
                for option_id in &answer.selected_options {
                    check_option(*option_id)?;
                    rows.push(PlannedAnswer::option(question_id, *option_id));
                }
            }
            QuestionType::Text => {
                let text = answer.text.clone().unwrap_or_default();
                if text.chars().count() > ANSWER_TEXT_MAX {
                    return Err(SubmissionError::AnswerTooLong { question_id });
                }
                rows.push(PlannedAnswer {
                    question_id,
                    selected_option_id: None,
                    answer_text: Some(text),
                    rating_value: None,
                });
            }
            QuestionType::Rating => {
                if let Some(rating) = answer.rating {
                    if !(RATING_MIN..=RATING_MAX).contains(&rating) {
                        return Err(SubmissionError::RatingOutOfRange {
                            question_id,
                            rating,
                        });
                    }
                    rows.push(PlannedAnswer {
                        question_id,
                        selected_option_id: None,
                        answer_text: None,
                        rating_value: Some(rating),
                    });
                }
            }
        }
    }

    Ok(rows)
}

/// Who a response is recorded against: `(respondent_id, is_anonymous)`.
/// The anonymous box only counts when the survey allows it.
pub fn respondent_for(
    survey: &surveys::Model,
    wants_anonymous: bool,
    user_id: Option<i32>,
) -> (Option<i32>, bool) {
    let is_anonymous = survey.allow_anonymous && wants_anonymous;
    if is_anonymous {
        (None, true)
    } else {
        (user_id, false)
    }
}

/// Validates and stores a response with its answers.
pub async fn submit_response(
    db: &DatabaseConnection,
    graph: &SurveyGraph,
    submission: &SurveySubmission,
    user_id: Option<i32>,
) -> Result<responses::Model, SubmissionError> {
    let rows = plan_answers(graph, submission)?;
    let (respondent_id, is_anonymous) =
        respondent_for(&graph.survey, submission.is_anonymous, user_id);

    let txn = db.begin().await?;
    let response = responses::ActiveModel {
        survey_id: Set(graph.survey.id),
        respondent_id: Set(respondent_id),
        is_anonymous: Set(is_anonymous),
        submitted_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if !rows.is_empty() {
        let models = rows.into_iter().map(|row| answers::ActiveModel {
            response_id: Set(response.id),
            question_id: Set(row.question_id),
            selected_option_id: Set(row.selected_option_id),
            answer_text: Set(row.answer_text),
            rating_value: Set(row.rating_value),
            ..Default::default()
        });
        answers::Entity::insert_many(models).exec(&txn).await?;
    }
    txn.commit().await?;

    log::info!(
        "Response {} recorded for survey {}",
        response.id,
        graph.survey.id
    );
    Ok(response)
}
