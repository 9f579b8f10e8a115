//! Test fixtures for creating test data
#![allow(dead_code)]

use canvass::orm::{surveys, users};
use canvass::survey::{self, SurveyForm, SurveyGraph};
use sea_orm::{DatabaseConnection, DbErr};

/// Create a test user with known credentials
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<users::Model, DbErr> {
    canvass::create_user::insert_new_user(db, username, password, None)
        .await
        .map_err(|e| DbErr::Custom(e.to_string()))
}

/// Create a test user holding `role`.
pub async fn create_test_user_with_role(
    db: &DatabaseConnection,
    username: &str,
    role: &str,
) -> Result<users::Model, DbErr> {
    let user = create_test_user(db, username, "password123").await?;
    canvass::role::grant_role(db, user.id, role)
        .await
        .map_err(|e| DbErr::Custom(e.to_string()))?;
    Ok(user)
}

/// Owned form pairs, as the browser would post them.
pub fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
    raw.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A survey with one question of each type:
/// a required single choice, a multiple choice, a text and a required rating.
pub fn sample_form() -> SurveyForm {
    SurveyForm::from_pairs(&pairs(&[
        ("title", "Team Feedback"),
        ("description", "Quarterly check-in"),
        ("is_active", "true"),
        ("allow_anonymous", "true"),
        ("questions[0].id", "0"),
        ("questions[0].text", "Enjoying the work?"),
        ("questions[0].type", "SingleChoice"),
        ("questions[0].required", "true"),
        ("questions[0].options[0].id", "0"),
        ("questions[0].options[0].text", "Yes"),
        ("questions[0].options[1].id", "0"),
        ("questions[0].options[1].text", "No"),
        ("questions[1].id", "0"),
        ("questions[1].text", "Which tools do you use?"),
        ("questions[1].type", "MultipleChoice"),
        ("questions[1].options[0].id", "0"),
        ("questions[1].options[0].text", "Editor"),
        ("questions[1].options[1].id", "0"),
        ("questions[1].options[1].text", "Terminal"),
        ("questions[1].options[2].id", "0"),
        ("questions[1].options[2].text", "Browser"),
        ("questions[2].id", "0"),
        ("questions[2].text", "Anything else?"),
        ("questions[2].type", "Text"),
        ("questions[3].id", "0"),
        ("questions[3].text", "Rate the quarter"),
        ("questions[3].type", "Rating"),
        ("questions[3].required", "true"),
    ]))
}

/// Stores `sample_form` for `creator_id` and loads it back.
pub async fn create_sample_survey(
    db: &DatabaseConnection,
    creator_id: i32,
) -> Result<SurveyGraph, DbErr> {
    let survey: surveys::Model = survey::create_survey(db, creator_id, &sample_form()).await?;
    survey::load_graph(db, survey.id)
        .await?
        .ok_or_else(|| DbErr::Custom("survey vanished after insert".to_owned()))
}

/// Submission pairs answering the sample survey.
/// `choice` is the index of the single choice option, `rating` the rating.
pub fn sample_answers(graph: &SurveyGraph, choice: usize, rating: i32) -> Vec<(String, String)> {
    let q = &graph.questions;
    vec![
        (
            format!("answers[{}].option", q[0].question.id),
            q[0].options[choice].id.to_string(),
        ),
        (
            format!("answers[{}].options", q[1].question.id),
            q[1].options[0].id.to_string(),
        ),
        (
            format!("answers[{}].options", q[1].question.id),
            q[1].options[2].id.to_string(),
        ),
        (
            format!("answers[{}].text", q[2].question.id),
            "Keep it up".to_owned(),
        ),
        (
            format!("answers[{}].rating", q[3].question.id),
            rating.to_string(),
        ),
    ]
}
