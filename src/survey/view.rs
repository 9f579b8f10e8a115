//! Display shapes for the survey pages.
//!
//! Templates only read plain fields, so dates are formatted and indices
//! computed here.

use super::form::SurveyForm;
use super::submission::{SurveySubmission, RATING_MAX, RATING_MIN};
use super::{SurveyGraph, SurveyStatus};
use crate::orm::questions::QuestionType;
use crate::orm::surveys;
use chrono::NaiveDateTime;

fn short_date(date: Option<NaiveDateTime>) -> String {
    date.map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_owned())
}

#[derive(Clone, Debug)]
pub struct SurveyListItem {
    pub id: i32,
    pub title: String,
    pub created_at: String,
    pub start_date: String,
    pub end_date: String,
    pub status: SurveyStatus,
    pub question_count: usize,
    pub response_count: usize,
}

impl SurveyListItem {
    pub fn new(
        survey: &surveys::Model,
        question_count: usize,
        response_count: usize,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id: survey.id,
            title: survey.title.clone(),
            created_at: survey.created_at.format("%Y-%m-%d").to_string(),
            start_date: short_date(survey.start_date),
            end_date: short_date(survey.end_date),
            status: SurveyStatus::of(survey, now),
            question_count,
            response_count,
        }
    }

    /// CSS modifier for the status badge.
    pub fn status_class(&self) -> &'static str {
        match self.status {
            SurveyStatus::Active => "status-active",
            SurveyStatus::Scheduled => "status-scheduled",
            SurveyStatus::Expired => "status-expired",
            SurveyStatus::Inactive => "status-inactive",
        }
    }
}

#[derive(Clone, Debug)]
pub struct QuestionView {
    pub number: usize,
    pub text: String,
    pub type_label: &'static str,
    pub is_required: bool,
    pub options: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct SurveyDetails {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub created_at: String,
    pub start_date: String,
    pub end_date: String,
    pub is_active: bool,
    pub allow_anonymous: bool,
    pub is_password_protected: bool,
    pub status: SurveyStatus,
    pub response_count: usize,
    pub questions: Vec<QuestionView>,
}

impl SurveyDetails {
    pub fn new(graph: &SurveyGraph, response_count: usize, now: NaiveDateTime) -> Self {
        let survey = &graph.survey;
        Self {
            id: survey.id,
            title: survey.title.clone(),
            description: survey.description.clone(),
            created_at: short_date(Some(survey.created_at)),
            start_date: short_date(survey.start_date),
            end_date: short_date(survey.end_date),
            is_active: survey.is_active,
            allow_anonymous: survey.allow_anonymous,
            is_password_protected: survey.is_password_protected(),
            status: SurveyStatus::of(survey, now),
            response_count,
            questions: graph
                .questions
                .iter()
                .enumerate()
                .map(|(i, q)| QuestionView {
                    number: i + 1,
                    text: q.question.question_text.clone(),
                    type_label: q.question.question_type.label(),
                    is_required: q.question.is_required,
                    options: q.options.iter().map(|o| o.option_text.clone()).collect(),
                })
                .collect(),
        }
    }

    pub fn take_link(&self) -> String {
        format!("/take/{}", self.id)
    }
}

#[derive(Clone, Debug)]
pub struct TakeOption {
    pub id: i32,
    pub text: String,
    pub checked: bool,
}

#[derive(Clone, Debug)]
pub struct TakeRating {
    pub value: i32,
    pub checked: bool,
}

#[derive(Clone, Debug)]
pub struct TakeQuestion {
    pub id: i32,
    pub number: usize,
    pub text: String,
    pub kind: QuestionType,
    pub is_required: bool,
    pub options: Vec<TakeOption>,
    pub ratings: Vec<TakeRating>,
    pub text_value: String,
}

impl TakeQuestion {
    pub fn is_single(&self) -> bool {
        self.kind == QuestionType::SingleChoice
    }

    pub fn is_multiple(&self) -> bool {
        self.kind == QuestionType::MultipleChoice
    }

    pub fn is_text(&self) -> bool {
        self.kind == QuestionType::Text
    }

    pub fn is_rating(&self) -> bool {
        self.kind == QuestionType::Rating
    }
}

/// The survey as shown to a respondent.
#[derive(Clone, Debug)]
pub struct TakeSurvey {
    pub survey_id: i32,
    pub title: String,
    pub description: String,
    pub allow_anonymous: bool,
    pub is_anonymous: bool,
    pub questions: Vec<TakeQuestion>,
}

impl TakeSurvey {
    pub fn new(graph: &SurveyGraph) -> Self {
        Self {
            survey_id: graph.survey.id,
            title: graph.survey.title.clone(),
            description: graph.survey.description.clone(),
            allow_anonymous: graph.survey.allow_anonymous,
            is_anonymous: false,
            questions: graph
                .questions
                .iter()
                .enumerate()
                .map(|(i, q)| TakeQuestion {
                    id: q.question.id,
                    number: i + 1,
                    text: q.question.question_text.clone(),
                    kind: q.question.question_type,
                    is_required: q.question.is_required,
                    options: q
                        .options
                        .iter()
                        .map(|o| TakeOption {
                            id: o.id,
                            text: o.option_text.clone(),
                            checked: false,
                        })
                        .collect(),
                    ratings: (RATING_MIN..=RATING_MAX)
                        .map(|value| TakeRating {
                            value,
                            checked: false,
                        })
                        .collect(),
                    text_value: String::new(),
                })
                .collect(),
        }
    }

    /// Restores what the respondent entered before a failed submission.
    pub fn with_submission(mut self, submission: &SurveySubmission) -> Self {
        self.is_anonymous = submission.is_anonymous;
        for question in &mut self.questions {
            let answer = match submission.answer(question.id) {
                Some(answer) => answer,
                None => continue,
            };
            for option in &mut question.options {
                option.checked = answer.selected_option == Some(option.id)
                    || answer.selected_options.contains(&option.id);
            }
            for rating in &mut question.ratings {
                rating.checked = answer.rating == Some(rating.value);
            }
            question.text_value = answer.text.clone().unwrap_or_default();
        }
        self
    }
}

#[derive(Clone, Debug)]
pub struct BuilderOption {
    pub index: usize,
    pub id: i32,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct TypeChoice {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Clone, Debug)]
pub struct BuilderQuestion {
    pub index: usize,
    pub id: i32,
    pub text: String,
    pub is_required: bool,
    pub is_choice: bool,
    pub types: Vec<TypeChoice>,
    pub options: Vec<BuilderOption>,
}

/// The builder form, for both create and edit.
#[derive(Clone, Debug)]
pub struct EditSurvey {
    pub title: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub is_active: bool,
    pub allow_anonymous: bool,
    pub has_password: bool,
    pub questions: Vec<BuilderQuestion>,
}

impl EditSurvey {
    pub fn new(form: &SurveyForm, has_password: bool) -> Self {
        Self {
            title: form.title.clone(),
            description: form.description.clone(),
            start_date: form.start_date.clone(),
            end_date: form.end_date.clone(),
            is_active: form.is_active,
            allow_anonymous: form.allow_anonymous,
            has_password,
            questions: form
                .questions
                .iter()
                .enumerate()
                .map(|(index, q)| BuilderQuestion {
                    index,
                    id: q.id,
                    text: q.text.clone(),
                    is_required: q.is_required,
                    is_choice: q.is_choice(),
                    types: QuestionType::ALL
                        .iter()
                        .map(|t| TypeChoice {
                            value: t.as_str(),
                            label: t.label(),
                            selected: t.as_str() == q.question_type,
                        })
                        .collect(),
                    options: q
                        .options
                        .iter()
                        .enumerate()
                        .map(|(index, o)| BuilderOption {
                            index,
                            id: o.id,
                            text: o.text.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Index for the next question row added by the builder script.
    pub fn next_index(&self) -> usize {
        self.questions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::testing::*;

    #[test]
    fn test_list_item_status_and_dates() {
        let mut survey = survey(4);
        survey.end_date = Some(at(2025, 1, 2));
        let item = SurveyListItem::new(&survey, 3, 9, at(2025, 6, 1));
        assert_eq!(item.status, SurveyStatus::Expired);
        assert_eq!(item.status_class(), "status-expired");
        assert_eq!(item.start_date, "-");
        assert_eq!(item.end_date, "2025-01-02 12:00");
        assert_eq!(item.created_at, "2025-01-01");
        assert_eq!((item.question_count, item.response_count), (3, 9));
    }

    #[test]
    fn test_take_survey_restores_answers() {
        let g = graph(vec![
            question(1, QuestionType::SingleChoice, true, &["Yes", "No"]),
            question(2, QuestionType::Rating, false, &[]),
            question(3, QuestionType::Text, false, &[]),
        ]);
        let pairs: Vec<(String, String)> = vec![
            ("answers[1].option".to_owned(), "11".to_owned()),
            ("answers[2].rating".to_owned(), "4".to_owned()),
            ("answers[3].text".to_owned(), "draft".to_owned()),
        ];
        let submission = SurveySubmission::from_pairs(&pairs).unwrap();
        let view = TakeSurvey::new(&g).with_submission(&submission);

        assert!(view.questions[0].is_single());
        assert!(!view.questions[0].options[0].checked);
        assert!(view.questions[0].options[1].checked);
        assert_eq!(view.questions[1].ratings.len(), 5);
        assert!(view.questions[1].ratings[3].checked);
        assert_eq!(view.questions[2].text_value, "draft");
    }

    #[test]
    fn test_details_and_builder_from_graph() {
        let mut g = graph(vec![question(1, QuestionType::MultipleChoice, true, &["A", "B"])]);
        g.survey.password_hash = Some("hash".to_owned());
        let details = SurveyDetails::new(&g, 2, at(2025, 6, 1));
        assert!(details.is_password_protected);
        assert_eq!(details.questions[0].type_label, "Multiple Choice");
        assert_eq!(details.take_link(), "/take/1");

        let builder = EditSurvey::new(&SurveyForm::from_graph(&g), details.is_password_protected);
        assert!(builder.has_password);
        assert!(builder.questions[0].is_choice);
        assert_eq!(builder.questions[0].options[1].index, 1);
        assert!(builder.questions[0]
            .types
            .iter()
            .any(|t| t.selected && t.value == "MultipleChoice"));
        assert_eq!(builder.next_index(), 1);
    }
}
