//! Binding and validation of the survey builder form.
//!
//! The builder posts flat pairs with indexed keys:
//!
//! ```text
//! title=Team pulse
//! questions[0].text=How was your week?
//! questions[0].type=Rating
//! questions[1].type=SingleChoice
//! questions[1].options[0].text=Good
//! ```
//!
//! Indices only order rows; gaps left by removed rows are fine.

use crate::app_config::LimitsConfig;
use crate::orm::questions::QuestionType;
use crate::orm::surveys;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use validator::Validate;

#[derive(Clone, Debug, Default, Validate)]
pub struct OptionForm {
    /// Stored id, 0 for a new option.
    pub id: i32,
    #[validate(length(
        min = 1,
        max = 500,
        message = "Option text is required and must be at most 500 characters."
    ))]
    pub text: String,
}

#[derive(Clone, Debug, Default, Validate)]
pub struct QuestionForm {
    /// Stored id, 0 for a new question.
    pub id: i32,
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Question text is required and must be at most 1000 characters."
    ))]
    pub text: String,
    /// Raw type value as posted.
    pub question_type: String,
    pub is_required: bool,
    pub options: Vec<OptionForm>,
}

impl QuestionForm {
    pub fn kind(&self) -> Option<QuestionType> {
        QuestionType::parse(&self.question_type)
    }

    pub fn is_choice(&self) -> bool {
        self.kind().map(|k| k.is_choice()).unwrap_or(false)
    }
}

#[derive(Clone, Debug, Default, Validate)]
pub struct SurveyForm {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title is required and must be at most 200 characters."
    ))]
    pub title: String,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters."))]
    pub description: String,
    /// Raw `datetime-local` value, empty when unset.
    pub start_date: String,
    pub end_date: String,
    pub is_active: bool,
    pub allow_anonymous: bool,
    pub password: String,
    pub clear_password: bool,
    pub questions: Vec<QuestionForm>,
}

/// Accepts `datetime-local` values with or without seconds, and bare dates.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Formats a stored date for a `datetime-local` input.
pub fn format_date_input(date: Option<NaiveDateTime>) -> String {
    date.map(|d| d.format("%Y-%m-%dT%H:%M").to_string())
        .unwrap_or_default()
}

fn is_checked(value: &str) -> bool {
    matches!(value, "on" | "true" | "1" | "yes")
}

impl SurveyForm {
    /// Builds a form from posted pairs. Unknown keys are ignored.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut form = SurveyForm::default();
        let mut questions: BTreeMap<usize, (QuestionForm, BTreeMap<usize, OptionForm>)> =
            BTreeMap::new();

        for (key, value) in pairs {
            match key.as_str() {
                "title" => form.title = value.clone(),
                "description" => form.description = value.clone(),
                "start_date" => form.start_date = value.clone(),
                "end_date" => form.end_date = value.clone(),
                "password" => form.password = value.clone(),
                "is_active" => form.is_active |= is_checked(value),
                "allow_anonymous" => form.allow_anonymous |= is_checked(value),
                "clear_password" => form.clear_password |= is_checked(value),
                _ => {
                    let (index, field) = match indexed(key, "questions") {
                        Some(parts) => parts,
                        None => continue,
                    };
                    let (question, options) = questions.entry(index).or_default();
                    match field {
                        "id" => question.id = value.trim().parse().unwrap_or(0),
                        "text" => question.text = value.clone(),
                        "type" => question.question_type = value.clone(),
                        "required" => question.is_required |= is_checked(value),
                        _ => {
                            if let Some((option_index, option_field)) = indexed(field, "options") {
                                let option = options.entry(option_index).or_default();
                                match option_field {
                                    "id" => option.id = value.trim().parse().unwrap_or(0),
                                    "text" => option.text = value.clone(),
                                    _ => {}
                                }
                            }
                        }
                    }
                }
            }
        }

        form.questions = questions
            .into_values()
            .map(|(mut question, options)| {
                // Options only mean something on choice questions.
                if question.is_choice() {
                    question.options = options.into_values().collect();
                }
                question
            })
            .collect();
        form
    }

    /// Prefills the builder from a stored survey.
    pub fn from_graph(graph: &super::SurveyGraph) -> Self {
        let survey: &surveys::Model = &graph.survey;
        SurveyForm {
            title: survey.title.clone(),
            description: survey.description.clone(),
            start_date: format_date_input(survey.start_date),
            end_date: format_date_input(survey.end_date),
            is_active: survey.is_active,
            allow_anonymous: survey.allow_anonymous,
            password: String::new(),
            clear_password: false,
            questions: graph
                .questions
                .iter()
                .map(|q| QuestionForm {
                    id: q.question.id,
                    text: q.question.question_text.clone(),
                    question_type: q.question.question_type.as_str().to_owned(),
                    is_required: q.question.is_required,
                    options: q
                        .options
                        .iter()
                        .map(|o| OptionForm {
                            id: o.id,
                            text: o.option_text.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// A fresh builder with one empty question.
    pub fn blank() -> Self {
        SurveyForm {
            is_active: true,
            questions: vec![QuestionForm {
                question_type: QuestionType::SingleChoice.as_str().to_owned(),
                options: vec![OptionForm::default(), OptionForm::default()],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        parse_date(&self.start_date)
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        parse_date(&self.end_date)
    }

    /// Every problem with the form. Empty when the form may be saved.
    pub fn errors(&self, limits: &LimitsConfig) -> Vec<String> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => crate::validation::messages(&e),
        };
        // Whitespace-only titles pass the length rule.
        if !self.title.is_empty() && self.title.trim().is_empty() {
            errors.push("Title is required and must be at most 200 characters.".to_owned());
        }

        if !self.start_date.trim().is_empty() && self.start().is_none() {
            errors.push("Start date is not a valid date.".to_owned());
        }
        if !self.end_date.trim().is_empty() && self.end().is_none() {
            errors.push("End date is not a valid date.".to_owned());
        }
        if let (Some(start), Some(end)) = (self.start(), self.end()) {
            if end < start {
                errors.push("End date must be after the start date.".to_owned());
            }
        }

        if self.questions.is_empty() {
            errors.push("Add at least one question.".to_owned());
        }
        if self.questions.len() > limits.max_questions as usize {
            errors.push(format!(
                "A survey may have at most {} questions.",
                limits.max_questions
            ));
        }

        for (position, question) in self.questions.iter().enumerate() {
            let label = format!("Question {}", position + 1);
            let mut problems = match question.validate() {
                Ok(()) => Vec::new(),
                Err(e) => crate::validation::messages(&e),
            };
            if !question.text.is_empty() && question.text.trim().is_empty() {
                problems.push("Question text is required and must be at most 1000 characters.".to_owned());
            }

            match question.kind() {
                None => problems.push("Choose a question type.".to_owned()),
                Some(kind) if kind.is_choice() => {
                    if question.options.is_empty() {
                        problems.push("Choice questions need at least one option.".to_owned());
                    }
                    if question.options.len() > limits.max_options as usize {
                        problems.push(format!(
                            "A question may have at most {} options.",
                            limits.max_options
                        ));
                    }
                    for option in &question.options {
                        if let Err(e) = option.validate() {
                            problems.extend(crate::validation::messages(&e));
                        } else if option.text.trim().is_empty() {
                            problems.push(
                                "Option text is required and must be at most 500 characters."
                                    .to_owned(),
                            );
                        }
                    }
                }
                Some(_) => {}
            }

            problems.dedup();
            errors.extend(problems.into_iter().map(|p| format!("{}: {}", label, p)));
        }

        errors
    }
}

/// Splits `prefix[N].rest` into `(N, "rest")`.
fn indexed<'a>(key: &'a str, prefix: &str) -> Option<(usize, &'a str)> {
    let rest = key.strip_prefix(prefix)?.strip_prefix('[')?;
    let close = rest.find(']')?;
    let index = rest[..close].parse().ok()?;
    let field = rest[close + 1..].strip_prefix('.')?;
    Some((index, field))
}
