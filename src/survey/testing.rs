//! Graph builders shared by the unit tests of the survey modules.

use super::{QuestionGraph, SurveyGraph};
use crate::orm::questions::QuestionType;
use crate::orm::{answer_options, answers, questions, responses, surveys};
use chrono::{NaiveDate, NaiveDateTime};

pub fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

pub fn survey(id: i32) -> surveys::Model {
    surveys::Model {
        id,
        title: format!("Survey {}", id),
        description: String::new(),
        creator_id: 1,
        created_at: at(2025, 1, 1),
        start_date: None,
        end_date: None,
        is_active: true,
        allow_anonymous: false,
        password_hash: None,
    }
}

/// A question whose options get ids `id * 10 + n`.
pub fn question(
    id: i32,
    kind: QuestionType,
    required: bool,
    option_texts: &[&str],
) -> QuestionGraph {
    QuestionGraph {
        question: questions::Model {
            id,
            survey_id: 1,
            question_text: format!("Question {}", id),
            question_type: kind,
            sort_order: id - 1,
            is_required: required,
        },
        options: option_texts
            .iter()
            .enumerate()
            .map(|(n, text)| answer_options::Model {
                id: id * 10 + n as i32,
                question_id: id,
                option_text: text.to_string(),
                sort_order: n as i32,
            })
            .collect(),
    }
}

pub fn graph(questions: Vec<QuestionGraph>) -> SurveyGraph {
    SurveyGraph {
        survey: survey(1),
        questions,
    }
}

pub fn response(id: i32, respondent_id: Option<i32>, submitted_at: NaiveDateTime) -> responses::Model {
    responses::Model {
        id,
        survey_id: 1,
        respondent_id,
        is_anonymous: false,
        submitted_at,
    }
}

pub fn option_answer(id: i32, response_id: i32, question_id: i32, option_id: i32) -> answers::Model {
    answers::Model {
        id,
        response_id,
        question_id,
        selected_option_id: Some(option_id),
        answer_text: None,
        rating_value: None,
    }
}

pub fn text_answer(id: i32, response_id: i32, question_id: i32, text: &str) -> answers::Model {
    answers::Model {
        id,
        response_id,
        question_id,
        selected_option_id: None,
        answer_text: Some(text.to_owned()),
        rating_value: None,
    }
}

pub fn rating_answer(id: i32, response_id: i32, question_id: i32, rating: i32) -> answers::Model {
    answers::Model {
        id,
        response_id,
        question_id,
        selected_option_id: None,
        answer_text: None,
        rating_value: Some(rating),
    }
}
