//! Diffing an edited builder form against the stored survey.

use super::form::SurveyForm;
use super::SurveyGraph;
use crate::orm::questions::QuestionType;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug, PartialEq)]
pub struct PlannedOption {
    /// Stored id to update, None to insert.
    pub id: Option<i32>,
    pub text: String,
    pub sort_order: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlannedQuestion {
    /// Stored id to update, None to insert.
    pub id: Option<i32>,
    pub text: String,
    pub question_type: QuestionType,
    pub is_required: bool,
    pub sort_order: i32,
    /// Stored options of this question to remove along with their answers.
    pub delete_options: Vec<i32>,
    pub options: Vec<PlannedOption>,
}

/// Every row change an edit implies, in application order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditPlan {
    /// Stored questions missing from the form.
    pub delete_questions: Vec<i32>,
    pub questions: Vec<PlannedQuestion>,
}

impl EditPlan {
    pub fn inserted_questions(&self) -> usize {
        self.questions.iter().filter(|q| q.id.is_none()).count()
    }
}

/// Computes the edit plan. Ids in the form that do not belong to the
/// survey, or that appear twice, are treated as new rows.
pub fn plan_edit(existing: &SurveyGraph, form: &SurveyForm) -> EditPlan {
    let stored: HashMap<i32, &super::QuestionGraph> = existing
        .questions
        .iter()
        .map(|q| (q.question.id, q))
        .collect();
    let mut claimed: HashSet<i32> = HashSet::new();

    let mut questions = Vec::with_capacity(form.questions.len());
    for (position, question_form) in form.questions.iter().enumerate() {
        let kind = question_form.kind().unwrap_or(QuestionType::Text);
        let current = stored
            .get(&question_form.id)
            .filter(|_| claimed.insert(question_form.id))
            .copied();

        let mut planned = PlannedQuestion {
            id: current.map(|q| q.question.id),
            text: question_form.text.trim().to_owned(),
            question_type: kind,
            is_required: question_form.is_required,
            sort_order: position as i32,
            delete_options: Vec::new(),
            options: Vec::new(),
        };

        let stored_options: Vec<i32> = current
            .map(|q| q.options.iter().map(|o| o.id).collect())
            .unwrap_or_default();

        if kind.is_choice() {
            let mut kept: HashSet<i32> = HashSet::new();
            for (option_position, option_form) in question_form.options.iter().enumerate() {
                let id = Some(option_form.id)
                    .filter(|id| stored_options.contains(id) && kept.insert(*id));
                planned.options.push(PlannedOption {
                    id,
                    text: option_form.text.trim().to_owned(),
                    sort_order: option_position as i32,
                });
            }
            planned.delete_options = stored_options
                .into_iter()
                .filter(|id| !kept.contains(id))
                .collect();
        } else {
            planned.delete_options = stored_options;
        }

        questions.push(planned);
    }

    let delete_questions = existing
        .questions
        .iter()
        .map(|q| q.question.id)
        .filter(|id| !claimed.contains(id))
        .collect();

    EditPlan {
        delete_questions,
        questions,
    }
}
