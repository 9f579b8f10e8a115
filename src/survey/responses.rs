//! Individual responses, as read by the survey owner.

use super::SurveyGraph;
use crate::orm::{answers, responses};
use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::{ConnectionTrait, DbErr};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Clone, Debug, PartialEq)]
pub struct ResponseAnswer {
    pub question_id: i32,
    pub question_text: String,
    pub answer_text: String,
    pub rating: Option<i32>,
    pub selected_option_text: String,
}

impl ResponseAnswer {
    /// Single line used by the page and the PDF.
    pub fn display(&self) -> String {
        if let Some(rating) = self.rating {
            format!("Rating: {}/5", rating)
        } else if !self.selected_option_text.is_empty() {
            self.selected_option_text.clone()
        } else if !self.answer_text.trim().is_empty() {
            self.answer_text.clone()
        } else {
            "No answer".to_owned()
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResponseDetail {
    pub response_id: i32,
    pub submitted_at: NaiveDateTime,
    pub respondent_name: String,
    pub is_anonymous: bool,
    pub answers: Vec<ResponseAnswer>,
}

impl ResponseDetail {
    pub fn submitted_label(&self) -> String {
        self.submitted_at.format("%Y-%m-%d %H:%M").to_string()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DateCount {
    pub date: NaiveDate,
    /// "Mar 05"
    pub label: String,
    pub count: usize,
}

#[derive(Clone, Debug)]
pub struct SurveyResponses {
    pub survey_id: i32,
    pub title: String,
    pub description: String,
    pub created_at: NaiveDateTime,
    pub response_count: usize,
    /// Percentage of responses that answered every required question.
    pub completion_rate: u32,
    pub timeline: Vec<DateCount>,
    /// Newest first.
    pub responses: Vec<ResponseDetail>,
}

impl SurveyResponses {
    pub fn timeline_labels_json(&self) -> String {
        let labels: Vec<&str> = self.timeline.iter().map(|d| d.label.as_str()).collect();
        serde_json::to_string(&labels).unwrap_or_else(|_| "[]".to_owned())
    }

    pub fn timeline_counts_json(&self) -> String {
        let counts: Vec<usize> = self.timeline.iter().map(|d| d.count).collect();
        serde_json::to_string(&counts).unwrap_or_else(|_| "[]".to_owned())
    }
}

pub fn respondent_name(response: &responses::Model, names: &HashMap<i32, String>) -> String {
    if response.is_anonymous {
        return "Anonymous".to_owned();
    }
    response
        .respondent_id
        .and_then(|id| names.get(&id).cloned())
        .unwrap_or_else(|| "Unknown User".to_owned())
}

/// Responses per calendar day, oldest day first.
pub fn timeline(responses: &[responses::Model]) -> Vec<DateCount> {
    let mut days: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for response in responses {
        *days.entry(response.submitted_at.date()).or_default() += 1;
    }
    days.into_iter()
        .map(|(date, count)| DateCount {
            date,
            label: date.format("%b %d").to_string(),
            count,
        })
        .collect()
}

/// 100 when nothing is required, 0 when nobody responded.
pub fn completion_rate(
    graph: &SurveyGraph,
    responses: &[responses::Model],
    answers: &[answers::Model],
) -> u32 {
    let required: Vec<&super::QuestionGraph> = graph
        .questions
        .iter()
        .filter(|q| q.question.is_required)
        .collect();
    if required.is_empty() {
        return 100;
    }
    if responses.is_empty() {
        return 0;
    }

    // (response, question) pairs that hold a real answer.
    let answered: HashSet<(i32, i32)> = answers
        .iter()
        .filter(|a| {
            a.selected_option_id.is_some()
                || a.rating_value.is_some()
                || a.answer_text
                    .as_deref()
                    .map(|t| !t.trim().is_empty())
                    .unwrap_or(false)
        })
        .map(|a| (a.response_id, a.question_id))
        .collect();

    let complete = responses
        .iter()
        .filter(|r| {
            required
                .iter()
                .all(|q| answered.contains(&(r.id, q.question.id)))
        })
        .count();

    ((complete as f64 / responses.len() as f64) * 100.0).round() as u32
}

/// Builds the listing from loaded rows.
pub fn assemble(
    graph: &SurveyGraph,
    response_rows: &[responses::Model],
    answer_rows: &[answers::Model],
    names: &HashMap<i32, String>,
) -> SurveyResponses {
    let mut by_response: HashMap<i32, Vec<&answers::Model>> = HashMap::new();
    for answer in answer_rows {
        by_response.entry(answer.response_id).or_default().push(answer);
    }

    let mut details: Vec<ResponseDetail> = response_rows
        .iter()
        .map(|response| {
            let answers = by_response
                .remove(&response.id)
                .unwrap_or_default()
                .into_iter()
                .map(|a| {
                    let question = graph.question(a.question_id);
                    ResponseAnswer {
                        question_id: a.question_id,
                        question_text: question
                            .map(|q| q.question.question_text.clone())
                            .unwrap_or_else(|| "Unknown Question".to_owned()),
                        answer_text: a.answer_text.clone().unwrap_or_default(),
                        rating: a.rating_value,
                        selected_option_text: match (question, a.selected_option_id) {
                            (Some(q), Some(option_id)) => {
                                q.option_text(option_id).unwrap_or_default().to_owned()
                            }
                            _ => String::new(),
                        },
                    }
                })
                .collect();

            ResponseDetail {
                response_id: response.id,
                submitted_at: response.submitted_at,
                respondent_name: respondent_name(response, names),
                is_anonymous: response.is_anonymous,
                answers,
            }
        })
        .collect();
    details.sort_by(|a, b| {
        b.submitted_at
            .cmp(&a.submitted_at)
            .then(b.response_id.cmp(&a.response_id))
    });

    SurveyResponses {
        survey_id: graph.survey.id,
        title: graph.survey.title.clone(),
        description: graph.survey.description.clone(),
        created_at: graph.survey.created_at,
        response_count: response_rows.len(),
        completion_rate: completion_rate(graph, response_rows, answer_rows),
        timeline: timeline(response_rows),
        responses: details,
    }
}

pub async fn load_responses<C: ConnectionTrait>(
    db: &C,
    graph: &SurveyGraph,
) -> Result<SurveyResponses, DbErr> {
    let (response_rows, answer_rows) = super::results::load_rows(db, graph.survey.id).await?;
    let user_ids: Vec<i32> = response_rows
        .iter()
        .filter_map(|r| r.respondent_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let names = crate::user::names_by_id(db, user_ids).await?;
    Ok(assemble(graph, &response_rows, &answer_rows, &names))
}
