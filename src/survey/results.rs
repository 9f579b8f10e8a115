//! Aggregated results per question.

use super::SurveyGraph;
use crate::orm::questions::QuestionType;
use crate::orm::{answers, responses};
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};
use serde::Serialize;
use std::collections::HashSet;

const BACKGROUND_COLORS: [&str; 6] = [
    "rgba(255, 99, 132, 0.2)",
    "rgba(54, 162, 235, 0.2)",
    "rgba(255, 206, 86, 0.2)",
    "rgba(75, 192, 192, 0.2)",
    "rgba(153, 102, 255, 0.2)",
    "rgba(255, 159, 64, 0.2)",
];

const BORDER_COLORS: [&str; 6] = [
    "rgba(255, 99, 132, 1)",
    "rgba(54, 162, 235, 1)",
    "rgba(255, 206, 86, 1)",
    "rgba(75, 192, 192, 1)",
    "rgba(153, 102, 255, 1)",
    "rgba(255, 159, 64, 1)",
];

/// Chart.js input for one question.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub chart_type: String,
    pub title: String,
    pub labels: Vec<String>,
    pub data: Vec<usize>,
    pub background_colors: Vec<String>,
    pub border_colors: Vec<String>,
}

impl ChartData {
    pub fn bar(title: &str, labels: Vec<String>, data: Vec<usize>) -> Self {
        let (background_colors, border_colors) = palette(labels.len());
        Self {
            chart_type: "bar".to_owned(),
            title: title.to_owned(),
            labels,
            data,
            background_colors,
            border_colors,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_owned())
    }
}

/// Colours for `count` bars, cycling through the palette.
pub fn palette(count: usize) -> (Vec<String>, Vec<String>) {
    (0..count)
        .map(|i| {
            (
                BACKGROUND_COLORS[i % BACKGROUND_COLORS.len()].to_owned(),
                BORDER_COLORS[i % BORDER_COLORS.len()].to_owned(),
            )
        })
        .unzip()
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptionResult {
    pub option_id: i32,
    pub text: String,
    pub count: usize,
    /// Share of all selections on the question, one decimal.
    pub percentage: f64,
}

impl OptionResult {
    pub fn percentage_label(&self) -> String {
        format!("{:.1}%", self.percentage)
    }
}

#[derive(Clone, Debug)]
pub struct QuestionResult {
    pub question_id: i32,
    pub text: String,
    pub question_type: QuestionType,
    pub sort_order: i32,
    pub is_required: bool,
    /// Distinct responses that answered the question.
    pub response_count: usize,
    pub options: Vec<OptionResult>,
    pub text_responses: Vec<String>,
    pub average_rating: Option<f64>,
    /// `(rating, count)` for 1..=5, zeros included.
    pub rating_distribution: Vec<(i32, usize)>,
    pub chart: Option<ChartData>,
}

impl QuestionResult {
    pub fn type_label(&self) -> &'static str {
        self.question_type.label()
    }

    pub fn is_rating(&self) -> bool {
        self.question_type == QuestionType::Rating
    }

    pub fn is_text(&self) -> bool {
        self.question_type == QuestionType::Text
    }

    pub fn average_label(&self) -> String {
        match self.average_rating {
            Some(avg) => format!("{:.1}", avg),
            None => "No ratings".to_owned(),
        }
    }

    pub fn chart_json(&self) -> String {
        self.chart.as_ref().map(|c| c.to_json()).unwrap_or_default()
    }
}

#[derive(Clone, Debug)]
pub struct SurveyResults {
    pub survey_id: i32,
    pub title: String,
    pub description: String,
    pub total_responses: usize,
    pub questions: Vec<QuestionResult>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Aggregates answers over already loaded rows.
pub fn aggregate(
    graph: &SurveyGraph,
    responses: &[responses::Model],
    answers: &[answers::Model],
) -> SurveyResults {
    let questions = graph
        .questions
        .iter()
        .map(|q| {
            let question = &q.question;
            let mine: Vec<&answers::Model> = answers
                .iter()
                .filter(|a| a.question_id == question.id)
                .collect();
            let response_count = mine
                .iter()
                .map(|a| a.response_id)
                .collect::<HashSet<_>>()
                .len();

            let mut result = QuestionResult {
                question_id: question.id,
                text: question.question_text.clone(),
                question_type: question.question_type,
                sort_order: question.sort_order,
                is_required: question.is_required,
                response_count,
                options: Vec::new(),
                text_responses: Vec::new(),
                average_rating: None,
                rating_distribution: Vec::new(),
                chart: None,
            };

            match question.question_type {
                QuestionType::SingleChoice | QuestionType::MultipleChoice => {
                    let counts: Vec<usize> = q
                        .options
                        .iter()
                        .map(|o| {
                            mine.iter()
                                .filter(|a| a.selected_option_id == Some(o.id))
                                .count()
                        })
                        .collect();
                    let total: usize = counts.iter().sum();

                    result.options = q
                        .options
                        .iter()
                        .zip(&counts)
                        .map(|(o, count)| OptionResult {
                            option_id: o.id,
                            text: o.option_text.clone(),
                            count: *count,
                            percentage: if total == 0 {
                                0.0
                            } else {
                                round1(*count as f64 / total as f64 * 100.0)
                            },
                        })
                        .collect();
                    result.chart = Some(ChartData::bar(
                        &question.question_text,
                        q.options.iter().map(|o| o.option_text.clone()).collect(),
                        counts,
                    ));
                }
                QuestionType::Text => {
                    result.text_responses = mine
                        .iter()
                        .filter_map(|a| a.answer_text.as_deref())
                        .filter(|t| !t.trim().is_empty())
                        .map(|t| t.to_owned())
                        .collect();
                }
                QuestionType::Rating => {
                    let ratings: Vec<i32> = mine.iter().filter_map(|a| a.rating_value).collect();
                    if !ratings.is_empty() {
                        let sum: i32 = ratings.iter().sum();
                        result.average_rating = Some(sum as f64 / ratings.len() as f64);
                    }
                    result.rating_distribution = (1..=5)
                        .map(|r| (r, ratings.iter().filter(|v| **v == r).count()))
                        .collect();
                    result.chart = Some(ChartData::bar(
                        &question.question_text,
                        (1..=5).map(|r: i32| r.to_string()).collect(),
                        result.rating_distribution.iter().map(|(_, c)| *c).collect(),
                    ));
                }
            }

            result
        })
        .collect();

    SurveyResults {
        survey_id: graph.survey.id,
        title: graph.survey.title.clone(),
        description: graph.survey.description.clone(),
        total_responses: responses.len(),
        questions,
    }
}

/// Loads every response and answer of the survey.
pub async fn load_rows<C: ConnectionTrait>(
    db: &C,
    survey_id: i32,
) -> Result<(Vec<responses::Model>, Vec<answers::Model>), DbErr> {
    let response_rows = responses::Entity::find()
        .filter(responses::Column::SurveyId.eq(survey_id))
        .order_by_asc(responses::Column::SubmittedAt)
        .order_by_asc(responses::Column::Id)
        .all(db)
        .await?;
    if response_rows.is_empty() {
        return Ok((response_rows, Vec::new()));
    }

    let answer_rows = answers::Entity::find()
        .filter(answers::Column::ResponseId.is_in(response_rows.iter().map(|r| r.id).collect::<Vec<_>>()))
        .order_by_asc(answers::Column::Id)
        .all(db)
        .await?;
    Ok((response_rows, answer_rows))
}

pub async fn load_results<C: ConnectionTrait>(
    db: &C,
    graph: &SurveyGraph,
) -> Result<SurveyResults, DbErr> {
    let (response_rows, answer_rows) = load_rows(db, graph.survey.id).await?;
    Ok(aggregate(graph, &response_rows, &answer_rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::testing::*;

    fn sample() -> SurveyResults {
        let g = graph(vec![
            question(1, QuestionType::SingleChoice, true, &["Yes", "No", "Maybe"]),
            question(2, QuestionType::MultipleChoice, false, &["A", "B"]),
            question(3, QuestionType::Text, false, &[]),
            question(4, QuestionType::Rating, false, &[]),
        ]);
        let day = at(2025, 5, 1);
        let responses = vec![response(1, None, day), response(2, Some(3), day), response(3, None, day)];
        let answers = vec![
            option_answer(1, 1, 1, 10),
            option_answer(2, 2, 1, 10),
            option_answer(3, 3, 1, 11),
            option_answer(4, 1, 2, 20),
            option_answer(5, 1, 2, 21),
            option_answer(6, 2, 2, 21),
            text_answer(7, 1, 3, "Great"),
            text_answer(8, 2, 3, "  "),
            rating_answer(9, 1, 4, 5),
            rating_answer(10, 2, 4, 4),
            rating_answer(11, 3, 4, 4),
        ];
        aggregate(&g, &responses, &answers)
    }

    #[test]
    fn test_choice_counts_and_percentages() {
        let results = sample();
        assert_eq!(results.total_responses, 3);

        let single = &results.questions[0];
        assert_eq!(single.response_count, 3);
        let counts: Vec<usize> = single.options.iter().map(|o| o.count).collect();
        assert_eq!(counts, vec![2, 1, 0]);
        assert_eq!(single.options[0].percentage, 66.7);
        assert_eq!(single.options[1].percentage, 33.3);
        assert_eq!(single.options[2].percentage, 0.0);
        assert_eq!(single.options[0].percentage_label(), "66.7%");

        // Percentages are of selections, not of responses.
        let multi = &results.questions[1];
        assert_eq!(multi.response_count, 2);
        assert_eq!(multi.options[0].percentage, 33.3);
        assert_eq!(multi.options[1].percentage, 66.7);
    }

    #[test]
    fn test_text_responses_skip_blank() {
        let results = sample();
        assert_eq!(results.questions[2].text_responses, vec!["Great".to_owned()]);
        assert!(results.questions[2].chart.is_none());
    }

    #[test]
    fn test_rating_average_and_distribution() {
        let results = sample();
        let rating = &results.questions[3];
        assert!((rating.average_rating.unwrap() - 13.0 / 3.0).abs() < 1e-9);
        assert_eq!(rating.average_label(), "4.3");
        assert_eq!(
            rating.rating_distribution,
            vec![(1, 0), (2, 0), (3, 0), (4, 2), (5, 1)]
        );
        let chart = rating.chart.as_ref().unwrap();
        assert_eq!(chart.labels, vec!["1", "2", "3", "4", "5"]);
        assert_eq!(chart.data, vec![0, 0, 0, 2, 1]);
    }

    #[test]
    fn test_no_answers() {
        let g = graph(vec![
            question(1, QuestionType::SingleChoice, false, &["Yes"]),
            question(2, QuestionType::Rating, false, &[]),
        ]);
        let results = aggregate(&g, &[], &[]);
        assert_eq!(results.total_responses, 0);
        assert_eq!(results.questions[0].options[0].percentage, 0.0);
        assert_eq!(results.questions[1].average_rating, None);
        assert_eq!(results.questions[1].average_label(), "No ratings");
        assert_eq!(results.questions[1].rating_distribution.len(), 5);
    }

    #[test]
    fn test_palette_cycles() {
        let (background, border) = palette(8);
        assert_eq!(background.len(), 8);
        assert_eq!(background[6], background[0]);
        assert_eq!(border[7], "rgba(54, 162, 235, 1)");
    }

    #[test]
    fn test_chart_json_shape() {
        let chart = ChartData::bar("Q", vec!["A".to_owned()], vec![2]);
        let json: serde_json::Value = serde_json::from_str(&chart.to_json()).unwrap();
        assert_eq!(json["chartType"], "bar");
        assert_eq!(json["data"][0], 2);
        assert_eq!(json["backgroundColors"][0], "rgba(255, 99, 132, 0.2)");
    }
}
