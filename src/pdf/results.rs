use super::{filename, Composer, PdfError};
use crate::orm::questions::QuestionType;
use crate::survey::long_date;
use crate::survey::results::SurveyResults;
use chrono::NaiveDateTime;

fn rating_label(rating: i32) -> String {
    match rating {
        5 => "5 (Excellent)".to_owned(),
        1 => "1 (Poor)".to_owned(),
        n => n.to_string(),
    }
}

pub fn results_document(results: &SurveyResults, created_at: NaiveDateTime) -> Composer {
    let mut doc = Composer::new(format!("Survey Results: {}", results.title));
    doc.title(format!("Survey Results: {}", results.title))
        .pair("Total Responses", results.total_responses.to_string())
        .pair("Created", long_date(&created_at));
    if results.description.trim().is_empty() {
        doc.note("No description provided.");
    } else {
        doc.paragraph(results.description.clone());
    }

    doc.heading("Questions and Responses");
    if results.total_responses == 0 {
        doc.note("No responses recorded for this survey.");
    }

    for question in &results.questions {
        doc.subheading(format!("Q: {}", question.text));
        doc.paragraph(format!(
            "{} | answered by {}",
            question.type_label(),
            question.response_count
        ));

        match question.question_type {
            QuestionType::SingleChoice | QuestionType::MultipleChoice => {
                if question.options.iter().all(|o| o.count == 0) {
                    doc.note("No responses recorded.");
                } else {
                    let rows = question
                        .options
                        .iter()
                        .map(|o| vec![o.text.clone(), o.count.to_string(), o.percentage_label()])
                        .collect();
                    doc.table(&["Option", "Count", "Percentage"], &[0.6, 0.2, 0.2], rows);
                }
            }
            QuestionType::Rating => match question.average_rating {
                Some(avg) => {
                    doc.paragraph(format!("Average Rating: {:.1}/5", avg));
                    let rows = question
                        .rating_distribution
                        .iter()
                        .rev()
                        .map(|(rating, count)| vec![rating_label(*rating), count.to_string()])
                        .collect();
                    doc.table(&["Rating", "Count"], &[0.6, 0.4], rows);
                }
                None => {
                    doc.note("No ratings recorded.");
                }
            },
            QuestionType::Text => {
                if question.text_responses.is_empty() {
                    doc.note("No text responses submitted.");
                } else {
                    doc.paragraph(format!("Responses ({})", question.text_responses.len()));
                    for response in &question.text_responses {
                        doc.paragraph(format!("- {}", response));
                    }
                }
            }
        }
    }

    doc
}

/// Returns `(filename, bytes)`.
pub fn results_pdf(
    results: &SurveyResults,
    created_at: NaiveDateTime,
    now: NaiveDateTime,
) -> Result<(String, Vec<u8>), PdfError> {
    let bytes = results_document(results, created_at).render(now)?;
    Ok((filename("Survey-Results", Some(&results.title), now), bytes))
}
