use super::{filename, Composer, PdfError};
use crate::survey::long_date;
use crate::survey::responses::SurveyResponses;
use chrono::NaiveDateTime;

pub fn responses_document(listing: &SurveyResponses) -> Composer {
    let mut doc = Composer::new(format!("Survey Responses: {}", listing.title));
    doc.title(format!("Survey Responses: {}", listing.title))
        .pair("Created", long_date(&listing.created_at))
        .pair("Total Responses", listing.response_count.to_string())
        .pair("Completion Rate", format!("{}%", listing.completion_rate));
    if !listing.description.trim().is_empty() {
        doc.paragraph(listing.description.clone());
    }

    doc.heading("Response Timeline");
    if listing.timeline.is_empty() {
        doc.note("No responses yet.");
    } else {
        let rows = listing
            .timeline
            .iter()
            .map(|d| vec![d.date.format("%Y-%m-%d").to_string(), d.count.to_string()])
            .collect();
        doc.table(&["Date", "Count"], &[0.6, 0.4], rows);
    }

    doc.heading(format!("Individual Responses ({})", listing.responses.len()));
    for detail in &listing.responses {
        doc.subheading(detail.respondent_name.clone());
        doc.note(format!(
            "Submitted {}",
            detail.submitted_at.format("%b %d, %Y %H:%M")
        ));
        if detail.answers.is_empty() {
            doc.note("No answers recorded.");
        }
        for answer in &detail.answers {
            doc.pair(answer.question_text.clone(), answer.display());
        }
        doc.space(2.0);
    }

    doc
}

pub fn responses_pdf(
    listing: &SurveyResponses,
    now: NaiveDateTime,
) -> Result<(String, Vec<u8>), PdfError> {
    let bytes = responses_document(listing).render(now)?;
    Ok((filename("Survey-Responses", Some(&listing.title), now), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::questions::QuestionType;
    use crate::survey::responses::assemble;
    use crate::survey::testing::*;
    use std::collections::HashMap;

    #[test]
    fn test_document_lists_respondents_newest_first() {
        let g = graph(vec![
            question(1, QuestionType::SingleChoice, true, &["Yes", "No"]),
            question(2, QuestionType::Rating, false, &[]),
        ]);
        let rows = vec![
            response(1, Some(7), at(2025, 3, 1)),
            response(2, None, at(2025, 3, 4)),
        ];
        let answers = vec![option_answer(1, 1, 1, 10), rating_answer(2, 2, 2, 3)];
        let names: HashMap<i32, String> = [(7, "alice".to_owned())].into_iter().collect();
        let listing = assemble(&g, &rows, &answers, &names);

        let all: Vec<String> = responses_document(&listing)
            .layout()
            .into_iter()
            .flatten()
            .map(|t| t.text)
            .collect();
        assert!(all.contains(&"Individual Responses (2)".to_owned()));
        assert!(all.contains(&"Completion Rate".to_owned()));
        assert!(all.contains(&"50%".to_owned()));
        assert!(all.contains(&"Rating: 3/5".to_owned()));
        assert!(all.contains(&"2025-03-04".to_owned()));

        let unknown = all.iter().position(|t| t == "Unknown User").unwrap();
        let alice = all.iter().position(|t| t == "alice").unwrap();
        assert!(unknown < alice);
    }

    #[test]
    fn test_empty_listing_renders() {
        let g = graph(vec![question(1, QuestionType::Text, false, &[])]);
        let listing = assemble(&g, &[], &[], &HashMap::new());
        let (name, bytes) = responses_pdf(&listing, at(2025, 3, 9)).unwrap();
        assert_eq!(name, "Survey-Responses-Survey-1-20250309.pdf");
        assert!(bytes.starts_with(b"%PDF"));
    }
}
