use super::{filename, Composer, PdfError};
use crate::survey::dashboard::Dashboard;
use chrono::NaiveDateTime;

pub fn dashboard_document(dash: &Dashboard) -> Composer {
    let mut doc = Composer::new("Survey Analytics Dashboard");
    doc.title("Survey Analytics Dashboard")
        .pair("Period", dash.period.label())
        .heading("Statistics")
        .pair("Total Surveys", dash.total_surveys.to_string())
        .pair("Total Responses", dash.total_responses.to_string())
        .pair("Active Surveys", dash.active_surveys.to_string())
        .pair("Average Responses per Survey", dash.avg_responses_label());

    doc.heading("Top Performing Surveys");
    if dash.top_surveys.is_empty() {
        doc.note("No surveys yet.");
    } else {
        let rows = dash
            .top_surveys
            .iter()
            .map(|t| vec![t.title.clone(), t.response_count.to_string()])
            .collect();
        doc.table(&["Survey Title", "Responses"], &[0.75, 0.25], rows);
    }

    doc.heading("Question Types");
    let rows = dash
        .distribution
        .iter()
        .map(|(label, count)| vec![label.clone(), count.to_string()])
        .collect();
    doc.table(&["Type", "Questions"], &[0.75, 0.25], rows);

    doc.heading("Recent Activity");
    if dash.recent.is_empty() {
        doc.note("No recent activity.");
    } else {
        let rows = dash
            .recent
            .iter()
            .map(|r| {
                vec![
                    r.survey_title.clone(),
                    r.activity_type.clone(),
                    r.username.clone(),
                    r.timestamp_label(),
                ]
            })
            .collect();
        doc.table(
            &["Survey", "Activity", "User", "Timestamp"],
            &[0.35, 0.2, 0.2, 0.25],
            rows,
        );
    }

    doc
}

pub fn dashboard_pdf(dash: &Dashboard, now: NaiveDateTime) -> Result<(String, Vec<u8>), PdfError> {
    let bytes = dashboard_document(dash).render(now)?;
    Ok((filename("Survey-Analytics-Dashboard", None, now), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::LimitsConfig;
    use crate::survey::dashboard::{build, DashboardRows, Period};
    use crate::survey::testing::{at, response, survey};
    use std::collections::HashMap;

    #[test]
    fn test_dashboard_document() {
        let surveys = vec![survey(1)];
        let responses = vec![response(1, Some(3), at(2025, 6, 9))];
        let names: HashMap<i32, String> = [(3, "bob".to_owned())].into_iter().collect();
        let dash = build(
            DashboardRows {
                surveys: &surveys,
                responses: &responses,
                question_types: &[],
                names: &names,
            },
            Period::Weekly,
            at(2025, 6, 10),
            &LimitsConfig::default(),
        );

        let all: Vec<String> = dashboard_document(&dash)
            .layout()
            .into_iter()
            .flatten()
            .map(|t| t.text)
            .collect();
        assert!(all.contains(&"Top Performing Surveys".to_owned()));
        assert!(all.contains(&"Survey 1".to_owned()));
        assert!(all.contains(&"bob".to_owned()));
        assert!(all.contains(&"Survey Response".to_owned()));

        let (name, bytes) = dashboard_pdf(&dash, at(2025, 6, 10)).unwrap();
        assert_eq!(name, "Survey-Analytics-Dashboard-20250610.pdf");
        assert!(bytes.starts_with(b"%PDF"));
    }
}
