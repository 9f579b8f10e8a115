/// Integration tests for the analytics dashboard and the PDF exports

mod common;
use serial_test::serial;

use canvass::app_config::LimitsConfig;
use canvass::survey::dashboard::{load_dashboard, Period};
use canvass::survey::results::load_results;
use canvass::survey::responses::load_responses;
use canvass::survey::submission::{submit_response, SurveySubmission};
use chrono::{Duration, Utc};
use common::*;

#[actix_rt::test]
#[serial]
async fn test_dashboard_totals() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let owner = create_test_user(&db, "owner", "password123").await.unwrap();
    let respondent = create_test_user(&db, "kim", "password123").await.unwrap();

    let busy = create_sample_survey(&db, owner.id).await.unwrap();
    let quiet = create_sample_survey(&db, owner.id).await.unwrap();

    for rating in [5, 4, 3] {
        let submission = SurveySubmission::from_pairs(&sample_answers(&busy, 0, rating)).unwrap();
        submit_response(&db, &busy, &submission, Some(respondent.id))
            .await
            .unwrap();
    }
    let submission = SurveySubmission::from_pairs(&sample_answers(&quiet, 1, 2)).unwrap();
    submit_response(&db, &quiet, &submission, None).await.unwrap();

    // The weekly trend ends with yesterday.
    let now = Utc::now().naive_utc() + Duration::days(1);
    let dash = load_dashboard(&db, Period::Weekly, now, &LimitsConfig::default())
        .await
        .unwrap();

    assert_eq!(dash.total_surveys, 2);
    assert_eq!(dash.total_responses, 4);
    assert_eq!(dash.active_surveys, 2);
    assert_eq!(dash.avg_responses_label(), "2.0");
    assert_eq!(dash.trend_labels.len(), 7);
    assert_eq!(dash.trend_data.iter().sum::<usize>(), 4);

    assert_eq!(dash.top_surveys[0].survey_id, busy.survey.id);
    assert_eq!(dash.top_surveys[0].response_count, 3);
    assert_eq!(dash.recent.len(), 4);
    assert!(dash.recent.iter().any(|a| a.username == "kim"));

    let json: serde_json::Value = serde_json::from_str(&dash.charts_json()).unwrap();
    assert_eq!(json["trend"]["data"].as_array().unwrap().len(), 7);
}

#[actix_rt::test]
#[serial]
async fn test_pdf_exports_from_stored_survey() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let owner = create_test_user(&db, "owner", "password123").await.unwrap();
    let graph = create_sample_survey(&db, owner.id).await.unwrap();
    let submission = SurveySubmission::from_pairs(&sample_answers(&graph, 0, 4)).unwrap();
    submit_response(&db, &graph, &submission, None).await.unwrap();

    let now = Utc::now().naive_utc();

    let results = load_results(&db, &graph).await.unwrap();
    let (name, bytes) = canvass::pdf::results::results_pdf(&results, graph.survey.created_at, now)
        .expect("results pdf");
    assert!(name.starts_with("Survey-Results-"));
    assert!(name.ends_with(".pdf"));
    assert!(bytes.starts_with(b"%PDF"));

    let listing = load_responses(&db, &graph).await.unwrap();
    let (name, bytes) = canvass::pdf::responses::responses_pdf(&listing, now).expect("responses pdf");
    assert!(name.starts_with("Survey-Responses-"));
    assert!(bytes.starts_with(b"%PDF"));

    let dash = load_dashboard(&db, Period::Monthly, now, &LimitsConfig::default())
        .await
        .unwrap();
    let (name, bytes) = canvass::pdf::dashboard::dashboard_pdf(&dash, now).expect("dashboard pdf");
    assert!(name.starts_with("Survey-Analytics-Dashboard-"));
    assert!(bytes.starts_with(b"%PDF"));
}
