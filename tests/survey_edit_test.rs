/// Integration tests for editing a stored survey through the builder form

mod common;
use serial_test::serial;

use canvass::orm::{answer_options, answers};
use canvass::survey::submission::{submit_response, SurveySubmission};
use canvass::survey::{self, SurveyForm, SurveyGraph};
use common::*;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

/// Posts `form` back as the builder would, keeping stored ids.
fn edited(graph: &SurveyGraph) -> SurveyForm {
    SurveyForm::from_graph(graph)
}

#[actix_rt::test]
#[serial]
async fn test_edit_keeps_ids_and_updates_text() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let owner = create_test_user(&db, "owner", "password123").await.unwrap();
    let graph = create_sample_survey(&db, owner.id).await.unwrap();

    let mut form = edited(&graph);
    form.title = "Renamed".to_owned();
    form.questions[0].text = "Still enjoying the work?".to_owned();
    form.questions[0].options[1].text = "Not really".to_owned();

    survey::update_survey(&db, &graph, &form).await.unwrap();
    let after = survey::load_graph(&db, graph.survey.id).await.unwrap().unwrap();

    assert_eq!(after.survey.title, "Renamed");
    assert_eq!(after.questions.len(), 4);
    assert_eq!(after.questions[0].question.id, graph.questions[0].question.id);
    assert_eq!(after.questions[0].question.question_text, "Still enjoying the work?");
    assert_eq!(after.questions[0].options[1].id, graph.questions[0].options[1].id);
    assert_eq!(after.questions[0].options[1].option_text, "Not really");
}

#[actix_rt::test]
#[serial]
async fn test_edit_removes_question_with_its_answers() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let owner = create_test_user(&db, "owner", "password123").await.unwrap();
    let graph = create_sample_survey(&db, owner.id).await.unwrap();

    let submission = SurveySubmission::from_pairs(&sample_answers(&graph, 0, 5)).unwrap();
    let response = submit_response(&db, &graph, &submission, None).await.unwrap();

    // Drop the multiple choice question.
    let removed = graph.questions[1].question.id;
    let mut form = edited(&graph);
    form.questions.remove(1);
    survey::update_survey(&db, &graph, &form).await.unwrap();

    let after = survey::load_graph(&db, graph.survey.id).await.unwrap().unwrap();
    assert_eq!(after.questions.len(), 3);
    assert!(after.question(removed).is_none());
    let orders: Vec<i32> = after.questions.iter().map(|q| q.question.sort_order).collect();
    assert_eq!(orders, vec![0, 1, 2]);

    let orphaned = answers::Entity::find()
        .filter(answers::Column::QuestionId.eq(removed))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(orphaned, 0);
    let options = answer_options::Entity::find()
        .filter(answer_options::Column::QuestionId.eq(removed))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(options, 0);

    // The response itself survives with its other answers.
    let remaining = answers::Entity::find()
        .filter(answers::Column::ResponseId.eq(response.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(remaining, 3);
}

#[actix_rt::test]
#[serial]
async fn test_edit_adds_question_and_option() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let owner = create_test_user(&db, "owner", "password123").await.unwrap();
    let graph = create_sample_survey(&db, owner.id).await.unwrap();

    let mut form = edited(&graph);
    form.questions[0].options.push(survey::form::OptionForm {
        id: 0,
        text: "Sometimes".to_owned(),
    });
    form.questions.insert(
        0,
        survey::form::QuestionForm {
            id: 0,
            text: "Your team?".to_owned(),
            question_type: "Text".to_owned(),
            is_required: false,
            options: Vec::new(),
        },
    );
    survey::update_survey(&db, &graph, &form).await.unwrap();

    let after = survey::load_graph(&db, graph.survey.id).await.unwrap().unwrap();
    assert_eq!(after.questions.len(), 5);
    assert_eq!(after.questions[0].question.question_text, "Your team?");
    assert_eq!(after.questions[1].question.id, graph.questions[0].question.id);
    let texts: Vec<&str> = after.questions[1]
        .options
        .iter()
        .map(|o| o.option_text.as_str())
        .collect();
    assert_eq!(texts, vec!["Yes", "No", "Sometimes"]);
}

#[actix_rt::test]
#[serial]
async fn test_edit_removing_option_drops_its_answers() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let owner = create_test_user(&db, "owner", "password123").await.unwrap();
    let graph = create_sample_survey(&db, owner.id).await.unwrap();

    // Picks "No".
    let submission = SurveySubmission::from_pairs(&sample_answers(&graph, 1, 3)).unwrap();
    submit_response(&db, &graph, &submission, None).await.unwrap();

    let no = graph.questions[0].options[1].id;
    let mut form = edited(&graph);
    form.questions[0].options.remove(1);
    survey::update_survey(&db, &graph, &form).await.unwrap();

    let picked = answers::Entity::find()
        .filter(answers::Column::SelectedOptionId.eq(no))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(picked, 0);
    assert!(answer_options::Entity::find_by_id(no)
        .one(&db)
        .await
        .unwrap()
        .is_none());
}

#[actix_rt::test]
#[serial]
async fn test_edit_password_keep_replace_and_clear() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let owner = create_test_user(&db, "owner", "password123").await.unwrap();

    let mut form = sample_form();
    form.password = "first".to_owned();
    let stored = survey::create_survey(&db, owner.id, &form).await.unwrap();
    let graph = survey::load_graph(&db, stored.id).await.unwrap().unwrap();

    // Blank password keeps the stored one.
    survey::update_survey(&db, &graph, &edited(&graph)).await.unwrap();
    let graph = survey::load_graph(&db, stored.id).await.unwrap().unwrap();
    let hash = graph.survey.password_hash.clone().unwrap();
    assert!(canvass::session::verify_password("first", &hash));

    let mut form = edited(&graph);
    form.password = "second".to_owned();
    survey::update_survey(&db, &graph, &form).await.unwrap();
    let graph = survey::load_graph(&db, stored.id).await.unwrap().unwrap();
    let hash = graph.survey.password_hash.clone().unwrap();
    assert!(canvass::session::verify_password("second", &hash));

    let mut form = edited(&graph);
    form.clear_password = true;
    survey::update_survey(&db, &graph, &form).await.unwrap();
    let graph = survey::load_graph(&db, stored.id).await.unwrap().unwrap();
    assert!(graph.survey.password_hash.is_none());
}
