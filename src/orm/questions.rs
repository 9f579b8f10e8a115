//! SeaORM Entity for questions table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum QuestionType {
    #[sea_orm(string_value = "SingleChoice")]
    SingleChoice,
    #[sea_orm(string_value = "MultipleChoice")]
    MultipleChoice,
    #[sea_orm(string_value = "Text")]
    Text,
    #[sea_orm(string_value = "Rating")]
    Rating,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::SingleChoice,
        QuestionType::MultipleChoice,
        QuestionType::Text,
        QuestionType::Rating,
    ];

    /// Choice questions carry answer options.
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultipleChoice)
    }

    /// Form value, identical to the stored value.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "SingleChoice",
            QuestionType::MultipleChoice => "MultipleChoice",
            QuestionType::Text => "Text",
            QuestionType::Rating => "Rating",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "Single Choice",
            QuestionType::MultipleChoice => "Multiple Choice",
            QuestionType::Text => "Text",
            QuestionType::Rating => "Rating",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "questions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub survey_id: i32,
    pub question_text: String,
    pub question_type: QuestionType,
    pub sort_order: i32,
    pub is_required: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::surveys::Entity",
        from = "Column::SurveyId",
        to = "super::surveys::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Survey,
    #[sea_orm(has_many = "super::answer_options::Entity")]
    AnswerOptions,
    #[sea_orm(has_many = "super::answers::Entity")]
    Answers,
}

impl Related<super::surveys::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Survey.def()
    }
}

impl Related<super::answer_options::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AnswerOptions.def()
    }
}

impl Related<super::answers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Answers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
