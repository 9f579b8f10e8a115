//! SeaORM Entity for answers table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "answers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub response_id: i32,
    pub question_id: i32,
    pub selected_option_id: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub answer_text: Option<String>,
    pub rating_value: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::responses::Entity",
        from = "Column::ResponseId",
        to = "super::responses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Response,
    #[sea_orm(
        belongs_to = "super::questions::Entity",
        from = "Column::QuestionId",
        to = "super::questions::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Question,
    #[sea_orm(
        belongs_to = "super::answer_options::Entity",
        from = "Column::SelectedOptionId",
        to = "super::answer_options::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    SelectedOption,
}

impl Related<super::responses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Response.def()
    }
}

impl Related<super::questions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Question.def()
    }
}

impl Related<super::answer_options::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SelectedOption.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
