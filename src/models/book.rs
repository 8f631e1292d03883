use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub author_name: Option<String>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub publisher_id: Option<i32>,
    pub category_id: Option<i32>,
    pub published_date: Option<String>,
    pub pages: Option<i32>,
    pub language: String,
    /// 'hardcover', 'paperback', 'ebook' or 'audiobook'
    pub format: String,
    pub price: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::publisher::Entity",
        from = "Column::PublisherId",
        to = "super::publisher::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Publisher,
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Category,
    #[sea_orm(has_many = "super::book_copy::Entity")]
    BookCopy,
    #[sea_orm(has_many = "super::reservation::Entity")]
    Reservation,
}

impl Related<super::publisher::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Publisher.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::book_copy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BookCopy.def()
    }
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservation.def()
    }
}

impl Related<super::genre::Entity> for Entity {
    fn to() -> RelationDef {
        super::book_genre::Relation::Genre.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::book_genre::Relation::Book.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Payload for creating or updating a book.
#[derive(Debug, Serialize, Deserialize)]
pub struct BookDto {
    pub title: String,
    pub author_name: Option<String>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub publisher_id: Option<i32>,
    pub category_id: Option<i32>,
    pub published_date: Option<String>,
    pub pages: Option<i32>,
    pub language: Option<String>,
    pub format: Option<String>,
    pub price: Option<f64>,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
}
