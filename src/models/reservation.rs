use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Reservations target a book, not a specific copy
    pub book_id: i32,
    pub user_id: i32,
    pub reserved_date: String,
    pub expiry_date: String,
    /// 'pending', 'ready', 'fulfilled', 'expired', 'cancelled'
    pub status: String,
    /// Assigned when the reservation is promoted to ready
    pub book_copy_id: Option<i32>,
    pub notified_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::book::Entity",
        from = "Column::BookId",
        to = "super::book::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Book,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::book_copy::Entity",
        from = "Column::BookCopyId",
        to = "super::book_copy::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    BookCopy,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Book.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::book_copy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BookCopy.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
