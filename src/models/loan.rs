use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub book_copy_id: i32,
    /// The borrower
    pub user_id: i32,
    /// The staff user who issued the loan
    pub librarian_id: Option<i32>,
    pub borrowed_date: String,
    pub due_date: String,
    pub returned_date: Option<String>,
    /// 'active', 'returned', 'overdue', 'lost'. Overdue is a cached value;
    /// the derived test is `returned_date IS NULL AND due_date < today`.
    pub status: String,
    pub fine_amount: Option<f64>,
    pub fine_paid: bool,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::book_copy::Entity",
        from = "Column::BookCopyId",
        to = "super::book_copy::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    BookCopy,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::LibrarianId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Librarian,
}

impl Related<super::book_copy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BookCopy.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Payload for issuing a loan.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanDto {
    pub book_copy_id: i32,
    pub user_id: i32,
    pub borrowed_date: Option<String>,
    pub due_date: Option<String>,
    pub notes: Option<String>,
}
