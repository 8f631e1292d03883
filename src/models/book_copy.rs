use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "book_copies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Unique identifier for this physical copy (uuid v4).
    /// Generated once at creation and never changed afterwards.
    pub barcode: String,
    pub book_id: i32,
    /// Library classification number
    pub call_number: Option<String>,
    /// 'excellent', 'good', 'fair', 'poor' or 'damaged'
    pub condition: String,
    /// Availability status of this physical copy.
    /// Valid values:
    /// - `available`: On shelf, can be loaned
    /// - `borrowed`: Currently lent out (has an active Loan)
    /// - `reserved`: Held for a ready Reservation
    /// - `maintenance`: Being repaired
    /// - `lost`: Copy is lost
    pub status: String,
    /// Shelf location
    pub location: Option<String>,
    pub acquisition_date: Option<String>,
    pub acquisition_price: Option<f64>,
    pub notes: Option<String>,
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
    #[sea_orm(has_many = "super::loan::Entity")]
    Loan,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Book.def()
    }
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Payload for creating or updating a copy. The barcode is never part of
/// the payload; it is generated server-side.
#[derive(Debug, Serialize, Deserialize)]
pub struct BookCopyDto {
    pub call_number: Option<String>,
    pub condition: Option<String>,
    pub location: Option<String>,
    pub acquisition_date: Option<String>,
    pub acquisition_price: Option<f64>,
    pub notes: Option<String>,
}
