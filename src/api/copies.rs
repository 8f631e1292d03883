use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::*;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::Claims;
use crate::domain::status::{CopyCondition, CopyStatus};
use crate::domain::CirculationError;
use crate::models::book::{self, Entity as Book};
use crate::models::book_copy::{self, BookCopyDto, Entity as BookCopy};

use super::{error_response, forbidden, AppState};

pub async fn list_book_copies(
    State(state): State<AppState>,
    _claims: Claims,
    Path(book_id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    Book::find_by_id(book_id)
        .one(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(CirculationError::NotFound))?;

    let copies = BookCopy::find()
        .filter(book_copy::Column::BookId.eq(book_id))
        .order_by_asc(book_copy::Column::Id)
        .all(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;

    let total = copies.len();
    Ok(Json(json!({ "copies": copies, "total": total })))
}

pub async fn create_copy(
    State(state): State<AppState>,
    claims: Claims,
    Path(book_id): Path<i32>,
    Json(payload): Json<BookCopyDto>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if !claims.role()?.can_manage_catalog() {
        return Err(forbidden());
    }

    Book::find_by_id(book_id)
        .one(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(CirculationError::NotFound))?;

    let condition = payload.condition.unwrap_or_else(|| "good".to_string());
    if CopyCondition::parse(&condition).is_none() {
        return Err(error_response(CirculationError::Validation(format!(
            "Unknown copy condition '{}'",
            condition
        ))));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let new_copy = book_copy::ActiveModel {
        // Generated once; immutable for the copy's lifetime
        barcode: Set(Uuid::new_v4().to_string()),
        book_id: Set(book_id),
        call_number: Set(payload.call_number),
        condition: Set(condition),
        status: Set(CopyStatus::Available.as_str().to_owned()),
        location: Set(payload.location),
        acquisition_date: Set(payload.acquisition_date),
        acquisition_price: Set(payload.acquisition_price),
        notes: Set(payload.notes),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = new_copy
        .insert(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Copy created successfully", "copy": saved })),
    ))
}

#[derive(Deserialize)]
pub struct UpdateCopyPayload {
    pub call_number: Option<String>,
    pub condition: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    /// Only 'available' <-> 'maintenance' can be set here; the other
    /// statuses are owned by the circulation engine.
    pub status: Option<String>,
}

pub async fn update_copy(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCopyPayload>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_manage_catalog() {
        return Err(forbidden());
    }

    let copy = BookCopy::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(CirculationError::NotFound))?;

    let mut active: book_copy::ActiveModel = copy.clone().into();

    if let Some(condition) = payload.condition {
        if CopyCondition::parse(&condition).is_none() {
            return Err(error_response(CirculationError::Validation(format!(
                "Unknown copy condition '{}'",
                condition
            ))));
        }
        active.condition = Set(condition);
    }
    if let Some(call_number) = payload.call_number {
        active.call_number = Set(Some(call_number));
    }
    if let Some(location) = payload.location {
        active.location = Set(Some(location));
    }
    if let Some(notes) = payload.notes {
        active.notes = Set(Some(notes));
    }
    if let Some(status) = payload.status {
        let allowed = matches!(
            (CopyStatus::parse(&copy.status), CopyStatus::parse(&status)),
            (
                Some(CopyStatus::Available) | Some(CopyStatus::Maintenance),
                Some(CopyStatus::Available) | Some(CopyStatus::Maintenance)
            )
        );
        if !allowed {
            return Err(error_response(CirculationError::InvalidState(format!(
                "Cannot move copy from '{}' to '{}' here; use the loan and reservation endpoints",
                copy.status, status
            ))));
        }
        active.status = Set(status);
    }

    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;

    Ok(Json(
        json!({ "message": "Copy updated successfully", "copy": updated }),
    ))
}

pub async fn delete_copy(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_delete_catalog() {
        return Err(forbidden());
    }

    let copy = BookCopy::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(CirculationError::NotFound))?;

    if copy.status == CopyStatus::Borrowed.as_str() {
        return Err(error_response(CirculationError::InvalidState(
            "Cannot delete a copy that is out on loan".to_string(),
        )));
    }

    copy.delete(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;

    Ok(Json(json!({ "message": "Copy deleted successfully" })))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Search available copies by barcode, call number or book metadata.
/// Used by the loan desk to find something to hand out.
pub async fn search_copies(
    State(state): State<AppState>,
    _claims: Claims,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let q = query.q.unwrap_or_default();
    if q.len() < 2 {
        return Ok(Json(json!({ "copies": [] })));
    }

    let copies_with_books = BookCopy::find()
        .find_also_related(Book)
        .filter(book_copy::Column::Status.eq(CopyStatus::Available.as_str()))
        .filter(
            Condition::any()
                .add(book_copy::Column::Barcode.contains(&q))
                .add(book_copy::Column::CallNumber.contains(&q))
                .add(book::Column::Title.contains(&q))
                .add(book::Column::AuthorName.contains(&q))
                .add(book::Column::Isbn.contains(&q)),
        )
        .limit(20)
        .all(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;

    let result: Vec<Value> = copies_with_books
        .into_iter()
        .map(|(copy, book)| {
            json!({
                "copy": copy,
                "book": book,
            })
        })
        .collect();

    Ok(Json(json!({ "copies": result })))
}

/// Look up a copy by its barcode, with the book it belongs to.
pub async fn scan_barcode(
    State(state): State<AppState>,
    _claims: Claims,
    Path(barcode): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let found = BookCopy::find()
        .filter(book_copy::Column::Barcode.eq(&barcode))
        .find_also_related(Book)
        .one(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(CirculationError::NotFound))?;

    let (copy, book) = found;
    Ok(Json(json!({ "copy": copy, "book": book })))
}
