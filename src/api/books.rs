use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::*;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Claims;
use crate::domain::status::CopyStatus;
use crate::domain::CirculationError;
use crate::models::book::{self, BookDto, Entity as Book};
use crate::models::book_copy::{self, Entity as BookCopy};
use crate::models::book_genre::{self, Entity as BookGenre};
use crate::models::genre::Entity as Genre;

use super::{error_response, forbidden, AppState};

#[derive(Deserialize)]
pub struct ListBooksQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub category_id: Option<i32>,
    pub publisher_id: Option<i32>,
}

#[utoipa::path(
    get,
    path = "/api/books",
    responses(
        (status = 200, description = "List catalog books with copy counts")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    _claims: Claims,
    Query(query): Query<ListBooksQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut condition = Condition::all();
    if let Some(title) = &query.title {
        condition = condition.add(book::Column::Title.contains(title));
    }
    if let Some(author) = &query.author {
        condition = condition.add(book::Column::AuthorName.contains(author));
    }
    if let Some(category_id) = query.category_id {
        condition = condition.add(book::Column::CategoryId.eq(category_id));
    }
    if let Some(publisher_id) = query.publisher_id {
        condition = condition.add(book::Column::PublisherId.eq(publisher_id));
    }

    let books = Book::find()
        .filter(condition)
        .order_by_asc(book::Column::Title)
        .all(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;

    let mut result = Vec::with_capacity(books.len());
    for b in books {
        let total = BookCopy::find()
            .filter(book_copy::Column::BookId.eq(b.id))
            .count(&state.db)
            .await
            .map_err(|e| error_response(e.into()))?;
        let available = BookCopy::find()
            .filter(book_copy::Column::BookId.eq(b.id))
            .filter(book_copy::Column::Status.eq(CopyStatus::Available.as_str()))
            .count(&state.db)
            .await
            .map_err(|e| error_response(e.into()))?;

        result.push(json!({
            "book": b,
            "total_copies": total,
            "available_copies": available,
        }));
    }

    let total = result.len();
    Ok(Json(json!({ "books": result, "total": total })))
}

pub async fn get_book(
    State(state): State<AppState>,
    _claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let book = Book::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(CirculationError::NotFound))?;

    let copies = BookCopy::find()
        .filter(book_copy::Column::BookId.eq(id))
        .all(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;

    let genres = book
        .find_related(Genre)
        .all(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;

    Ok(Json(json!({ "book": book, "copies": copies, "genres": genres })))
}

const BOOK_FORMATS: [&str; 4] = ["hardcover", "paperback", "ebook", "audiobook"];

fn validate_format(format: &str) -> Result<(), (StatusCode, Json<Value>)> {
    if BOOK_FORMATS.contains(&format) {
        Ok(())
    } else {
        Err(error_response(CirculationError::Validation(format!(
            "Unknown book format '{}'",
            format
        ))))
    }
}

#[utoipa::path(
    post,
    path = "/api/books",
    responses(
        (status = 201, description = "Book created"),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<BookDto>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if !claims.role()?.can_manage_catalog() {
        return Err(forbidden());
    }

    let format = payload.format.unwrap_or_else(|| "paperback".to_string());
    validate_format(&format)?;
    if payload.title.trim().is_empty() {
        return Err(error_response(CirculationError::Validation(
            "title must not be empty".to_string(),
        )));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let new_book = book::ActiveModel {
        title: Set(payload.title),
        author_name: Set(payload.author_name),
        isbn: Set(payload.isbn),
        description: Set(payload.description),
        publisher_id: Set(payload.publisher_id),
        category_id: Set(payload.category_id),
        published_date: Set(payload.published_date),
        pages: Set(payload.pages),
        language: Set(payload.language.unwrap_or_else(|| "English".to_string())),
        format: Set(format),
        price: Set(payload.price),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    };

    let saved = new_book
        .insert(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;

    for genre_id in payload.genre_ids {
        book_genre::ActiveModel {
            book_id: Set(saved.id),
            genre_id: Set(genre_id),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Book created successfully", "book": saved })),
    ))
}

pub async fn update_book(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<BookDto>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_manage_catalog() {
        return Err(forbidden());
    }

    let book = Book::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(CirculationError::NotFound))?;

    let format = payload.format.unwrap_or_else(|| book.format.clone());
    validate_format(&format)?;

    let now = chrono::Utc::now().to_rfc3339();
    let mut active: book::ActiveModel = book.into();
    active.title = Set(payload.title);
    active.author_name = Set(payload.author_name);
    active.isbn = Set(payload.isbn);
    active.description = Set(payload.description);
    active.publisher_id = Set(payload.publisher_id);
    active.category_id = Set(payload.category_id);
    active.published_date = Set(payload.published_date);
    active.pages = Set(payload.pages);
    if let Some(language) = payload.language {
        active.language = Set(language);
    }
    active.format = Set(format);
    active.price = Set(payload.price);
    active.updated_at = Set(now.clone());

    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;

    // Re-sync the genre pivot
    BookGenre::delete_many()
        .filter(book_genre::Column::BookId.eq(id))
        .exec(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;
    for genre_id in payload.genre_ids {
        book_genre::ActiveModel {
            book_id: Set(id),
            genre_id: Set(genre_id),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;
    }

    Ok(Json(
        json!({ "message": "Book updated successfully", "book": updated }),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    responses(
        (status = 200, description = "Book deleted"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_delete_catalog() {
        return Err(forbidden());
    }

    let book = Book::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(CirculationError::NotFound))?;

    book.delete(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;

    Ok(Json(json!({ "message": "Book deleted successfully" })))
}
