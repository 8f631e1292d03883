pub mod auth;
pub mod books;
pub mod categories;
pub mod copies;
pub mod genres;
pub mod health;
pub mod loans;
pub mod members;
pub mod publishers;
pub mod reservations;
pub mod staff;
pub mod users;

use axum::{
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};

use crate::config::CirculationPolicy;
use crate::domain::CirculationError;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub policy: CirculationPolicy,
}

impl AppState {
    pub fn new(db: DatabaseConnection, policy: CirculationPolicy) -> Self {
        Self { db, policy }
    }
}

/// Map a service error onto an HTTP response.
pub(crate) fn error_response(e: CirculationError) -> (StatusCode, Json<Value>) {
    let status = match &e {
        CirculationError::NotFound => StatusCode::NOT_FOUND,
        CirculationError::CopyUnavailable(_)
        | CirculationError::AlreadyReturned
        | CirculationError::InvalidState(_) => StatusCode::CONFLICT,
        CirculationError::LimitExceeded(_) | CirculationError::Validation(_) => {
            StatusCode::BAD_REQUEST
        }
        CirculationError::Database(msg) => {
            tracing::error!("database error: {}", msg);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            );
        }
    };
    (status, Json(json!({ "error": e.to_string() })))
}

pub(crate) fn forbidden() -> (StatusCode, Json<Value>) {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": "Insufficient permissions" })),
    )
}

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::get_me))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Copies
        .route(
            "/books/:id/copies",
            get(copies::list_book_copies).post(copies::create_copy),
        )
        .route(
            "/copies/:id",
            put(copies::update_copy).delete(copies::delete_copy),
        )
        .route("/copies/search", get(copies::search_copies))
        .route("/scan/:barcode", get(copies::scan_barcode))
        // Reference tables
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/:id",
            put(categories::update_category).delete(categories::delete_category),
        )
        .route("/genres", get(genres::list_genres).post(genres::create_genre))
        .route(
            "/genres/:id",
            put(genres::update_genre).delete(genres::delete_genre),
        )
        .route(
            "/publishers",
            get(publishers::list_publishers).post(publishers::create_publisher),
        )
        .route(
            "/publishers/:id",
            put(publishers::update_publisher).delete(publishers::delete_publisher),
        )
        // Loans
        .route("/loans", get(loans::list_loans).post(loans::create_loan))
        .route("/loans/:id", get(loans::get_loan))
        .route("/loans/:id/return", put(loans::return_loan))
        .route("/loans/:id/lost", put(loans::mark_lost))
        .route("/loans/:id/fine/pay", put(loans::pay_fine))
        .route("/loans/:id/fine/waive", put(loans::waive_fine))
        // Reservations
        .route(
            "/reservations",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route("/reservations/:id", get(reservations::get_reservation))
        .route("/reservations/:id/promote", put(reservations::promote))
        .route("/reservations/:id/fulfill", put(reservations::fulfill))
        .route("/reservations/:id/cancel", put(reservations::cancel))
        .route(
            "/reservations/expire-lapsed",
            post(reservations::expire_lapsed),
        )
        // People
        .route(
            "/members",
            get(members::list_members).post(members::create_member),
        )
        .route(
            "/members/:id",
            get(members::get_member)
                .put(members::update_member)
                .delete(members::delete_member),
        )
        .route("/staff", get(staff::list_staff).post(staff::create_staff))
        .route(
            "/staff/:id",
            get(staff::get_staff)
                .put(staff::update_staff)
                .delete(staff::delete_staff),
        )
        .route("/users", get(users::list_users))
        .route("/users/:id", get(users::get_user))
        .with_state(state)
}
