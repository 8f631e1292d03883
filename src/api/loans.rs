use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::*;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Claims;
use crate::domain::CirculationError;
use crate::models::loan::LoanDto;
use crate::models::user::{self, Entity as User};
use crate::services::circulation::{self, LoanFilter};

use super::{error_response, forbidden, AppState};

#[derive(Deserialize)]
pub struct ListLoansQuery {
    pub status: Option<String>,
    pub user_id: Option<i32>,
    pub book_copy_id: Option<i32>,
}

pub async fn list_loans(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<ListLoansQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let role = claims.role()?;

    let mut filter = LoanFilter {
        status: query.status,
        user_id: query.user_id,
        book_copy_id: query.book_copy_id,
    };

    // Members only ever see their own loans
    if !role.can_circulate() {
        let me = find_caller(&state.db, &claims).await?;
        filter.user_id = Some(me.id);
    }

    let loans = circulation::list_loans(&state.db, &state.policy, filter)
        .await
        .map_err(error_response)?;

    let total = loans.len();
    Ok(Json(json!({ "loans": loans, "total": total })))
}

pub async fn get_loan(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let role = claims.role()?;

    let loan = crate::models::loan::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(CirculationError::NotFound))?;

    if !role.can_circulate() {
        let me = find_caller(&state.db, &claims).await?;
        if loan.user_id != me.id {
            return Err(forbidden());
        }
    }

    let on = chrono::Local::now().date_naive();
    Ok(Json(json!({
        "loan": loan,
        "is_overdue": circulation::is_overdue(&loan, on),
        "days_overdue": circulation::days_overdue(&loan, on),
        "current_fine": circulation::current_fine(&loan, &state.policy, on),
    })))
}

#[utoipa::path(
    post,
    path = "/api/loans",
    responses(
        (status = 201, description = "Loan issued"),
        (status = 409, description = "Copy is not available")
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<LoanDto>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if !claims.role()?.can_circulate() {
        return Err(forbidden());
    }

    let issuer = find_caller(&state.db, &claims).await?;
    let loan = circulation::create_loan(&state.db, &state.policy, payload, Some(issuer.id))
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Loan created successfully", "loan": loan })),
    ))
}

#[derive(Deserialize, Default)]
pub struct ReturnLoanPayload {
    pub returned_date: Option<String>,
    pub condition_notes: Option<String>,
}

#[utoipa::path(
    put,
    path = "/api/loans/{id}/return",
    responses(
        (status = 200, description = "Loan returned; fine recorded when late"),
        (status = 409, description = "Loan was already returned")
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    payload: Option<Json<ReturnLoanPayload>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_circulate() {
        return Err(forbidden());
    }

    let Json(payload) = payload.unwrap_or_default();
    let loan = circulation::return_loan(
        &state.db,
        &state.policy,
        id,
        payload.returned_date,
        payload.condition_notes,
    )
    .await
    .map_err(error_response)?;

    Ok(Json(
        json!({ "message": "Loan returned successfully", "loan": loan }),
    ))
}

pub async fn mark_lost(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_circulate() {
        return Err(forbidden());
    }

    let loan = circulation::mark_lost(&state.db, id)
        .await
        .map_err(error_response)?;

    Ok(Json(
        json!({ "message": "Loan marked as lost", "loan": loan }),
    ))
}

pub async fn pay_fine(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_collect_fines() {
        return Err(forbidden());
    }

    let loan = circulation::pay_fine(&state.db, id)
        .await
        .map_err(error_response)?;

    Ok(Json(
        json!({ "message": "Fine collected", "loan": loan }),
    ))
}

pub async fn waive_fine(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_waive_fines() {
        return Err(forbidden());
    }

    let loan = circulation::waive_fine(&state.db, id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({ "message": "Fine waived", "loan": loan })))
}

/// Resolve the user row behind the JWT claims.
pub(crate) async fn find_caller(
    db: &DatabaseConnection,
    claims: &Claims,
) -> Result<user::Model, (StatusCode, Json<Value>)> {
    User::find()
        .filter(user::Column::Email.eq(&claims.sub))
        .one(db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unknown user" })),
        ))
}
