use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::EntityTrait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Claims;
use crate::domain::CirculationError;
use crate::models::reservation::Entity as Reservation;
use crate::services::reservations::{self, ReservationFilter};

use super::loans::find_caller;
use super::{error_response, forbidden, AppState};

#[derive(Deserialize)]
pub struct ListReservationsQuery {
    pub book_id: Option<i32>,
    pub user_id: Option<i32>,
    pub status: Option<String>,
}

pub async fn list_reservations(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<ListReservationsQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let role = claims.role()?;

    let mut filter = ReservationFilter {
        book_id: query.book_id,
        user_id: query.user_id,
        status: query.status,
    };

    // Members only ever see their own reservations
    if !role.can_circulate() {
        let me = find_caller(&state.db, &claims).await?;
        filter.user_id = Some(me.id);
    }

    let rows = reservations::list_reservations(&state.db, &state.policy, filter)
        .await
        .map_err(error_response)?;

    let total = rows.len();
    Ok(Json(json!({ "reservations": rows, "total": total })))
}

pub async fn get_reservation(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let role = claims.role()?;

    let res = Reservation::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(CirculationError::NotFound))?;

    if !role.can_circulate() {
        let me = find_caller(&state.db, &claims).await?;
        if res.user_id != me.id {
            return Err(forbidden());
        }
    }

    let position = reservations::queue_position(&state.db, &res)
        .await
        .map_err(error_response)?;
    let wait = reservations::estimated_wait_days(&state.db, &state.policy, &res)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({
        "reservation": res,
        "queue_position": position,
        "estimated_wait_days": wait,
    })))
}

#[derive(Deserialize)]
pub struct CreateReservationPayload {
    pub book_id: i32,
    /// Staff can reserve on behalf of another user; members reserve for
    /// themselves and this field is ignored.
    pub user_id: Option<i32>,
}

pub async fn create_reservation(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<CreateReservationPayload>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let role = claims.role()?;
    let me = find_caller(&state.db, &claims).await?;

    let user_id = match payload.user_id {
        Some(other) if role.can_circulate() => other,
        _ => me.id,
    };

    let res = reservations::reserve(&state.db, &state.policy, payload.book_id, user_id)
        .await
        .map_err(error_response)?;

    let position = reservations::queue_position(&state.db, &res)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Reservation placed",
            "reservation": res,
            "queue_position": position,
        })),
    ))
}

#[derive(Deserialize)]
pub struct PromotePayload {
    pub book_copy_id: i32,
}

pub async fn promote(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<PromotePayload>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_circulate() {
        return Err(forbidden());
    }

    let res = reservations::promote(&state.db, id, payload.book_copy_id)
        .await
        .map_err(error_response)?;

    Ok(Json(
        json!({ "message": "Reservation is ready for pickup", "reservation": res }),
    ))
}

pub async fn fulfill(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_circulate() {
        return Err(forbidden());
    }

    let res = reservations::fulfill(&state.db, id)
        .await
        .map_err(error_response)?;

    Ok(Json(
        json!({ "message": "Reservation fulfilled", "reservation": res }),
    ))
}

pub async fn cancel(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let role = claims.role()?;

    let res = Reservation::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(CirculationError::NotFound))?;

    // Members may cancel their own reservations; staff can cancel any
    if !role.can_circulate() {
        let me = find_caller(&state.db, &claims).await?;
        if res.user_id != me.id {
            return Err(forbidden());
        }
    }

    let updated = reservations::cancel(&state.db, id)
        .await
        .map_err(error_response)?;

    Ok(Json(
        json!({ "message": "Reservation cancelled", "reservation": updated }),
    ))
}

pub async fn expire_lapsed(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_circulate() {
        return Err(forbidden());
    }

    let expired = reservations::expire_lapsed(&state.db)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({ "expired": expired })))
}
