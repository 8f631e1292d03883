use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sea_orm::*;
use serde_json::{json, Value};

use crate::auth::Claims;
use crate::domain::CirculationError;
use crate::models::user::{self, Entity as User};

use super::{error_response, forbidden, AppState};

pub async fn list_users(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_view_users() {
        return Err(forbidden());
    }

    let users = User::find()
        .order_by_asc(user::Column::Name)
        .all(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;

    let total = users.len();
    Ok(Json(json!({ "users": users, "total": total })))
}

pub async fn get_user(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_view_users() {
        return Err(forbidden());
    }

    let user = User::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(CirculationError::NotFound))?;

    Ok(Json(json!({ "user": user })))
}
