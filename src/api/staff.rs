use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sea_orm::*;
use serde_json::{json, Value};

use crate::auth::Claims;
use crate::domain::{CirculationError, Role};
use crate::models::staff::Entity as Staff;
use crate::models::user::Entity as User;
use crate::services::profiles::{self, CreateStaffDto, UpdateStaffDto};

use super::{error_response, forbidden, AppState};

pub async fn list_staff(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_view_users() {
        return Err(forbidden());
    }

    let staff_with_users = Staff::find()
        .find_also_related(User)
        .all(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;

    let result: Vec<Value> = staff_with_users
        .into_iter()
        .map(|(profile, user)| json!({ "profile": profile, "user": user }))
        .collect();

    let total = result.len();
    Ok(Json(json!({ "staff": result, "total": total })))
}

pub async fn get_staff(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_view_users() {
        return Err(forbidden());
    }

    let (user, profile) = profiles::get_staff(&state.db, user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({ "user": user, "profile": profile })))
}

pub async fn create_staff(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<CreateStaffDto>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if !claims.role()?.can_manage_users() {
        return Err(forbidden());
    }

    let (user, profile) = profiles::create_staff(&state.db, payload)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Staff member created successfully",
            "user": user,
            "profile": profile,
        })),
    ))
}

pub async fn update_staff(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<i32>,
    Json(payload): Json<UpdateStaffDto>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_manage_users() {
        return Err(forbidden());
    }

    let (user, profile) = profiles::update_staff(&state.db, user_id, payload)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({
        "message": "Staff member updated successfully",
        "user": user,
        "profile": profile,
    })))
}

pub async fn delete_staff(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_manage_users() {
        return Err(forbidden());
    }

    let target = User::find_by_id(user_id)
        .one(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(CirculationError::NotFound))?;

    match Role::parse(&target.role) {
        Some(role) if role.is_staff() => {}
        _ => {
            return Err(error_response(CirculationError::Validation(
                "User is not a staff account".to_string(),
            )));
        }
    }

    profiles::delete_user(&state.db, user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({ "message": "Staff member deleted successfully" })))
}
