use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sea_orm::*;
use serde_json::{json, Value};

use crate::auth::Claims;
use crate::models::member::Entity as Member;
use crate::models::user::Entity as User;
use crate::services::profiles::{self, CreateMemberDto, UpdateMemberDto};

use super::{error_response, forbidden, AppState};

pub async fn list_members(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_view_users() {
        return Err(forbidden());
    }

    let members_with_users = Member::find()
        .find_also_related(User)
        .all(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;

    let result: Vec<Value> = members_with_users
        .into_iter()
        .map(|(profile, user)| json!({ "profile": profile, "user": user }))
        .collect();

    let total = result.len();
    Ok(Json(json!({ "members": result, "total": total })))
}

pub async fn get_member(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_view_users() {
        return Err(forbidden());
    }

    let (user, profile) = profiles::get_member(&state.db, user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({ "user": user, "profile": profile })))
}

pub async fn create_member(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<CreateMemberDto>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if !claims.role()?.can_manage_users() {
        return Err(forbidden());
    }

    let (user, profile) = profiles::create_member(&state.db, payload)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Member created successfully",
            "user": user,
            "profile": profile,
        })),
    ))
}

pub async fn update_member(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<i32>,
    Json(payload): Json<UpdateMemberDto>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_manage_users() {
        return Err(forbidden());
    }

    let (user, profile) = profiles::update_member(&state.db, user_id, payload)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({
        "message": "Member updated successfully",
        "user": user,
        "profile": profile,
    })))
}

pub async fn delete_member(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_manage_users() {
        return Err(forbidden());
    }

    // Confirm the target actually is a member account
    let target = User::find_by_id(user_id)
        .one(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(crate::domain::CirculationError::NotFound))?;

    if target.role != "member" {
        return Err(error_response(crate::domain::CirculationError::Validation(
            "User is not a member account".to_string(),
        )));
    }

    profiles::delete_user(&state.db, user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({ "message": "Member deleted successfully" })))
}
