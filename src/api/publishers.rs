use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sea_orm::*;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Claims;
use crate::domain::CirculationError;
use crate::models::publisher::{self, Entity as Publisher};

use super::{error_response, forbidden, AppState};

#[derive(Deserialize)]
pub struct PublisherPayload {
    pub name: String,
    pub description: Option<String>,
}

pub async fn list_publishers(
    State(state): State<AppState>,
    _claims: Claims,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let publishers = Publisher::find()
        .order_by_asc(publisher::Column::Name)
        .all(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;

    Ok(Json(json!({ "publishers": publishers })))
}

pub async fn create_publisher(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<PublisherPayload>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if !claims.role()?.can_manage_catalog() {
        return Err(forbidden());
    }
    if payload.name.trim().is_empty() {
        return Err(error_response(CirculationError::Validation(
            "name must not be empty".to_string(),
        )));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let saved = publisher::ActiveModel {
        name: Set(payload.name),
        description: Set(payload.description),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| error_response(e.into()))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Publisher created successfully", "publisher": saved })),
    ))
}

pub async fn update_publisher(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<PublisherPayload>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_manage_catalog() {
        return Err(forbidden());
    }

    let existing = Publisher::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(CirculationError::NotFound))?;

    let mut active: publisher::ActiveModel = existing.into();
    active.name = Set(payload.name);
    active.description = Set(payload.description);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;

    Ok(Json(
        json!({ "message": "Publisher updated successfully", "publisher": updated }),
    ))
}

pub async fn delete_publisher(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.role()?.can_delete_catalog() {
        return Err(forbidden());
    }

    let existing = Publisher::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(CirculationError::NotFound))?;

    existing
        .delete(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?;

    Ok(Json(json!({ "message": "Publisher deleted successfully" })))
}
