use axum::{extract::State, http::StatusCode, Json};
use sea_orm::*;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{create_jwt, hash_password, verify_password, Claims};
use crate::models::user::{self, Entity as User};

use super::AppState;

#[derive(Deserialize)]
pub struct RegisterPayload {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

/// Bootstrap registration: only allowed while the users table is empty,
/// and the first account becomes the super-admin. Everyone else is created
/// by staff through /members and /staff.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let existing = User::find().count(&state.db).await.map_err(|e| {
        tracing::error!("database error: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Internal server error" })),
        )
    })?;

    if existing > 0 {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Registration is closed; ask an administrator" })),
        ));
    }

    let password_hash = hash_password(&payload.password)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(json!({ "error": e }))))?;

    let now = chrono::Utc::now().to_rfc3339();
    let admin = user::ActiveModel {
        name: Set(payload.name),
        email: Set(payload.email),
        password_hash: Set(password_hash),
        phone: Set(None),
        role: Set("super-admin".to_owned()),
        status: Set("active".to_owned()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = admin.insert(&state.db).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    let token = create_jwt(&saved.email, &saved.role)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e }))))?;

    Ok(Json(json!({ "token": token, "user": saved })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let user = User::find()
        .filter(user::Column::Email.eq(&payload.email))
        .one(&state.db)
        .await
        .map_err(|e| {
            tracing::error!("database error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
        })?
        .ok_or((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid credentials" })),
        ))?;

    let ok = verify_password(&payload.password, &user.password_hash).unwrap_or(false);
    if !ok {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid credentials" })),
        ));
    }

    if user.status != "active" {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": format!("Account is {}", user.status) })),
        ));
    }

    let token = create_jwt(&user.email, &user.role)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e }))))?;

    Ok(Json(json!({ "token": token, "user": user })))
}

pub async fn get_me(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let user = User::find()
        .filter(user::Column::Email.eq(&claims.sub))
        .one(&state.db)
        .await
        .map_err(|e| {
            tracing::error!("database error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
        })?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "User not found" })),
        ))?;

    Ok(Json(json!({ "user": user })))
}
