//! Authentication and authorization tests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use openshelf::api::{api_router, AppState};
use openshelf::auth::{create_jwt, decode_jwt, hash_password, verify_password};
use openshelf::config::CirculationPolicy;
use openshelf::db;
use openshelf::services::profiles::{self, CreateMemberDto, CreateStaffDto};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use tower::util::ServiceExt;

async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

#[test]
fn test_password_hashing() {
    let hash = hash_password("correct horse").expect("hashing should succeed");
    assert_ne!(hash, "correct horse");
    assert!(hash.starts_with("$argon2"));

    assert!(verify_password("correct horse", &hash).unwrap());
    assert!(!verify_password("battery staple", &hash).unwrap());

    // Same password, different salt
    let other = hash_password("correct horse").unwrap();
    assert_ne!(hash, other);
}

#[test]
fn test_jwt_round_trip() {
    let token = create_jwt("alice@example.test", "librarian").expect("token should be created");
    let claims = decode_jwt(&token).expect("token should decode");
    assert_eq!(claims.sub, "alice@example.test");
    assert_eq!(claims.role, "librarian");
    assert!(claims.exp > chrono::Utc::now().timestamp() as usize);

    assert!(decode_jwt("not-a-token").is_err());
}

#[tokio::test]
async fn test_register_bootstrap_then_login() {
    let db = setup_test_db().await;
    let app = api_router(AppState::new(db, CirculationPolicy::default()));

    // First account bootstraps the super admin
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/register")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "name": "Root",
                        "email": "root@example.test",
                        "password": "secret123"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["role"], "super-admin");
    assert!(body["token"].is_string());

    // Registration is closed once a user exists
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/register")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "name": "Second",
                        "email": "second@example.test",
                        "password": "secret123"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Login with the bootstrap account
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "email": "root@example.test",
                        "password": "secret123"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let token = body["token"].as_str().expect("token in response");
    let claims = decode_jwt(token).unwrap();
    assert_eq!(claims.sub, "root@example.test");

    // Wrong password is rejected without detail
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "email": "root@example.test",
                        "password": "wrong"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let db = setup_test_db().await;
    let app = api_router(AppState::new(db, CirculationPolicy::default()));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/loans").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/loans")
                .header("Authorization", "Bearer garbage")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_member_cannot_issue_loans() {
    let db = setup_test_db().await;

    let (member_user, _) = profiles::create_member(
        &db,
        CreateMemberDto {
            name: "Plain Member".to_string(),
            email: "plain@example.test".to_string(),
            password: "secret123".to_string(),
            phone: None,
            status: None,
            date_of_birth: None,
            gender: None,
            address: None,
            membership_start_date: None,
            membership_expiry_date: None,
            membership_type: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            notes: None,
            max_books_allowed: None,
            max_days_allowed: None,
        },
    )
    .await
    .unwrap();

    let app = api_router(AppState::new(db, CirculationPolicy::default()));
    let token = create_jwt(&member_user.email, &member_user.role).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/loans")
                .header("Authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"book_copy_id": 1, "user_id": member_user.id}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_staff_can_list_users_member_cannot() {
    let db = setup_test_db().await;

    let (librarian, _) = profiles::create_staff(
        &db,
        CreateStaffDto {
            name: "Lisa".to_string(),
            email: "lisa@example.test".to_string(),
            password: "secret123".to_string(),
            phone: None,
            status: None,
            role: None,
            hire_date: None,
            position: None,
            notes: None,
        },
    )
    .await
    .unwrap();
    let (member_user, _) = profiles::create_member(
        &db,
        CreateMemberDto {
            name: "Max".to_string(),
            email: "max@example.test".to_string(),
            password: "secret123".to_string(),
            phone: None,
            status: None,
            date_of_birth: None,
            gender: None,
            address: None,
            membership_start_date: None,
            membership_expiry_date: None,
            membership_type: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            notes: None,
            max_books_allowed: None,
            max_days_allowed: None,
        },
    )
    .await
    .unwrap();

    let app = api_router(AppState::new(db, CirculationPolicy::default()));

    let staff_token = create_jwt(&librarian.email, &librarian.role).unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users")
                .header("Authorization", format!("Bearer {}", staff_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 2);

    let member_token = create_jwt(&member_user.email, &member_user.role).unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/users")
                .header("Authorization", format!("Bearer {}", member_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
