//! Loan lifecycle tests: copy claiming, returns, fines.

use openshelf::config::CirculationPolicy;
use openshelf::db;
use openshelf::domain::CirculationError;
use openshelf::models::{book, book_copy, loan, member, user};
use openshelf::services::circulation::{self, LoanFilter};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

// Helper to create a test database
async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn create_test_user(db: &DatabaseConnection, name: &str, email: &str, role: &str) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let user = user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set("$argon2id$dummy".to_string()),
        phone: Set(None),
        role: Set(role.to_string()),
        status: Set("active".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    let res = user::Entity::insert(user)
        .exec(db)
        .await
        .expect("Failed to create user");
    res.last_insert_id
}

async fn create_test_member_profile(db: &DatabaseConnection, user_id: i32, max_books: i32) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let profile = member::ActiveModel {
        user_id: Set(user_id),
        library_card_number: Set(format!("LIB{:06}", user_id)),
        membership_start_date: Set("2026-01-01".to_string()),
        membership_expiry_date: Set("2027-01-01".to_string()),
        membership_type: Set("basic".to_string()),
        max_books_allowed: Set(max_books),
        max_days_allowed: Set(14),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    let res = member::Entity::insert(profile)
        .exec(db)
        .await
        .expect("Failed to create member profile");
    res.last_insert_id
}

async fn create_test_book(db: &DatabaseConnection, title: &str) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let book = book::ActiveModel {
        title: Set(title.to_string()),
        language: Set("English".to_string()),
        format: Set("paperback".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    let res = book::Entity::insert(book)
        .exec(db)
        .await
        .expect("Failed to create book");
    res.last_insert_id
}

async fn create_test_copy(db: &DatabaseConnection, book_id: i32, status: &str) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let copy = book_copy::ActiveModel {
        barcode: Set(uuid::Uuid::new_v4().to_string()),
        book_id: Set(book_id),
        condition: Set("good".to_string()),
        status: Set(status.to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    let res = book_copy::Entity::insert(copy)
        .exec(db)
        .await
        .expect("Failed to create copy");
    res.last_insert_id
}

fn loan_dto(copy_id: i32, user_id: i32, borrowed: &str, due: &str) -> loan::LoanDto {
    loan::LoanDto {
        book_copy_id: copy_id,
        user_id,
        borrowed_date: Some(borrowed.to_string()),
        due_date: Some(due.to_string()),
        notes: None,
    }
}

async fn copy_status(db: &DatabaseConnection, copy_id: i32) -> String {
    book_copy::Entity::find_by_id(copy_id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .status
}

#[tokio::test]
async fn test_create_loan_claims_copy() {
    let db = setup_test_db().await;
    let policy = CirculationPolicy::default();
    let borrower = create_test_user(&db, "Borrower", "b@example.test", "member").await;
    let book_id = create_test_book(&db, "The Hobbit").await;
    let copy_id = create_test_copy(&db, book_id, "available").await;

    let loan = circulation::create_loan(
        &db,
        &policy,
        loan_dto(copy_id, borrower, "2026-01-01", "2026-01-15"),
        None,
    )
    .await
    .expect("loan should be created");

    assert_eq!(loan.status, "active");
    assert_eq!(loan.returned_date, None);
    assert_eq!(copy_status(&db, copy_id).await, "borrowed");
}

#[tokio::test]
async fn test_second_loan_on_same_copy_fails() {
    let db = setup_test_db().await;
    let policy = CirculationPolicy::default();
    let alice = create_test_user(&db, "Alice", "alice@example.test", "member").await;
    let bob = create_test_user(&db, "Bob", "bob@example.test", "member").await;
    let book_id = create_test_book(&db, "Dune").await;
    let copy_id = create_test_copy(&db, book_id, "available").await;

    circulation::create_loan(
        &db,
        &policy,
        loan_dto(copy_id, alice, "2026-01-01", "2026-01-15"),
        None,
    )
    .await
    .expect("first loan should succeed");

    let err = circulation::create_loan(
        &db,
        &policy,
        loan_dto(copy_id, bob, "2026-01-02", "2026-01-16"),
        None,
    )
    .await
    .expect_err("second loan must fail");

    assert!(matches!(err, CirculationError::CopyUnavailable(_)));

    // At most one active loan references the copy
    let active = loan::Entity::find()
        .filter(loan::Column::BookCopyId.eq(copy_id))
        .filter(loan::Column::ReturnedDate.is_null())
        .all(&db)
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].user_id, alice);
}

#[tokio::test]
async fn test_loan_on_maintenance_copy_fails_without_side_effects() {
    let db = setup_test_db().await;
    let policy = CirculationPolicy::default();
    let borrower = create_test_user(&db, "Borrower", "b2@example.test", "member").await;
    let book_id = create_test_book(&db, "Foundation").await;
    let copy_id = create_test_copy(&db, book_id, "maintenance").await;

    let err = circulation::create_loan(
        &db,
        &policy,
        loan_dto(copy_id, borrower, "2026-01-01", "2026-01-15"),
        None,
    )
    .await
    .expect_err("loan against a maintenance copy must fail");

    assert!(matches!(err, CirculationError::CopyUnavailable(_)));
    assert_eq!(copy_status(&db, copy_id).await, "maintenance");
    assert_eq!(loan::Entity::find().all(&db).await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_late_return_accrues_fine() {
    let db = setup_test_db().await;
    let policy = CirculationPolicy::default();
    let borrower = create_test_user(&db, "Borrower", "late@example.test", "member").await;
    let book_id = create_test_book(&db, "The Hobbit").await;
    let copy_id = create_test_copy(&db, book_id, "available").await;

    // Borrowed day 0, due day 14, returned day 20 -> 6 days late
    let loan = circulation::create_loan(
        &db,
        &policy,
        loan_dto(copy_id, borrower, "2026-01-01", "2026-01-15"),
        None,
    )
    .await
    .unwrap();

    let returned = circulation::return_loan(
        &db,
        &policy,
        loan.id,
        Some("2026-01-21".to_string()),
        None,
    )
    .await
    .expect("return should succeed");

    assert_eq!(returned.status, "returned");
    assert_eq!(returned.returned_date.as_deref(), Some("2026-01-21"));
    assert_eq!(returned.fine_amount, Some(6.00));
    assert!(!returned.fine_paid);
    assert_eq!(copy_status(&db, copy_id).await, "available");
}

#[tokio::test]
async fn test_on_time_return_has_no_fine() {
    let db = setup_test_db().await;
    let policy = CirculationPolicy::default();
    let borrower = create_test_user(&db, "Borrower", "ontime@example.test", "member").await;
    let book_id = create_test_book(&db, "Dune").await;
    let copy_id = create_test_copy(&db, book_id, "available").await;

    let loan = circulation::create_loan(
        &db,
        &policy,
        loan_dto(copy_id, borrower, "2026-01-01", "2026-01-15"),
        None,
    )
    .await
    .unwrap();

    let returned = circulation::return_loan(
        &db,
        &policy,
        loan.id,
        Some("2026-01-10".to_string()),
        None,
    )
    .await
    .unwrap();

    assert_eq!(returned.fine_amount, None);
    assert_eq!(copy_status(&db, copy_id).await, "available");
}

#[tokio::test]
async fn test_double_return_fails_without_side_effects() {
    let db = setup_test_db().await;
    let policy = CirculationPolicy::default();
    let borrower = create_test_user(&db, "Borrower", "double@example.test", "member").await;
    let book_id = create_test_book(&db, "Foundation").await;
    let copy_id = create_test_copy(&db, book_id, "available").await;

    let loan = circulation::create_loan(
        &db,
        &policy,
        loan_dto(copy_id, borrower, "2026-01-01", "2026-01-15"),
        None,
    )
    .await
    .unwrap();

    let first = circulation::return_loan(
        &db,
        &policy,
        loan.id,
        Some("2026-01-21".to_string()),
        None,
    )
    .await
    .unwrap();

    let err = circulation::return_loan(
        &db,
        &policy,
        loan.id,
        Some("2026-02-01".to_string()),
        None,
    )
    .await
    .expect_err("second return must fail");

    assert!(matches!(err, CirculationError::AlreadyReturned));

    // Nothing changed on the second attempt
    let after = loan::Entity::find_by_id(loan.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.returned_date, first.returned_date);
    assert_eq!(after.fine_amount, first.fine_amount);
    assert_eq!(copy_status(&db, copy_id).await, "available");
}

#[tokio::test]
async fn test_borrowing_limit_enforced() {
    let db = setup_test_db().await;
    let policy = CirculationPolicy::default();
    let borrower = create_test_user(&db, "Capped", "capped@example.test", "member").await;
    create_test_member_profile(&db, borrower, 2).await;
    let book_id = create_test_book(&db, "Series").await;

    for i in 0..2 {
        let copy_id = create_test_copy(&db, book_id, "available").await;
        circulation::create_loan(
            &db,
            &policy,
            loan_dto(copy_id, borrower, "2026-01-01", "2026-01-15"),
            None,
        )
        .await
        .unwrap_or_else(|e| panic!("loan {} should succeed: {}", i, e));
    }

    let third_copy = create_test_copy(&db, book_id, "available").await;
    let err = circulation::create_loan(
        &db,
        &policy,
        loan_dto(third_copy, borrower, "2026-01-01", "2026-01-15"),
        None,
    )
    .await
    .expect_err("third loan must exceed the limit");

    assert!(matches!(err, CirculationError::LimitExceeded(_)));
    assert_eq!(copy_status(&db, third_copy).await, "available");
}

#[tokio::test]
async fn test_suspended_borrower_rejected() {
    let db = setup_test_db().await;
    let policy = CirculationPolicy::default();
    let now = chrono::Utc::now().to_rfc3339();
    let suspended = user::ActiveModel {
        name: Set("Suspended".to_string()),
        email: Set("suspended@example.test".to_string()),
        password_hash: Set("$argon2id$dummy".to_string()),
        role: Set("member".to_string()),
        status: Set("suspended".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    let user_id = user::Entity::insert(suspended).exec(&db).await.unwrap().last_insert_id;

    let book_id = create_test_book(&db, "Any").await;
    let copy_id = create_test_copy(&db, book_id, "available").await;

    let err = circulation::create_loan(
        &db,
        &policy,
        loan_dto(copy_id, user_id, "2026-01-01", "2026-01-15"),
        None,
    )
    .await
    .expect_err("suspended borrower must be rejected");

    assert!(matches!(err, CirculationError::Validation(_)));
    assert_eq!(copy_status(&db, copy_id).await, "available");
}

#[tokio::test]
async fn test_overdue_is_derived_from_due_date() {
    let db = setup_test_db().await;
    let policy = CirculationPolicy::default();
    let borrower = create_test_user(&db, "Overdue", "overdue@example.test", "member").await;
    let book_id = create_test_book(&db, "Late Book").await;
    let copy_id = create_test_copy(&db, book_id, "available").await;

    // Due well in the past; stored status stays 'active'
    let loan = circulation::create_loan(
        &db,
        &policy,
        loan_dto(copy_id, borrower, "2020-01-01", "2020-01-15"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(loan.status, "active");

    let today = chrono::Local::now().date_naive();
    assert!(circulation::is_overdue(&loan, today));
    assert!(circulation::days_overdue(&loan, today) > 0);
    assert!(circulation::current_fine(&loan, &policy, today) > 0.0);

    // The overdue list filter finds it despite the cached status
    let overdue = circulation::list_loans(
        &db,
        &policy,
        LoanFilter {
            status: Some("overdue".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, loan.id);
    assert!(overdue[0].is_overdue);

    // A returned loan is never overdue
    let returned = circulation::return_loan(&db, &policy, loan.id, None, None)
        .await
        .unwrap();
    assert!(!circulation::is_overdue(&returned, today));
}

#[tokio::test]
async fn test_mark_lost() {
    let db = setup_test_db().await;
    let policy = CirculationPolicy::default();
    let borrower = create_test_user(&db, "Loser", "lost@example.test", "member").await;
    let book_id = create_test_book(&db, "Gone").await;
    let copy_id = create_test_copy(&db, book_id, "available").await;

    let loan = circulation::create_loan(
        &db,
        &policy,
        loan_dto(copy_id, borrower, "2026-01-01", "2026-01-15"),
        None,
    )
    .await
    .unwrap();

    let lost = circulation::mark_lost(&db, loan.id).await.unwrap();
    assert_eq!(lost.status, "lost");
    assert_eq!(copy_status(&db, copy_id).await, "lost");

    // Marking lost twice is rejected
    let err = circulation::mark_lost(&db, loan.id).await.expect_err("must fail");
    assert!(matches!(err, CirculationError::InvalidState(_)));
}

#[tokio::test]
async fn test_lost_loans_leave_active_and_overdue_views() {
    let db = setup_test_db().await;
    let policy = CirculationPolicy::default();
    let borrower = create_test_user(&db, "Careless", "careless@example.test", "member").await;
    let book_id = create_test_book(&db, "Write-off").await;
    let copy_id = create_test_copy(&db, book_id, "available").await;

    // Long past due before it is reported lost
    let loan = circulation::create_loan(
        &db,
        &policy,
        loan_dto(copy_id, borrower, "2020-01-01", "2020-01-15"),
        None,
    )
    .await
    .unwrap();

    circulation::mark_lost(&db, loan.id).await.unwrap();
    let lost = loan::Entity::find_by_id(loan.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();

    // Written off: no longer overdue, no fine keeps growing
    let today = chrono::Local::now().date_naive();
    assert!(!circulation::is_overdue(&lost, today));
    assert_eq!(circulation::days_overdue(&lost, today), 0);
    assert_eq!(circulation::current_fine(&lost, &policy, today), 0.0);

    for status in ["active", "overdue"] {
        let rows = circulation::list_loans(
            &db,
            &policy,
            LoanFilter {
                status: Some(status.to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(rows.is_empty(), "{} view must not contain lost loans", status);
    }

    assert_eq!(circulation::count_active_loans(&db).await.unwrap(), 0);
    assert_eq!(circulation::count_overdue_loans(&db).await.unwrap(), 0);

    let lost_view = circulation::list_loans(
        &db,
        &policy,
        LoanFilter {
            status: Some("lost".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(lost_view.len(), 1);
    assert_eq!(lost_view[0].id, loan.id);
}

#[tokio::test]
async fn test_fine_pay_and_waive() {
    let db = setup_test_db().await;
    let policy = CirculationPolicy::default();
    let borrower = create_test_user(&db, "Fined", "fined@example.test", "member").await;
    let book_id = create_test_book(&db, "Late Again").await;

    // Paid fine
    let copy_a = create_test_copy(&db, book_id, "available").await;
    let loan_a = circulation::create_loan(
        &db,
        &policy,
        loan_dto(copy_a, borrower, "2026-01-01", "2026-01-15"),
        None,
    )
    .await
    .unwrap();
    circulation::return_loan(&db, &policy, loan_a.id, Some("2026-01-18".to_string()), None)
        .await
        .unwrap();

    let paid = circulation::pay_fine(&db, loan_a.id).await.unwrap();
    assert_eq!(paid.fine_amount, Some(3.00));
    assert!(paid.fine_paid);

    // Paying again is rejected
    let err = circulation::pay_fine(&db, loan_a.id).await.expect_err("must fail");
    assert!(matches!(err, CirculationError::InvalidState(_)));

    // Waived fine is zeroed
    let copy_b = create_test_copy(&db, book_id, "available").await;
    let loan_b = circulation::create_loan(
        &db,
        &policy,
        loan_dto(copy_b, borrower, "2026-01-01", "2026-01-15"),
        None,
    )
    .await
    .unwrap();
    circulation::return_loan(&db, &policy, loan_b.id, Some("2026-01-20".to_string()), None)
        .await
        .unwrap();

    let waived = circulation::waive_fine(&db, loan_b.id).await.unwrap();
    assert_eq!(waived.fine_amount, Some(0.0));
    assert!(waived.fine_paid);

    // No fine on an on-time return to collect
    let copy_c = create_test_copy(&db, book_id, "available").await;
    let loan_c = circulation::create_loan(
        &db,
        &policy,
        loan_dto(copy_c, borrower, "2026-01-01", "2026-01-15"),
        None,
    )
    .await
    .unwrap();
    circulation::return_loan(&db, &policy, loan_c.id, Some("2026-01-10".to_string()), None)
        .await
        .unwrap();
    let err = circulation::pay_fine(&db, loan_c.id).await.expect_err("must fail");
    assert!(matches!(err, CirculationError::InvalidState(_)));
}

#[tokio::test]
async fn test_list_loans_enriched_and_filtered() {
    let db = setup_test_db().await;
    let policy = CirculationPolicy::default();
    let alice = create_test_user(&db, "Alice Reader", "alice2@example.test", "member").await;
    let bob = create_test_user(&db, "Bob Reader", "bob2@example.test", "member").await;
    let book_id = create_test_book(&db, "Shared Title").await;
    let copy_a = create_test_copy(&db, book_id, "available").await;
    let copy_b = create_test_copy(&db, book_id, "available").await;

    circulation::create_loan(
        &db,
        &policy,
        loan_dto(copy_a, alice, "2026-01-01", "2026-01-15"),
        None,
    )
    .await
    .unwrap();
    let bob_loan = circulation::create_loan(
        &db,
        &policy,
        loan_dto(copy_b, bob, "2026-01-02", "2026-01-16"),
        None,
    )
    .await
    .unwrap();
    circulation::return_loan(&db, &policy, bob_loan.id, Some("2026-01-10".to_string()), None)
        .await
        .unwrap();

    let all = circulation::list_loans(&db, &policy, LoanFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].book_title, "Shared Title");

    let active = circulation::list_loans(
        &db,
        &policy,
        LoanFilter {
            status: Some("active".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].borrower_name, "Alice Reader");

    let bobs = circulation::list_loans(
        &db,
        &policy,
        LoanFilter {
            user_id: Some(bob),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(bobs.len(), 1);
    assert_eq!(bobs[0].status, "returned");

    assert_eq!(circulation::count_loans(&db).await.unwrap(), 2);
    assert_eq!(circulation::count_active_loans(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_due_date_defaults_to_loan_period() {
    let db = setup_test_db().await;
    let policy = CirculationPolicy::default();
    let borrower = create_test_user(&db, "Default", "default@example.test", "member").await;
    let book_id = create_test_book(&db, "Defaults").await;
    let copy_id = create_test_copy(&db, book_id, "available").await;

    let loan = circulation::create_loan(
        &db,
        &policy,
        loan::LoanDto {
            book_copy_id: copy_id,
            user_id: borrower,
            borrowed_date: Some("2026-01-01".to_string()),
            due_date: None,
            notes: None,
        },
        None,
    )
    .await
    .unwrap();

    assert_eq!(loan.due_date, "2026-01-15");
}

#[tokio::test]
async fn test_due_before_borrowed_rejected() {
    let db = setup_test_db().await;
    let policy = CirculationPolicy::default();
    let borrower = create_test_user(&db, "Backwards", "back@example.test", "member").await;
    let book_id = create_test_book(&db, "Backwards").await;
    let copy_id = create_test_copy(&db, book_id, "available").await;

    let err = circulation::create_loan(
        &db,
        &policy,
        loan_dto(copy_id, borrower, "2026-01-15", "2026-01-01"),
        None,
    )
    .await
    .expect_err("must fail");
    assert!(matches!(err, CirculationError::Validation(_)));
}
