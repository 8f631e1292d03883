//! Member and staff profile creation tests.

use openshelf::db;
use openshelf::domain::CirculationError;
use openshelf::models::{member, staff, user};
use openshelf::services::profiles::{
    self, CreateMemberDto, CreateStaffDto, UpdateMemberDto, UpdateStaffDto,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

fn member_dto(name: &str, email: &str) -> CreateMemberDto {
    CreateMemberDto {
        name: name.to_string(),
        email: email.to_string(),
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
    }
}

fn staff_dto(name: &str, email: &str, role: Option<&str>) -> CreateStaffDto {
    CreateStaffDto {
        name: name.to_string(),
        email: email.to_string(),
        password: "secret123".to_string(),
        phone: None,
        status: None,
        role: role.map(|r| r.to_string()),
        hire_date: None,
        position: None,
        notes: None,
    }
}

#[tokio::test]
async fn test_create_member_defaults() {
    let db = setup_test_db().await;

    let (user, profile) = profiles::create_member(&db, member_dto("Jane Reader", "jane@example.test"))
        .await
        .expect("member should be created");

    assert_eq!(user.role, "member");
    assert_eq!(user.status, "active");
    assert_eq!(profile.user_id, user.id);
    assert_eq!(profile.library_card_number, "LIB000001");
    assert_eq!(profile.membership_type, "basic");
    assert_eq!(profile.max_books_allowed, 5);
    assert_eq!(profile.max_days_allowed, 14);

    let (_, second) = profiles::create_member(&db, member_dto("Joe Reader", "joe@example.test"))
        .await
        .unwrap();
    assert_eq!(second.library_card_number, "LIB000002");
}

#[tokio::test]
async fn test_create_member_duplicate_email_leaves_no_orphan() {
    let db = setup_test_db().await;

    profiles::create_member(&db, member_dto("Jane", "dup@example.test"))
        .await
        .unwrap();

    let err = profiles::create_member(&db, member_dto("Imposter", "dup@example.test"))
        .await
        .expect_err("duplicate email must be rejected");
    assert!(matches!(err, CirculationError::Validation(_)));

    // The failed creation rolled back as a unit
    assert_eq!(user::Entity::find().count(&db).await.unwrap(), 1);
    assert_eq!(member::Entity::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_create_member_validation() {
    let db = setup_test_db().await;

    let mut dto = member_dto("Bad Email", "not-an-email");
    let err = profiles::create_member(&db, dto).await.expect_err("must fail");
    assert!(matches!(err, CirculationError::Validation(_)));

    dto = member_dto("Bad Type", "type@example.test");
    dto.membership_type = Some("gold".to_string());
    let err = profiles::create_member(&db, dto).await.expect_err("must fail");
    assert!(matches!(err, CirculationError::Validation(_)));

    dto = member_dto("Bad Status", "status@example.test");
    dto.status = Some("banned".to_string());
    let err = profiles::create_member(&db, dto).await.expect_err("must fail");
    assert!(matches!(err, CirculationError::Validation(_)));

    assert_eq!(user::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_create_staff_roles_and_ids() {
    let db = setup_test_db().await;

    let (librarian, profile) =
        profiles::create_staff(&db, staff_dto("Lisa Librarian", "lisa@example.test", None))
            .await
            .expect("staff should be created");
    assert_eq!(librarian.role, "librarian");
    assert_eq!(profile.employee_id, "EMP00001");

    let (admin, profile) = profiles::create_staff(
        &db,
        staff_dto("Adam Admin", "adam@example.test", Some("admin")),
    )
    .await
    .unwrap();
    assert_eq!(admin.role, "admin");
    assert_eq!(profile.employee_id, "EMP00002");

    // Staff roles are restricted; members go through create_member
    let err = profiles::create_staff(
        &db,
        staff_dto("Sneaky", "sneaky@example.test", Some("member")),
    )
    .await
    .expect_err("member is not a staff role");
    assert!(matches!(err, CirculationError::Validation(_)));
}

#[tokio::test]
async fn test_get_profiles() {
    let db = setup_test_db().await;

    let (member_user, _) = profiles::create_member(&db, member_dto("M", "m@example.test"))
        .await
        .unwrap();
    let (staff_user, _) = profiles::create_staff(&db, staff_dto("S", "s@example.test", None))
        .await
        .unwrap();

    let (found, profile) = profiles::get_member(&db, member_user.id).await.unwrap();
    assert_eq!(found.email, "m@example.test");
    assert_eq!(profile.user_id, member_user.id);

    let (found, profile) = profiles::get_staff(&db, staff_user.id).await.unwrap();
    assert_eq!(found.email, "s@example.test");
    assert_eq!(profile.user_id, staff_user.id);

    // A member has no staff profile and vice versa
    let err = profiles::get_staff(&db, member_user.id).await.expect_err("must fail");
    assert!(matches!(err, CirculationError::NotFound));
    let err = profiles::get_member(&db, staff_user.id).await.expect_err("must fail");
    assert!(matches!(err, CirculationError::NotFound));
}

#[tokio::test]
async fn test_update_member_keeps_card_number() {
    let db = setup_test_db().await;

    let (user, profile) = profiles::create_member(&db, member_dto("Old Name", "m@example.test"))
        .await
        .unwrap();

    let (updated_user, updated_profile) = profiles::update_member(
        &db,
        user.id,
        UpdateMemberDto {
            name: Some("New Name".to_string()),
            phone: Some("555-0100".to_string()),
            status: Some("suspended".to_string()),
            date_of_birth: None,
            gender: None,
            address: None,
            membership_expiry_date: None,
            membership_type: Some("premium".to_string()),
            emergency_contact_name: None,
            emergency_contact_phone: None,
            notes: None,
            max_books_allowed: Some(10),
            max_days_allowed: None,
        },
    )
    .await
    .expect("update should succeed");

    assert_eq!(updated_user.name, "New Name");
    assert_eq!(updated_user.status, "suspended");
    assert_eq!(updated_user.email, "m@example.test");
    assert_eq!(updated_profile.membership_type, "premium");
    assert_eq!(updated_profile.max_books_allowed, 10);
    assert_eq!(updated_profile.library_card_number, profile.library_card_number);

    let err = profiles::update_member(
        &db,
        user.id,
        UpdateMemberDto {
            name: None,
            phone: None,
            status: Some("banned".to_string()),
            date_of_birth: None,
            gender: None,
            address: None,
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
    .expect_err("unknown status must be rejected");
    assert!(matches!(err, CirculationError::Validation(_)));
}

#[tokio::test]
async fn test_update_staff_role_change() {
    let db = setup_test_db().await;

    let (user, profile) = profiles::create_staff(&db, staff_dto("S", "s@example.test", None))
        .await
        .unwrap();
    assert_eq!(user.role, "librarian");

    let (updated_user, updated_profile) = profiles::update_staff(
        &db,
        user.id,
        UpdateStaffDto {
            name: None,
            phone: None,
            status: None,
            role: Some("admin".to_string()),
            position: Some("Branch Manager".to_string()),
            notes: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(updated_user.role, "admin");
    assert_eq!(updated_profile.position.as_deref(), Some("Branch Manager"));
    assert_eq!(updated_profile.employee_id, profile.employee_id);

    let err = profiles::update_staff(
        &db,
        user.id,
        UpdateStaffDto {
            name: None,
            phone: None,
            status: None,
            role: Some("member".to_string()),
            position: None,
            notes: None,
        },
    )
    .await
    .expect_err("member is not a staff role");
    assert!(matches!(err, CirculationError::Validation(_)));
}

#[tokio::test]
async fn test_delete_user_cascades_profile() {
    let db = setup_test_db().await;

    let (user, _) = profiles::create_member(&db, member_dto("Gone", "gone@example.test"))
        .await
        .unwrap();

    profiles::delete_user(&db, user.id).await.unwrap();

    assert_eq!(user::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(
        member::Entity::find()
            .filter(member::Column::UserId.eq(user.id))
            .count(&db)
            .await
            .unwrap(),
        0
    );
    assert_eq!(staff::Entity::find().count(&db).await.unwrap(), 0);

    let err = profiles::delete_user(&db, user.id).await.expect_err("must fail");
    assert!(matches!(err, CirculationError::NotFound));
}
