//! Member and staff profiles.
//!
//! A profile row and its user account are created as one unit: the whole
//! write happens inside a transaction and rolls back together, so a failed
//! profile insert never leaves an orphaned user behind.

use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::Deserialize;

use crate::auth::hash_password;
use crate::domain::role::Role;
use crate::domain::CirculationError;
use crate::models::member::{self, Entity as Member};
use crate::models::staff::{self, Entity as Staff};
use crate::models::user::{self, Entity as User};

use super::{fmt_date, now_ts, parse_date, today};

#[derive(Debug, Deserialize)]
pub struct CreateMemberDto {
    // Account fields
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub status: Option<String>,
    // Profile fields
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub membership_start_date: Option<String>,
    pub membership_expiry_date: Option<String>,
    pub membership_type: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub notes: Option<String>,
    pub max_books_allowed: Option<i32>,
    pub max_days_allowed: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStaffDto {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub status: Option<String>,
    /// 'admin' or 'librarian'; defaults to librarian
    pub role: Option<String>,
    pub hire_date: Option<String>,
    pub position: Option<String>,
    pub notes: Option<String>,
}

const USER_STATUSES: [&str; 3] = ["active", "inactive", "suspended"];
const MEMBERSHIP_TYPES: [&str; 4] = ["basic", "premium", "student", "senior"];

fn validate_email(email: &str) -> Result<(), CirculationError> {
    if email.contains('@') && email.len() >= 3 {
        Ok(())
    } else {
        Err(CirculationError::Validation(format!(
            "'{}' is not a valid email address",
            email
        )))
    }
}

fn validate_status(status: &str) -> Result<(), CirculationError> {
    if USER_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(CirculationError::Validation(format!(
            "Unknown account status '{}'",
            status
        )))
    }
}

async fn check_email_free<C: ConnectionTrait>(db: &C, email: &str) -> Result<(), CirculationError> {
    let taken = User::find()
        .filter(user::Column::Email.eq(email))
        .count(db)
        .await?;
    if taken > 0 {
        return Err(CirculationError::Validation(format!(
            "Email '{}' is already registered",
            email
        )));
    }
    Ok(())
}

/// Next 'LIB' card number: zero-padded sequence from the highest member id.
async fn next_card_number<C: ConnectionTrait>(db: &C) -> Result<String, CirculationError> {
    let max_id: Option<i32> = Member::find()
        .select_only()
        .column_as(Expr::col(member::Column::Id).max(), "max_id")
        .into_tuple()
        .one(db)
        .await?
        .flatten();
    Ok(format!("LIB{:06}", max_id.unwrap_or(0) + 1))
}

/// Next 'EMP' employee number from the highest staff id.
async fn next_employee_id<C: ConnectionTrait>(db: &C) -> Result<String, CirculationError> {
    let max_id: Option<i32> = Staff::find()
        .select_only()
        .column_as(Expr::col(staff::Column::Id).max(), "max_id")
        .into_tuple()
        .one(db)
        .await?
        .flatten();
    Ok(format!("EMP{:05}", max_id.unwrap_or(0) + 1))
}

/// Create a member: user account plus member profile, all-or-nothing.
pub async fn create_member(
    db: &DatabaseConnection,
    dto: CreateMemberDto,
) -> Result<(user::Model, member::Model), CirculationError> {
    let now = now_ts();
    let on = today();

    validate_email(&dto.email)?;
    let status = dto.status.unwrap_or_else(|| "active".to_string());
    validate_status(&status)?;

    let membership_type = dto.membership_type.unwrap_or_else(|| "basic".to_string());
    if !MEMBERSHIP_TYPES.contains(&membership_type.as_str()) {
        return Err(CirculationError::Validation(format!(
            "Unknown membership type '{}'",
            membership_type
        )));
    }

    let start = match &dto.membership_start_date {
        Some(s) => parse_date(s, "membership_start_date")?,
        None => on,
    };
    let expiry = match &dto.membership_expiry_date {
        Some(s) => parse_date(s, "membership_expiry_date")?,
        None => start + chrono::Duration::days(365),
    };
    if expiry <= start {
        return Err(CirculationError::Validation(
            "membership_expiry_date must be after membership_start_date".to_string(),
        ));
    }

    let password_hash =
        hash_password(&dto.password).map_err(CirculationError::Validation)?;

    let txn = db.begin().await?;

    check_email_free(&txn, &dto.email).await?;

    let saved_user = user::ActiveModel {
        name: Set(dto.name),
        email: Set(dto.email),
        password_hash: Set(password_hash),
        phone: Set(dto.phone),
        role: Set(Role::Member.as_str().to_owned()),
        status: Set(status),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let card_number = next_card_number(&txn).await?;

    let saved_member = member::ActiveModel {
        user_id: Set(saved_user.id),
        date_of_birth: Set(dto.date_of_birth),
        gender: Set(dto.gender),
        address: Set(dto.address),
        library_card_number: Set(card_number),
        membership_start_date: Set(fmt_date(start)),
        membership_expiry_date: Set(fmt_date(expiry)),
        membership_type: Set(membership_type),
        emergency_contact_name: Set(dto.emergency_contact_name),
        emergency_contact_phone: Set(dto.emergency_contact_phone),
        notes: Set(dto.notes),
        max_books_allowed: Set(dto.max_books_allowed.unwrap_or(5)),
        max_days_allowed: Set(dto.max_days_allowed.unwrap_or(14)),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        user_id = saved_user.id,
        card = %saved_member.library_card_number,
        "member created"
    );
    Ok((saved_user, saved_member))
}

/// Create a staff user (admin or librarian) plus staff profile, all-or-nothing.
pub async fn create_staff(
    db: &DatabaseConnection,
    dto: CreateStaffDto,
) -> Result<(user::Model, staff::Model), CirculationError> {
    let now = now_ts();

    validate_email(&dto.email)?;
    let status = dto.status.unwrap_or_else(|| "active".to_string());
    validate_status(&status)?;

    let role = match dto.role.as_deref() {
        None => Role::Librarian,
        Some(s) => match Role::parse(s) {
            Some(r) if r.is_staff() => r,
            _ => {
                return Err(CirculationError::Validation(format!(
                    "'{}' is not a staff role",
                    s
                )));
            }
        },
    };

    let hire_date = match &dto.hire_date {
        Some(s) => parse_date(s, "hire_date")?,
        None => today(),
    };

    let password_hash =
        hash_password(&dto.password).map_err(CirculationError::Validation)?;

    let txn = db.begin().await?;

    check_email_free(&txn, &dto.email).await?;

    let saved_user = user::ActiveModel {
        name: Set(dto.name),
        email: Set(dto.email),
        password_hash: Set(password_hash),
        phone: Set(dto.phone),
        role: Set(role.as_str().to_owned()),
        status: Set(status),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let employee_id = next_employee_id(&txn).await?;

    let saved_staff = staff::ActiveModel {
        user_id: Set(saved_user.id),
        employee_id: Set(employee_id),
        hire_date: Set(fmt_date(hire_date)),
        position: Set(dto.position),
        notes: Set(dto.notes),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        user_id = saved_user.id,
        employee = %saved_staff.employee_id,
        "staff member created"
    );
    Ok((saved_user, saved_staff))
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberDto {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub status: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub membership_expiry_date: Option<String>,
    pub membership_type: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub notes: Option<String>,
    pub max_books_allowed: Option<i32>,
    pub max_days_allowed: Option<i32>,
}

/// Update a member's account and profile. The library card number is
/// immutable, as is the email.
pub async fn update_member(
    db: &DatabaseConnection,
    user_id: i32,
    dto: UpdateMemberDto,
) -> Result<(user::Model, member::Model), CirculationError> {
    let (user, profile) = get_member(db, user_id).await?;
    let now = now_ts();

    if let Some(status) = &dto.status {
        validate_status(status)?;
    }
    if let Some(t) = &dto.membership_type {
        if !MEMBERSHIP_TYPES.contains(&t.as_str()) {
            return Err(CirculationError::Validation(format!(
                "Unknown membership type '{}'",
                t
            )));
        }
    }
    let expiry = match &dto.membership_expiry_date {
        Some(s) => {
            let parsed = parse_date(s, "membership_expiry_date")?;
            let start = parse_date(&profile.membership_start_date, "membership_start_date")?;
            if parsed <= start {
                return Err(CirculationError::Validation(
                    "membership_expiry_date must be after membership_start_date".to_string(),
                ));
            }
            Some(fmt_date(parsed))
        }
        None => None,
    };

    let txn = db.begin().await?;

    let mut user_active: user::ActiveModel = user.into();
    if let Some(name) = dto.name {
        user_active.name = Set(name);
    }
    if let Some(phone) = dto.phone {
        user_active.phone = Set(Some(phone));
    }
    if let Some(status) = dto.status {
        user_active.status = Set(status);
    }
    user_active.updated_at = Set(now.clone());
    let updated_user = user_active.update(&txn).await?;

    let mut profile_active: member::ActiveModel = profile.into();
    if let Some(v) = dto.date_of_birth {
        profile_active.date_of_birth = Set(Some(v));
    }
    if let Some(v) = dto.gender {
        profile_active.gender = Set(Some(v));
    }
    if let Some(v) = dto.address {
        profile_active.address = Set(Some(v));
    }
    if let Some(v) = expiry {
        profile_active.membership_expiry_date = Set(v);
    }
    if let Some(v) = dto.membership_type {
        profile_active.membership_type = Set(v);
    }
    if let Some(v) = dto.emergency_contact_name {
        profile_active.emergency_contact_name = Set(Some(v));
    }
    if let Some(v) = dto.emergency_contact_phone {
        profile_active.emergency_contact_phone = Set(Some(v));
    }
    if let Some(v) = dto.notes {
        profile_active.notes = Set(Some(v));
    }
    if let Some(v) = dto.max_books_allowed {
        profile_active.max_books_allowed = Set(v);
    }
    if let Some(v) = dto.max_days_allowed {
        profile_active.max_days_allowed = Set(v);
    }
    profile_active.updated_at = Set(now);
    let updated_profile = profile_active.update(&txn).await?;

    txn.commit().await?;
    Ok((updated_user, updated_profile))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStaffDto {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub status: Option<String>,
    /// 'admin' or 'librarian'
    pub role: Option<String>,
    pub position: Option<String>,
    pub notes: Option<String>,
}

/// Update a staff account and profile. The employee id is immutable.
pub async fn update_staff(
    db: &DatabaseConnection,
    user_id: i32,
    dto: UpdateStaffDto,
) -> Result<(user::Model, staff::Model), CirculationError> {
    let (user, profile) = get_staff(db, user_id).await?;
    let now = now_ts();

    if let Some(status) = &dto.status {
        validate_status(status)?;
    }
    let role = match dto.role.as_deref() {
        None => None,
        Some(s) => match Role::parse(s) {
            Some(r) if r.is_staff() => Some(r),
            _ => {
                return Err(CirculationError::Validation(format!(
                    "'{}' is not a staff role",
                    s
                )));
            }
        },
    };

    let txn = db.begin().await?;

    let mut user_active: user::ActiveModel = user.into();
    if let Some(name) = dto.name {
        user_active.name = Set(name);
    }
    if let Some(phone) = dto.phone {
        user_active.phone = Set(Some(phone));
    }
    if let Some(status) = dto.status {
        user_active.status = Set(status);
    }
    if let Some(role) = role {
        user_active.role = Set(role.as_str().to_owned());
    }
    user_active.updated_at = Set(now.clone());
    let updated_user = user_active.update(&txn).await?;

    let mut profile_active: staff::ActiveModel = profile.into();
    if let Some(v) = dto.position {
        profile_active.position = Set(Some(v));
    }
    if let Some(v) = dto.notes {
        profile_active.notes = Set(Some(v));
    }
    profile_active.updated_at = Set(now);
    let updated_profile = profile_active.update(&txn).await?;

    txn.commit().await?;
    Ok((updated_user, updated_profile))
}

/// Fetch a user together with its member profile.
pub async fn get_member(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<(user::Model, member::Model), CirculationError> {
    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(CirculationError::NotFound)?;
    let profile = Member::find()
        .filter(member::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(CirculationError::NotFound)?;
    Ok((user, profile))
}

/// Fetch a user together with its staff profile.
pub async fn get_staff(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<(user::Model, staff::Model), CirculationError> {
    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(CirculationError::NotFound)?;
    let profile = Staff::find()
        .filter(staff::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(CirculationError::NotFound)?;
    Ok((user, profile))
}

/// Delete a user account; the profile row goes with it via the FK cascade.
pub async fn delete_user(db: &DatabaseConnection, user_id: i32) -> Result<(), CirculationError> {
    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(CirculationError::NotFound)?;
    user.delete(db).await?;
    Ok(())
}
