//! Reservation queue - per-book waitlists.
//!
//! A reservation targets a book; a specific copy is only bound when the
//! reservation is promoted to ready. Queue order is FIFO by reserved_date.
//! Expiry is derived on read; `expire_lapsed` exists as an explicit
//! reconciliation sweep rather than a background job.

use sea_orm::sea_query::Expr;
use sea_orm::*;

use crate::config::CirculationPolicy;
use crate::domain::status::{CopyStatus, ReservationStatus};
use crate::domain::CirculationError;
use crate::models::book::Entity as Book;
use crate::models::book_copy::{self, Entity as BookCopy};
use crate::models::reservation::{self, Entity as Reservation};
use crate::models::user::Entity as User;

use super::{fmt_date, now_ts, parse_date, today};

/// A reservation has lapsed when its expiry date is behind `today` while it
/// still holds a queue slot. Stored 'expired' status is a cache of this.
pub fn is_lapsed(res: &reservation::Model, on: chrono::NaiveDate) -> bool {
    let Some(status) = ReservationStatus::parse(&res.status) else {
        return false;
    };
    if !status.is_active() {
        return false;
    }
    match chrono::NaiveDate::parse_from_str(&res.expiry_date, super::DATE_FMT) {
        Ok(expiry) => expiry < on,
        Err(_) => false,
    }
}

/// Place a reservation for any copy of a book.
pub async fn reserve(
    db: &DatabaseConnection,
    policy: &CirculationPolicy,
    book_id: i32,
    user_id: i32,
) -> Result<reservation::Model, CirculationError> {
    let now = now_ts();
    let on = today();

    Book::find_by_id(book_id)
        .one(db)
        .await?
        .ok_or(CirculationError::NotFound)?;

    let requester = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(CirculationError::NotFound)?;

    if requester.status != "active" {
        return Err(CirculationError::Validation(format!(
            "Account is {}",
            requester.status
        )));
    }

    // One live reservation per user per book
    let existing = Reservation::find()
        .filter(reservation::Column::BookId.eq(book_id))
        .filter(reservation::Column::UserId.eq(user_id))
        .filter(reservation::Column::Status.is_in([
            ReservationStatus::Pending.as_str(),
            ReservationStatus::Ready.as_str(),
        ]))
        .count(db)
        .await?;

    if existing > 0 {
        return Err(CirculationError::InvalidState(
            "User already has an active reservation for this book".to_string(),
        ));
    }

    let new_reservation = reservation::ActiveModel {
        book_id: Set(book_id),
        user_id: Set(user_id),
        reserved_date: Set(fmt_date(on)),
        expiry_date: Set(fmt_date(on + chrono::Duration::days(policy.reservation_expiry_days))),
        status: Set(ReservationStatus::Pending.as_str().to_owned()),
        book_copy_id: Set(None),
        notified_at: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = new_reservation.insert(db).await?;
    tracing::info!(
        reservation_id = saved.id,
        book_id,
        user_id,
        "reservation placed"
    );
    Ok(saved)
}

/// Promote a pending reservation: bind an available copy of the book and
/// hold it. The copy claim is a conditional update inside the transaction.
pub async fn promote(
    db: &DatabaseConnection,
    reservation_id: i32,
    copy_id: i32,
) -> Result<reservation::Model, CirculationError> {
    let now = now_ts();

    let res = Reservation::find_by_id(reservation_id)
        .one(db)
        .await?
        .ok_or(CirculationError::NotFound)?;

    if res.status != ReservationStatus::Pending.as_str() {
        return Err(CirculationError::InvalidState(format!(
            "Reservation is {}, only pending reservations can be promoted",
            res.status
        )));
    }
    if is_lapsed(&res, today()) {
        return Err(CirculationError::InvalidState(
            "Reservation has lapsed past its expiry date".to_string(),
        ));
    }

    let txn = db.begin().await?;

    let copy = BookCopy::find_by_id(copy_id)
        .one(&txn)
        .await?
        .ok_or(CirculationError::NotFound)?;

    if copy.book_id != res.book_id {
        return Err(CirculationError::Validation(
            "Copy does not belong to the reserved book".to_string(),
        ));
    }

    let claimed = BookCopy::update_many()
        .col_expr(
            book_copy::Column::Status,
            Expr::value(CopyStatus::Reserved.as_str()),
        )
        .col_expr(book_copy::Column::UpdatedAt, Expr::value(now.clone()))
        .filter(book_copy::Column::Id.eq(copy.id))
        .filter(book_copy::Column::Status.eq(CopyStatus::Available.as_str()))
        .exec(&txn)
        .await?;

    if claimed.rows_affected == 0 {
        return Err(CirculationError::CopyUnavailable(format!(
            "Copy is currently {}",
            copy.status
        )));
    }

    let mut active: reservation::ActiveModel = res.into();
    active.status = Set(ReservationStatus::Ready.as_str().to_owned());
    active.book_copy_id = Set(Some(copy.id));
    active.notified_at = Set(Some(now.clone()));
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        reservation_id = updated.id,
        copy_id,
        "reservation promoted to ready"
    );
    Ok(updated)
}

/// Mark a ready reservation fulfilled. Loan creation is a separate call;
/// borrowing the held copy through the circulation engine fulfills the
/// reservation automatically instead.
pub async fn fulfill(
    db: &DatabaseConnection,
    reservation_id: i32,
) -> Result<reservation::Model, CirculationError> {
    let res = Reservation::find_by_id(reservation_id)
        .one(db)
        .await?
        .ok_or(CirculationError::NotFound)?;

    if res.status != ReservationStatus::Ready.as_str() {
        return Err(CirculationError::InvalidState(format!(
            "Reservation is {}, only ready reservations can be fulfilled",
            res.status
        )));
    }

    let mut active: reservation::ActiveModel = res.into();
    active.status = Set(ReservationStatus::Fulfilled.as_str().to_owned());
    active.updated_at = Set(now_ts());
    Ok(active.update(db).await?)
}

/// Cancel a live reservation, releasing a bound copy if one was held.
pub async fn cancel(
    db: &DatabaseConnection,
    reservation_id: i32,
) -> Result<reservation::Model, CirculationError> {
    close_reservation(db, reservation_id, ReservationStatus::Cancelled).await
}

/// Expire a live reservation, releasing a bound copy if one was held.
pub async fn expire(
    db: &DatabaseConnection,
    reservation_id: i32,
) -> Result<reservation::Model, CirculationError> {
    close_reservation(db, reservation_id, ReservationStatus::Expired).await
}

/// Shared terminal transition for cancel/expire.
async fn close_reservation(
    db: &DatabaseConnection,
    reservation_id: i32,
    to: ReservationStatus,
) -> Result<reservation::Model, CirculationError> {
    let now = now_ts();

    let res = Reservation::find_by_id(reservation_id)
        .one(db)
        .await?
        .ok_or(CirculationError::NotFound)?;

    let status = ReservationStatus::parse(&res.status).ok_or_else(|| {
        CirculationError::Database(format!(
            "reservation {} has unknown status '{}'",
            res.id, res.status
        ))
    })?;
    if !status.is_active() {
        return Err(CirculationError::InvalidState(format!(
            "Reservation is already {}",
            res.status
        )));
    }

    let txn = db.begin().await?;

    // Release the held copy back to the shelf
    if let Some(copy_id) = res.book_copy_id {
        BookCopy::update_many()
            .col_expr(
                book_copy::Column::Status,
                Expr::value(CopyStatus::Available.as_str()),
            )
            .col_expr(book_copy::Column::UpdatedAt, Expr::value(now.clone()))
            .filter(book_copy::Column::Id.eq(copy_id))
            .filter(book_copy::Column::Status.eq(CopyStatus::Reserved.as_str()))
            .exec(&txn)
            .await?;
    }

    let mut active: reservation::ActiveModel = res.into();
    active.status = Set(to.as_str().to_owned());
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Reconciliation sweep: expire every live reservation whose expiry date has
/// passed. Returns how many were expired.
pub async fn expire_lapsed(db: &DatabaseConnection) -> Result<u64, CirculationError> {
    let on = today();

    let lapsed = Reservation::find()
        .filter(reservation::Column::Status.is_in([
            ReservationStatus::Pending.as_str(),
            ReservationStatus::Ready.as_str(),
        ]))
        .filter(reservation::Column::ExpiryDate.lt(fmt_date(on)))
        .all(db)
        .await?;

    let mut expired = 0u64;
    for res in lapsed {
        close_reservation(db, res.id, ReservationStatus::Expired).await?;
        expired += 1;
    }

    if expired > 0 {
        tracing::info!(count = expired, "expired lapsed reservations");
    }
    Ok(expired)
}

/// FIFO queue position for a pending reservation: pending reservations for
/// the same book with an earlier reserved_date (id breaks ties), plus one.
pub async fn queue_position(
    db: &DatabaseConnection,
    res: &reservation::Model,
) -> Result<Option<u64>, CirculationError> {
    if res.status != ReservationStatus::Pending.as_str() {
        return Ok(None);
    }

    let reserved = parse_date(&res.reserved_date, "reserved_date")?;
    let ahead = Reservation::find()
        .filter(reservation::Column::BookId.eq(res.book_id))
        .filter(reservation::Column::Status.eq(ReservationStatus::Pending.as_str()))
        .filter(
            Condition::any()
                .add(reservation::Column::ReservedDate.lt(fmt_date(reserved)))
                .add(
                    Condition::all()
                        .add(reservation::Column::ReservedDate.eq(fmt_date(reserved)))
                        .add(reservation::Column::Id.lt(res.id)),
                ),
        )
        .count(db)
        .await?;

    Ok(Some(ahead + 1))
}

/// Estimated wait in days: queue position times the average loan length.
pub async fn estimated_wait_days(
    db: &DatabaseConnection,
    policy: &CirculationPolicy,
    res: &reservation::Model,
) -> Result<Option<i64>, CirculationError> {
    Ok(queue_position(db, res)
        .await?
        .map(|pos| pos as i64 * policy.average_loan_days))
}

/// Filter parameters for listing reservations
#[derive(Debug, Default, Clone)]
pub struct ReservationFilter {
    pub book_id: Option<i32>,
    pub user_id: Option<i32>,
    /// Stored status, or the derived 'expired' view which also includes
    /// lapsed pending/ready rows.
    pub status: Option<String>,
}

/// Reservation enriched with queue placement and related names.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReservationWithDetails {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub reserved_date: String,
    pub expiry_date: String,
    pub status: String,
    pub book_copy_id: Option<i32>,
    pub notified_at: Option<String>,
    pub user_name: String,
    pub book_title: String,
    pub queue_position: Option<u64>,
    pub estimated_wait_days: Option<i64>,
}

/// List reservations with user/book names; pending rows carry their queue
/// position and estimated wait.
pub async fn list_reservations(
    db: &DatabaseConnection,
    policy: &CirculationPolicy,
    filter: ReservationFilter,
) -> Result<Vec<ReservationWithDetails>, CirculationError> {
    let on = today();
    let mut condition = Condition::all();

    if let Some(book_id) = filter.book_id {
        condition = condition.add(reservation::Column::BookId.eq(book_id));
    }
    if let Some(user_id) = filter.user_id {
        condition = condition.add(reservation::Column::UserId.eq(user_id));
    }
    if let Some(status) = &filter.status {
        condition = match status.as_str() {
            // Derived view: stored expired plus live rows past expiry
            "expired" => condition.add(
                Condition::any()
                    .add(reservation::Column::Status.eq(ReservationStatus::Expired.as_str()))
                    .add(
                        Condition::all()
                            .add(reservation::Column::Status.is_in([
                                ReservationStatus::Pending.as_str(),
                                ReservationStatus::Ready.as_str(),
                            ]))
                            .add(reservation::Column::ExpiryDate.lt(fmt_date(on))),
                    ),
            ),
            other if ReservationStatus::parse(other).is_some() => {
                condition.add(reservation::Column::Status.eq(other))
            }
            other => {
                return Err(CirculationError::Validation(format!(
                    "Unknown reservation status filter '{}'",
                    other
                )));
            }
        };
    }

    let rows = Reservation::find()
        .filter(condition)
        .order_by_asc(reservation::Column::ReservedDate)
        .order_by_asc(reservation::Column::Id)
        .find_also_related(User)
        .all(db)
        .await?;

    let book_ids: Vec<i32> = rows.iter().map(|(r, _)| r.book_id).collect();
    let mut book_titles = std::collections::HashMap::new();
    if !book_ids.is_empty() {
        for book in Book::find()
            .filter(crate::models::book::Column::Id.is_in(book_ids))
            .all(db)
            .await?
        {
            book_titles.insert(book.id, book.title);
        }
    }

    let mut result = Vec::with_capacity(rows.len());
    for (res, holder) in rows {
        let position = queue_position(db, &res).await?;
        let wait = position.map(|p| p as i64 * policy.average_loan_days);
        result.push(ReservationWithDetails {
            user_name: holder
                .map(|u| u.name)
                .unwrap_or_else(|| "Unknown".to_string()),
            book_title: book_titles
                .get(&res.book_id)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string()),
            queue_position: position,
            estimated_wait_days: wait,
            id: res.id,
            book_id: res.book_id,
            user_id: res.user_id,
            reserved_date: res.reserved_date,
            expiry_date: res.expiry_date,
            status: res.status,
            book_copy_id: res.book_copy_id,
            notified_at: res.notified_at,
        });
    }

    Ok(result)
}
