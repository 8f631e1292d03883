//! Circulation engine - the loan lifecycle.
//!
//! A copy has at most one open loan at any time. Claiming a copy is a
//! conditional UPDATE on its current status inside a transaction, so two
//! simultaneous borrow requests for the same copy cannot both succeed: the
//! second one matches zero rows and fails with `CopyUnavailable`.
//!
//! Overdue is never advanced by a background job. The stored loan status is
//! a cache written only on explicit transitions; every read derives overdue
//! from `returned_date IS NULL AND due_date < today`, except that lost
//! loans are written off and never count as active or overdue.

use chrono::NaiveDate;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use std::collections::HashMap;

use crate::config::CirculationPolicy;
use crate::domain::status::{CopyStatus, LoanStatus, ReservationStatus};
use crate::domain::CirculationError;
use crate::models::book::Entity as Book;
use crate::models::book_copy::{self, Entity as BookCopy};
use crate::models::loan::{self, Entity as Loan, LoanDto};
use crate::models::member::{self, Entity as Member};
use crate::models::reservation::{self, Entity as Reservation};
use crate::models::user::Entity as User;

use super::{fmt_date, now_ts, parse_date, round_money, today};

/// Derived overdue predicate. Ignores the cached overdue/active status, but
/// lost loans are written off and stop accruing.
pub fn is_overdue(loan: &loan::Model, on: NaiveDate) -> bool {
    if loan.returned_date.is_some() || loan.status == LoanStatus::Lost.as_str() {
        return false;
    }
    match NaiveDate::parse_from_str(&loan.due_date, super::DATE_FMT) {
        Ok(due) => due < on,
        Err(_) => false,
    }
}

/// Days late as of `on`; zero when not overdue.
pub fn days_overdue(loan: &loan::Model, on: NaiveDate) -> i64 {
    if !is_overdue(loan, on) {
        return 0;
    }
    match NaiveDate::parse_from_str(&loan.due_date, super::DATE_FMT) {
        Ok(due) => (on - due).num_days(),
        Err(_) => 0,
    }
}

/// The fine this loan would accrue if returned 'on'. For returned loans this
/// is the recorded amount.
pub fn current_fine(loan: &loan::Model, policy: &CirculationPolicy, on: NaiveDate) -> f64 {
    if loan.returned_date.is_some() {
        return loan.fine_amount.unwrap_or(0.0);
    }
    round_money(days_overdue(loan, on) as f64 * policy.fine_per_day)
}

/// Issue a loan for a copy.
///
/// The copy is claimed `available -> borrowed` atomically. A copy sitting in
/// `reserved` can only be claimed by the holder of the ready reservation
/// bound to it; doing so fulfills that reservation in the same transaction.
pub async fn create_loan(
    db: &DatabaseConnection,
    policy: &CirculationPolicy,
    dto: LoanDto,
    librarian_id: Option<i32>,
) -> Result<loan::Model, CirculationError> {
    let now = now_ts();

    let borrowed = match &dto.borrowed_date {
        Some(s) => parse_date(s, "borrowed_date")?,
        None => today(),
    };
    let due = match &dto.due_date {
        Some(s) => parse_date(s, "due_date")?,
        None => borrowed + chrono::Duration::days(policy.loan_period_days),
    };
    if due < borrowed {
        return Err(CirculationError::Validation(
            "due_date must not be before borrowed_date".to_string(),
        ));
    }

    // Borrower must exist and be in good standing
    let borrower = User::find_by_id(dto.user_id)
        .one(db)
        .await?
        .ok_or(CirculationError::NotFound)?;

    if borrower.status != "active" {
        return Err(CirculationError::Validation(format!(
            "Borrower account is {}",
            borrower.status
        )));
    }

    // Members carry a borrowing cap on their profile
    if let Some(profile) = Member::find()
        .filter(member::Column::UserId.eq(borrower.id))
        .one(db)
        .await?
    {
        let open_loans = Loan::find()
            .filter(loan::Column::UserId.eq(borrower.id))
            .filter(loan::Column::ReturnedDate.is_null())
            .count(db)
            .await?;

        if open_loans >= profile.max_books_allowed as u64 {
            return Err(CirculationError::LimitExceeded(format!(
                "Member already has {} open loans (limit {})",
                open_loans, profile.max_books_allowed
            )));
        }
    }

    let txn = db.begin().await?;

    let copy = BookCopy::find_by_id(dto.book_copy_id)
        .one(&txn)
        .await?
        .ok_or(CirculationError::NotFound)?;

    let copy_status = CopyStatus::parse(&copy.status).ok_or_else(|| {
        CirculationError::Database(format!("copy {} has unknown status '{}'", copy.id, copy.status))
    })?;

    // Which status we expect to claim the copy from
    let claim_from = match copy_status {
        CopyStatus::Available => CopyStatus::Available,
        CopyStatus::Reserved => {
            // Only the reservation holder may take a held copy
            let held = Reservation::find()
                .filter(reservation::Column::BookCopyId.eq(copy.id))
                .filter(reservation::Column::Status.eq(ReservationStatus::Ready.as_str()))
                .one(&txn)
                .await?;

            match held {
                Some(r) if r.user_id == borrower.id => {
                    let mut active: reservation::ActiveModel = r.into();
                    active.status = Set(ReservationStatus::Fulfilled.as_str().to_owned());
                    active.updated_at = Set(now.clone());
                    active.update(&txn).await?;
                    CopyStatus::Reserved
                }
                _ => {
                    return Err(CirculationError::CopyUnavailable(
                        "Copy is held for another borrower's reservation".to_string(),
                    ));
                }
            }
        }
        other => {
            return Err(CirculationError::CopyUnavailable(format!(
                "Copy is currently {}",
                other.as_str()
            )));
        }
    };

    // Conditional claim: zero rows means someone else got there first
    let claimed = BookCopy::update_many()
        .col_expr(
            book_copy::Column::Status,
            Expr::value(CopyStatus::Borrowed.as_str()),
        )
        .col_expr(book_copy::Column::UpdatedAt, Expr::value(now.clone()))
        .filter(book_copy::Column::Id.eq(copy.id))
        .filter(book_copy::Column::Status.eq(claim_from.as_str()))
        .exec(&txn)
        .await?;

    if claimed.rows_affected == 0 {
        return Err(CirculationError::CopyUnavailable(
            "Copy was claimed by a concurrent loan".to_string(),
        ));
    }

    let new_loan = loan::ActiveModel {
        book_copy_id: Set(copy.id),
        user_id: Set(borrower.id),
        librarian_id: Set(librarian_id),
        borrowed_date: Set(fmt_date(borrowed)),
        due_date: Set(fmt_date(due)),
        returned_date: Set(None),
        status: Set(LoanStatus::Active.as_str().to_owned()),
        fine_amount: Set(None),
        fine_paid: Set(false),
        notes: Set(dto.notes),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = new_loan.insert(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        loan_id = saved.id,
        copy_id = saved.book_copy_id,
        user_id = saved.user_id,
        "loan issued"
    );

    Ok(saved)
}

/// Take a return. Sets the returned date, computes the fine for late
/// returns and releases the copy, all in one transaction.
pub async fn return_loan(
    db: &DatabaseConnection,
    policy: &CirculationPolicy,
    loan_id: i32,
    returned_date: Option<String>,
    condition_notes: Option<String>,
) -> Result<loan::Model, CirculationError> {
    let now = now_ts();

    let loan = Loan::find_by_id(loan_id)
        .one(db)
        .await?
        .ok_or(CirculationError::NotFound)?;

    if loan.returned_date.is_some() {
        return Err(CirculationError::AlreadyReturned);
    }

    let returned = match &returned_date {
        Some(s) => parse_date(s, "returned_date")?,
        None => today(),
    };
    let due = parse_date(&loan.due_date, "due_date")?;
    let borrowed = parse_date(&loan.borrowed_date, "borrowed_date")?;
    if returned < borrowed {
        return Err(CirculationError::Validation(
            "returned_date must not be before borrowed_date".to_string(),
        ));
    }

    let txn = db.begin().await?;

    let mut active: loan::ActiveModel = loan.clone().into();
    active.returned_date = Set(Some(fmt_date(returned)));
    active.status = Set(LoanStatus::Returned.as_str().to_owned());
    active.updated_at = Set(now.clone());

    if returned > due {
        let days_late = (returned - due).num_days();
        active.fine_amount = Set(Some(round_money(days_late as f64 * policy.fine_per_day)));
        active.fine_paid = Set(false);
    }

    if let Some(extra) = condition_notes {
        let notes = match &loan.notes {
            Some(existing) => format!("{}\n\nReturn notes: {}", existing, extra),
            None => format!("Return notes: {}", extra),
        };
        active.notes = Set(Some(notes));
    }

    let updated = active.update(&txn).await?;

    BookCopy::update_many()
        .col_expr(
            book_copy::Column::Status,
            Expr::value(CopyStatus::Available.as_str()),
        )
        .col_expr(book_copy::Column::UpdatedAt, Expr::value(now))
        .filter(book_copy::Column::Id.eq(loan.book_copy_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(
        loan_id = updated.id,
        fine = updated.fine_amount.unwrap_or(0.0),
        "loan returned"
    );

    Ok(updated)
}

/// Mark an open loan (and its copy) as lost.
pub async fn mark_lost(
    db: &DatabaseConnection,
    loan_id: i32,
) -> Result<loan::Model, CirculationError> {
    let now = now_ts();

    let loan = Loan::find_by_id(loan_id)
        .one(db)
        .await?
        .ok_or(CirculationError::NotFound)?;

    if loan.returned_date.is_some() {
        return Err(CirculationError::InvalidState(
            "Loan is already returned".to_string(),
        ));
    }
    if loan.status == LoanStatus::Lost.as_str() {
        return Err(CirculationError::InvalidState(
            "Loan is already marked lost".to_string(),
        ));
    }

    let txn = db.begin().await?;

    let mut active: loan::ActiveModel = loan.clone().into();
    active.status = Set(LoanStatus::Lost.as_str().to_owned());
    active.updated_at = Set(now.clone());
    let updated = active.update(&txn).await?;

    BookCopy::update_many()
        .col_expr(
            book_copy::Column::Status,
            Expr::value(CopyStatus::Lost.as_str()),
        )
        .col_expr(book_copy::Column::UpdatedAt, Expr::value(now))
        .filter(book_copy::Column::Id.eq(loan.book_copy_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;
    Ok(updated)
}

/// Record an unpaid fine as collected.
pub async fn pay_fine(
    db: &DatabaseConnection,
    loan_id: i32,
) -> Result<loan::Model, CirculationError> {
    let loan = Loan::find_by_id(loan_id)
        .one(db)
        .await?
        .ok_or(CirculationError::NotFound)?;

    match loan.fine_amount {
        Some(amount) if amount > 0.0 && !loan.fine_paid => {
            let mut active: loan::ActiveModel = loan.into();
            active.fine_paid = Set(true);
            active.updated_at = Set(now_ts());
            Ok(active.update(db).await?)
        }
        _ => Err(CirculationError::InvalidState(
            "Loan has no outstanding fine".to_string(),
        )),
    }
}

/// Write off an unpaid fine entirely.
pub async fn waive_fine(
    db: &DatabaseConnection,
    loan_id: i32,
) -> Result<loan::Model, CirculationError> {
    let loan = Loan::find_by_id(loan_id)
        .one(db)
        .await?
        .ok_or(CirculationError::NotFound)?;

    match loan.fine_amount {
        Some(amount) if amount > 0.0 && !loan.fine_paid => {
            let mut active: loan::ActiveModel = loan.into();
            active.fine_amount = Set(Some(0.0));
            active.fine_paid = Set(true);
            active.updated_at = Set(now_ts());
            Ok(active.update(db).await?)
        }
        _ => Err(CirculationError::InvalidState(
            "Loan has no outstanding fine".to_string(),
        )),
    }
}

/// Filter parameters for listing loans
#[derive(Debug, Default, Clone)]
pub struct LoanFilter {
    /// 'active', 'returned', 'overdue' or 'lost'. Overdue and active are
    /// derived from returned_date/due_date; lost loans belong to neither.
    pub status: Option<String>,
    pub user_id: Option<i32>,
    pub book_copy_id: Option<i32>,
}

/// Enriched loan with related data
#[derive(Debug, Clone, serde::Serialize)]
pub struct LoanWithDetails {
    pub id: i32,
    pub book_copy_id: i32,
    pub user_id: i32,
    pub librarian_id: Option<i32>,
    pub borrowed_date: String,
    pub due_date: String,
    pub returned_date: Option<String>,
    pub status: String,
    pub fine_amount: Option<f64>,
    pub fine_paid: bool,
    pub notes: Option<String>,
    pub borrower_name: String,
    pub book_title: String,
    pub is_overdue: bool,
    pub days_overdue: i64,
    pub current_fine: f64,
}

/// List loans with borrower and book info, newest first.
pub async fn list_loans(
    db: &DatabaseConnection,
    policy: &CirculationPolicy,
    filter: LoanFilter,
) -> Result<Vec<LoanWithDetails>, CirculationError> {
    let on = today();
    let mut condition = Condition::all();

    if let Some(user_id) = filter.user_id {
        condition = condition.add(loan::Column::UserId.eq(user_id));
    }
    if let Some(copy_id) = filter.book_copy_id {
        condition = condition.add(loan::Column::BookCopyId.eq(copy_id));
    }
    if let Some(status) = &filter.status {
        condition = match status.as_str() {
            // Lost loans are open (no returned_date) but not active
            "active" => condition
                .add(loan::Column::ReturnedDate.is_null())
                .add(loan::Column::Status.ne(LoanStatus::Lost.as_str())),
            "returned" => condition.add(loan::Column::ReturnedDate.is_not_null()),
            "overdue" => condition
                .add(loan::Column::ReturnedDate.is_null())
                .add(loan::Column::Status.ne(LoanStatus::Lost.as_str()))
                .add(loan::Column::DueDate.lt(fmt_date(on))),
            "lost" => condition.add(loan::Column::Status.eq(LoanStatus::Lost.as_str())),
            other => {
                return Err(CirculationError::Validation(format!(
                    "Unknown loan status filter '{}'",
                    other
                )));
            }
        };
    }

    let loans_with_users = Loan::find()
        .filter(condition)
        .order_by_desc(loan::Column::BorrowedDate)
        .order_by_desc(loan::Column::Id)
        .find_also_related(User)
        .all(db)
        .await?;

    // Collect copy IDs to fetch book titles
    let copy_ids: Vec<i32> = loans_with_users.iter().map(|(l, _)| l.book_copy_id).collect();

    let mut copy_book_map: HashMap<i32, String> = HashMap::new();
    if !copy_ids.is_empty() {
        let copies_with_books = BookCopy::find()
            .filter(book_copy::Column::Id.is_in(copy_ids))
            .find_also_related(Book)
            .all(db)
            .await?;

        for (copy, book) in copies_with_books {
            if let Some(book) = book {
                copy_book_map.insert(copy.id, book.title);
            }
        }
    }

    let result = loans_with_users
        .into_iter()
        .map(|(loan, borrower)| {
            let borrower_name = borrower
                .as_ref()
                .map(|u| u.name.clone())
                .unwrap_or_else(|| "Unknown".to_string());
            let book_title = copy_book_map
                .get(&loan.book_copy_id)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());

            let overdue = is_overdue(&loan, on);
            LoanWithDetails {
                id: loan.id,
                book_copy_id: loan.book_copy_id,
                user_id: loan.user_id,
                librarian_id: loan.librarian_id,
                is_overdue: overdue,
                days_overdue: days_overdue(&loan, on),
                current_fine: current_fine(&loan, policy, on),
                borrowed_date: loan.borrowed_date,
                due_date: loan.due_date,
                returned_date: loan.returned_date,
                status: loan.status,
                fine_amount: loan.fine_amount,
                fine_paid: loan.fine_paid,
                notes: loan.notes,
                borrower_name,
                book_title,
            }
        })
        .collect();

    Ok(result)
}

/// Count total loans
pub async fn count_loans(db: &DatabaseConnection) -> Result<i64, CirculationError> {
    let count = Loan::find().count(db).await?;
    Ok(count as i64)
}

/// Count active loans: open and not written off as lost
pub async fn count_active_loans(db: &DatabaseConnection) -> Result<i64, CirculationError> {
    let count = Loan::find()
        .filter(loan::Column::ReturnedDate.is_null())
        .filter(loan::Column::Status.ne(LoanStatus::Lost.as_str()))
        .count(db)
        .await?;
    Ok(count as i64)
}

/// Count open loans past their due date
pub async fn count_overdue_loans(db: &DatabaseConnection) -> Result<i64, CirculationError> {
    let count = Loan::find()
        .filter(loan::Column::ReturnedDate.is_null())
        .filter(loan::Column::Status.ne(LoanStatus::Lost.as_str()))
        .filter(loan::Column::DueDate.lt(fmt_date(today())))
        .count(db)
        .await?;
    Ok(count as i64)
}
