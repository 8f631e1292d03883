//! Status vocabularies for copies, loans and reservations.
//!
//! The database stores these as plain strings; the enums exist so the
//! lifecycle rules in the services layer are written against a closed set
//! instead of string literals scattered around.

/// Availability status of a physical copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStatus {
    /// On shelf, can be loaned
    Available,
    /// Currently out on an active loan
    Borrowed,
    /// Held for a ready reservation
    Reserved,
    /// Being repaired, not claimable
    Maintenance,
    /// Copy is lost
    Lost,
}

impl CopyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyStatus::Available => "available",
            CopyStatus::Borrowed => "borrowed",
            CopyStatus::Reserved => "reserved",
            CopyStatus::Maintenance => "maintenance",
            CopyStatus::Lost => "lost",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(CopyStatus::Available),
            "borrowed" => Some(CopyStatus::Borrowed),
            "reserved" => Some(CopyStatus::Reserved),
            "maintenance" => Some(CopyStatus::Maintenance),
            "lost" => Some(CopyStatus::Lost),
            _ => None,
        }
    }
}

/// Physical condition grade of a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyCondition {
    Excellent,
    Good,
    Fair,
    Poor,
    Damaged,
}

impl CopyCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyCondition::Excellent => "excellent",
            CopyCondition::Good => "good",
            CopyCondition::Fair => "fair",
            CopyCondition::Poor => "poor",
            CopyCondition::Damaged => "damaged",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "excellent" => Some(CopyCondition::Excellent),
            "good" => Some(CopyCondition::Good),
            "fair" => Some(CopyCondition::Fair),
            "poor" => Some(CopyCondition::Poor),
            "damaged" => Some(CopyCondition::Damaged),
            _ => None,
        }
    }
}

/// Stored loan status. `Overdue` is a cache only: the authoritative overdue
/// test is `returned_date IS NULL AND due_date < today`, evaluated on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanStatus {
    Active,
    Returned,
    Overdue,
    Lost,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Returned => "returned",
            LoanStatus::Overdue => "overdue",
            LoanStatus::Lost => "lost",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(LoanStatus::Active),
            "returned" => Some(LoanStatus::Returned),
            "overdue" => Some(LoanStatus::Overdue),
            "lost" => Some(LoanStatus::Lost),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    /// Waiting in the queue, no copy assigned
    Pending,
    /// A copy is held for pickup
    Ready,
    /// Converted into a loan
    Fulfilled,
    /// Lapsed past its expiry date
    Expired,
    /// Withdrawn by the user or staff
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Ready => "ready",
            ReservationStatus::Fulfilled => "fulfilled",
            ReservationStatus::Expired => "expired",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReservationStatus::Pending),
            "ready" => Some(ReservationStatus::Ready),
            "fulfilled" => Some(ReservationStatus::Fulfilled),
            "expired" => Some(ReservationStatus::Expired),
            "cancelled" => Some(ReservationStatus::Cancelled),
            _ => None,
        }
    }

    /// Pending and ready reservations still hold a place in the queue.
    pub fn is_active(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_status_round_trips() {
        for s in ["available", "borrowed", "reserved", "maintenance", "lost"] {
            assert_eq!(CopyStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(CopyStatus::parse("loaned").is_none());
    }

    #[test]
    fn active_reservation_statuses() {
        assert!(ReservationStatus::Pending.is_active());
        assert!(ReservationStatus::Ready.is_active());
        assert!(!ReservationStatus::Fulfilled.is_active());
        assert!(!ReservationStatus::Expired.is_active());
        assert!(!ReservationStatus::Cancelled.is_active());
    }
}
