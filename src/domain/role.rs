//! Role and capability checks.
//!
//! Handlers resolve the caller's role from the JWT claims and ask a
//! capability question before invoking a service. The services themselves
//! never check permissions.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    SuperAdmin,
    Admin,
    Librarian,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super-admin",
            Role::Admin => "admin",
            Role::Librarian => "librarian",
            Role::Member => "member",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "super-admin" => Some(Role::SuperAdmin),
            "admin" => Some(Role::Admin),
            "librarian" => Some(Role::Librarian),
            "member" => Some(Role::Member),
            _ => None,
        }
    }

    /// Admins and librarians; anyone working behind the desk.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin | Role::Librarian)
    }

    /// Create/edit/delete user accounts and their profiles.
    pub fn can_manage_users(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }

    /// See the user list and individual accounts.
    pub fn can_view_users(&self) -> bool {
        self.is_staff()
    }

    /// Create and edit books, copies and the reference tables.
    pub fn can_manage_catalog(&self) -> bool {
        self.is_staff()
    }

    /// Deleting catalog records is reserved for admins.
    pub fn can_delete_catalog(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }

    /// Issue loans, take returns, work the reservation queue.
    pub fn can_circulate(&self) -> bool {
        self.is_staff()
    }

    /// Record a fine as paid.
    pub fn can_collect_fines(&self) -> bool {
        self.is_staff()
    }

    /// Write a fine off entirely.
    pub fn can_waive_fines(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn librarian_circulates_but_does_not_manage_users() {
        let role = Role::parse("librarian").unwrap();
        assert!(role.can_circulate());
        assert!(role.can_view_users());
        assert!(!role.can_manage_users());
        assert!(!role.can_waive_fines());
    }

    #[test]
    fn member_has_no_desk_capabilities() {
        let role = Role::parse("member").unwrap();
        assert!(!role.is_staff());
        assert!(!role.can_circulate());
        assert!(!role.can_manage_catalog());
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(Role::parse("patron").is_none());
    }
}
