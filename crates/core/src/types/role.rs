//! User roles and the permission matrix derived from them.

use serde::{Deserialize, Serialize};

/// Role assigned to every DeskOps account.
///
/// Staff roles (`Admin`, `Coordinator`, `Editor`, `Viewer`) operate the
/// back-office. `Customer` accounts are ticket requesters and only ever see
/// their own tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "deskops.user_role", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Full access, including user and Google directory management.
    Admin,
    /// Everything except user and directory management.
    Coordinator,
    /// Can create and edit content; limited to rows they own for planning tools.
    Editor,
    /// Read-only staff.
    Viewer,
    /// Ticket requester.
    Customer,
}

impl Role {
    /// Every staff role, most privileged first.
    pub const STAFF: [Self; 4] = [Self::Admin, Self::Coordinator, Self::Editor, Self::Viewer];

    /// Whether this role belongs to back-office staff.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        !matches!(self, Self::Customer)
    }

    /// Create and edit tickets, planning rows, events and customers.
    #[must_use]
    pub const fn can_write(self) -> bool {
        matches!(self, Self::Admin | Self::Coordinator | Self::Editor)
    }

    /// Delete tickets, categories and other shared records.
    #[must_use]
    pub const fn can_delete(self) -> bool {
        matches!(self, Self::Admin | Self::Coordinator)
    }

    /// Assign tickets to staff members.
    #[must_use]
    pub const fn can_assign_tickets(self) -> bool {
        matches!(self, Self::Admin | Self::Coordinator)
    }

    /// Create, edit and delete DeskOps accounts; read the audit log.
    #[must_use]
    pub const fn can_manage_users(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Operate WordPress, WooCommerce and Tutor integrations.
    #[must_use]
    pub const fn can_manage_integrations(self) -> bool {
        matches!(self, Self::Admin | Self::Coordinator)
    }

    /// Operate the Google Workspace directory.
    #[must_use]
    pub const fn can_manage_directory(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Whether this role may modify any agenda/result row, not only its own.
    #[must_use]
    pub const fn can_modify_others_rows(self) -> bool {
        matches!(self, Self::Admin | Self::Coordinator)
    }

    /// Wire/database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Coordinator => "COORDINATOR",
            Self::Editor => "EDITOR",
            Self::Viewer => "VIEWER",
            Self::Customer => "CUSTOMER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "COORDINATOR" => Ok(Self::Coordinator),
            "EDITOR" => Ok(Self::Editor),
            "VIEWER" => Ok(Self::Viewer),
            "CUSTOMER" => Ok(Self::Customer),
            _ => Err(format!("Invalid role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_matrix() {
        assert!(Role::Admin.can_manage_users());
        assert!(Role::Admin.can_manage_directory());

        assert!(Role::Coordinator.can_write());
        assert!(Role::Coordinator.can_delete());
        assert!(Role::Coordinator.can_assign_tickets());
        assert!(Role::Coordinator.can_manage_integrations());
        assert!(!Role::Coordinator.can_manage_users());
        assert!(!Role::Coordinator.can_manage_directory());

        assert!(Role::Editor.can_write());
        assert!(!Role::Editor.can_delete());
        assert!(!Role::Editor.can_assign_tickets());
        assert!(!Role::Editor.can_modify_others_rows());
    }

    #[test]
    fn test_viewer_is_read_only() {
        let viewer = Role::Viewer;
        assert!(viewer.is_staff());
        assert!(!viewer.can_write());
        assert!(!viewer.can_delete());
        assert!(!viewer.can_assign_tickets());
        assert!(!viewer.can_manage_integrations());
    }

    #[test]
    fn test_customer_is_not_staff() {
        assert!(!Role::Customer.is_staff());
        assert!(!Role::Customer.can_write());
        assert!(Role::STAFF.iter().all(|r| r.is_staff()));
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("coordinator".parse::<Role>().unwrap(), Role::Coordinator);
        assert_eq!("VIEWER".parse::<Role>().unwrap(), Role::Viewer);
        assert!("owner".parse::<Role>().is_err());
        assert_eq!(Role::Editor.to_string(), "EDITOR");
    }

    #[test]
    fn test_serde_screaming_case() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let role: Role = serde_json::from_str("\"CUSTOMER\"").unwrap();
        assert_eq!(role, Role::Customer);
    }
}
