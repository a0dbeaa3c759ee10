//! Well-known role name constants.
//!
//! These match the `role` values stored on user profiles by the dashboard.

pub const ROLE_SUPERADMIN: &str = "superadmin";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_SALES_REP: &str = "salesrep";
pub const ROLE_FINANCE_REP: &str = "financerep";
pub const ROLE_USER: &str = "user";

/// Returns `true` for roles allowed to run administrative workflows
/// such as archiving.
pub fn is_admin_role(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_SUPERADMIN
}
