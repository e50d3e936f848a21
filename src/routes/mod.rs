/// Router Module Index
///
/// Routes are split by how the caller gets in, not by resource. The same path may appear
/// in more than one module with different methods (e.g. `GET /news` is public while
/// `POST /news` is authenticated); the routers are merged in `create_router`.
///
/// Per-operation role rules are not decided here. Every handler asks `policy` for the
/// operation it performs, so a route placed in the wrong module still cannot bypass them.

/// Anonymous access: reads, login/logout and the contact form.
pub mod public;

/// Requires a resolved, active account (`AuthUser`).
pub mod authenticated;

/// Account management, nested under `/admins`. SUPER_ADMIN only.
pub mod admin;
