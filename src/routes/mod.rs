/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules.
/// Access control is applied explicitly at the module level (via Axum layers
/// and the AuthUser extractor), preventing accidental exposure of protected
/// endpoints.
///
/// The three modules map directly to the defined access roles.

/// Routes accessible to all users (anonymous, read-only).
/// Handlers must enforce the APPROVED-only visibility predicate at the
/// Repository level.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Requires a validated user session.
pub mod authenticated;

/// Routes restricted exclusively to users with the 'admin' role.
/// Implements mandatory capability checks.
pub mod admin;
