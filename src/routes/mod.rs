/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules,
/// so access control is applied explicitly at the module level (via Axum
/// layers) and protected endpoints cannot be exposed by accident.

/// Routes accessible to all clients: browsing listings and the login flow.
pub mod public;

/// Routes protected by the session guard middleware. Owner-only.
pub mod authenticated;
