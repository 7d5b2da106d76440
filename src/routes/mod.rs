/// Router Module Index
///
/// Routes are split by access level; `create_router` applies the auth layer to the
/// authenticated module as a whole.

/// Routes accessible without a token.
pub mod public;

/// Routes protected by the `AuthUser` middleware.
pub mod authenticated;
