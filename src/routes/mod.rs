/// Router Module Index
///
/// Splits the routing table by audience. Access control is not applied as a router
/// layer: every protected handler takes an `AdminOnly`, `AuthorOnly` or `EitherRole`
/// extractor, so the guard travels with the handler and shared paths such as
/// `/admin/authors` (public POST, admin GET) can live on one route.

/// Anonymous, read-only blog routes plus the health probe and comment submission.
pub mod public;

/// Post editing and the self-service profile, open to admins and authors.
pub mod authenticated;

/// Login, signup, author management and taxonomy management.
pub mod admin;
