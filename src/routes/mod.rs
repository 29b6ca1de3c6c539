//! Router Module Index
//!
//! Every route in the application requires the pre-shared API key. The gate is
//! applied once, around the assembled router, rather than per module, so a new
//! module cannot accidentally expose an unauthenticated endpoint.

/// `/api/siswas` CRUD endpoints.
pub mod students;
