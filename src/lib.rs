//! staffdesk — authentication and authorization core of the staff
//! management backend.
//!
//! Credentials, session tokens, single-use security tokens, and
//! role-based access control; the CRUD surfaces around them live
//! elsewhere and consume the [`accounts::Principal`] this crate attaches
//! to authenticated requests.

pub mod accounts;
pub mod auth;
pub mod configuration;
pub mod error;
pub mod mailer;
pub mod middleware;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod validators;
