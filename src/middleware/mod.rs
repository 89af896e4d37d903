//! Request-level middleware: logging, authentication, authorization.

mod auth_gate;
mod request_logger;
mod require_role;

pub use auth_gate::AuthenticationGate;
pub use request_logger::RequestLogger;
pub use require_role::RequireRole;
