//! Authentication primitives: password hashing, session token
//! issuance/validation, single-use security tokens, and the token
//! transport strategy.

mod claims;
pub mod password;
pub mod session;
pub mod single_use;
pub mod transport;

pub use claims::Claims;
pub use password::{hash_password, verify_password};
pub use session::{issue_session_token, validate_session_token};
pub use transport::{SessionTransport, SESSION_COOKIE};
