//! Account records and the stores that own them.

mod memory;
mod model;
mod postgres;
mod store;

pub use memory::MemoryAccountStore;
pub use model::{Account, NewAccount, Principal, Role};
pub use postgres::PgAccountStore;
pub use store::AccountStore;
