//! Bank accounts.

pub mod model;
pub mod routes;

pub use model::{Account, AccountStatus, AccountType, NewAccount};
pub use routes::account_routes;
