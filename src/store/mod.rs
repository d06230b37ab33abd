//! Persistence layer: libSQL-backed storage for accounts, customers, and users.

pub mod codes;
pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::Database;
