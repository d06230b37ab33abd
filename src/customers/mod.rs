//! Bank customers.

pub mod model;
pub mod routes;

pub use model::{Customer, CustomerStatus, CustomerUpdate, NewCustomer};
pub use routes::customer_routes;
