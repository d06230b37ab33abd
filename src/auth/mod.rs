//! Operator authentication: argon2 passwords, HS256 bearer tokens.

pub mod jwt;
pub mod middleware;
pub mod model;
pub mod routes;

pub use jwt::{Claims, JwtManager};
pub use middleware::{AuthUser, require_auth};
pub use routes::auth_routes;
