pub mod admin;
pub mod auth;
pub mod response;

pub use admin::{admin_auth_middleware, ADMIN_TOKEN_HEADER};
pub use auth::{extract_bearer_token, jwt_auth_middleware, AuthSession};
pub use response::{ApiResponse, ApiResult};
