// handlers/protected/mod.rs - Protected handlers (live session required)
//
// Security Level: Bearer session token whose session has not been ended
// Middleware: jwt_auth_middleware (injects AuthSession)

pub mod auth;
pub mod roles;
