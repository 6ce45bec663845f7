// handlers/elevated/mod.rs - Elevated handlers (admin token required)
//
// Security Level: live session token plus an X-Admin-Token issued under it
// Middleware: jwt_auth_middleware, then admin_auth_middleware (injects AdminContext)

pub mod admin;
