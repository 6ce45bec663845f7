// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Service description, health, and session acquisition.
//
// Security Level: None (completely public access)
// Middleware: None (no authentication or authorization)

pub mod auth;
mod root;

pub use root::{health, root};
