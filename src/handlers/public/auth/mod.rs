// handlers/public/auth/mod.rs - Public authentication handlers
//
// Session acquisition endpoints that do not require a live session.

mod continue_session;
mod login;

pub use continue_session::continue_session;
pub use login::{login, LoginRequest};
