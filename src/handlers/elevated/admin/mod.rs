// handlers/elevated/admin/mod.rs - Administrative operations

mod roles;
mod session;

pub use roles::reload_roles;
pub use session::session;
