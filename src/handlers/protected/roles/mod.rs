// handlers/protected/roles/mod.rs - Read-only views of the caller's access

mod me;

pub use me::{department, me};
