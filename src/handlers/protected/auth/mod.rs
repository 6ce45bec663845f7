// handlers/protected/auth/mod.rs - Session management for authenticated users

mod escalate;
mod session;
mod switch_department;

pub use escalate::{deescalate, escalate, EscalateRequest};
pub use session::logout;
pub use switch_department::{switch_department, SwitchDepartmentRequest};
