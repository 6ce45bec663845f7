pub mod department;
pub mod membership;
pub mod role;
pub mod user;

pub use department::{Department, DepartmentId};
pub use membership::{DepartmentMembership, Principal, PrincipalRecord};
pub use role::Role;
pub use user::User;
