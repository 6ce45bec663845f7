// Access engine: role resolution, right aggregation, sessions and escalation

pub mod aggregator;
pub mod catalog;
pub mod error;
pub mod escalation;
pub mod resolver;
pub mod session;

pub use aggregator::{right_permits, rights_permit, AccessRightAggregator, RightSet};
pub use catalog::{CatalogError, CatalogHandle, RoleCatalog, RoleFile};
pub use error::{AccessError, AccessResult};
pub use escalation::{AdminContext, AdminSession, EscalationManager};
pub use resolver::{CascadedChild, ResolvedRoles, RoleResolver};
pub use session::{
    ContinuedSession, DepartmentSwitch, DepartmentView, IssuedSession, SessionAssembler, SessionChanges,
    SessionPolicy, SessionView,
};
