pub mod fixtures;
pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use fixtures::{FixtureError, Fixtures};
pub use manager::{DatabaseError, DatabaseManager};
pub use memory::InMemoryStore;
pub use postgres::PgStore;
pub use store::{
    CredentialStore, DepartmentStore, PrincipalStore, RoleSource, StoreError, StoreResult,
    UserStore,
};
