//! Tenant schemas: creation, base-table initialization and the `users` table

mod provisioner;
mod users;

pub use provisioner::{ProvisionResult, SchemaProvisioner};
pub use users::{NewUser, User, UserStore};
