//! Platform implementations
//!
//! Only the in-memory platform ships here. It backs the test suite and the
//! CLI's offline rehearsal mode; production adapters implement the traits in
//! [`crate::platform`] in their own crates.

mod inventory;
mod memory;

pub use inventory::{
    Credential, HostInventory, HostedService, HostedTask, Inventory, ManagedAccount,
    SecureStoreTarget, Simulation, WorkflowBinding,
};
pub use memory::{MemoryPlatform, Mutation};
