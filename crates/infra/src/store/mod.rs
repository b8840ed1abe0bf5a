//! Record storage boundary.
//!
//! The traits describe what the blood bank needs from storage; `in_memory`
//! backs tests and dry runs, `sqlite` is the persistent implementation.

pub mod in_memory;
pub mod sqlite;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use r#trait::{
    BloodBankStore, DonorStore, InventoryStore, OutreachStore, RequestStore, StoreError,
};
