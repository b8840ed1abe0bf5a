//! Infrastructure layer: SQL schema, record stores and the `BloodBank` service.

pub mod config;
pub mod db;
pub mod service;
pub mod store;


pub use config::DatabaseConfig;
pub use service::BloodBank;
pub use store::{
    BloodBankStore, DonorStore, InMemoryStore, InventoryStore, OutreachStore, RequestStore,
    SqliteStore, StoreError,
};
