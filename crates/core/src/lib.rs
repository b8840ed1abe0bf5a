//! `bloodbank-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no storage, no IO): the error
//! model, typed identifiers and the blood type enumeration shared by the
//! registry and the inventory ledger.

pub mod blood_type;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use blood_type::BloodType;
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{DonationRequestId, DonorId, NotificationId, RequestId};
pub use value_object::ValueObject;
