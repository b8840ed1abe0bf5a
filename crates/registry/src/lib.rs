//! Registry domain module: donors, blood requests and outreach.
//!
//! This crate contains the record-keeping rules for the donor registry and the
//! request/outreach workflow around it, implemented purely as deterministic
//! domain logic (no IO, no storage).

pub mod donor;
pub mod outreach;
pub mod request;

pub use donor::{
    BloodTypeCount, ContactInfo, Donor, DonorUpdate, RegisterDonor, count_by_blood_type,
};
pub use outreach::{DonationRequest, DonationStatus, Notification};
pub use request::{BloodRequest, CreateRequest, RequestUpdate, sort_for_listing};

/// Deserialize a field that is present (even as `null`) into `Some`, so that
/// `Option<Option<T>>` can tell "clear" from "keep".
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}
