use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use bloodbank_core::{
    BloodType, DomainError, DonationRequestId, DonorId, NotificationId, RequestId,
};
use bloodbank_inventory::{AdjustStock, InventoryUnit, StockAdjusted};
use bloodbank_registry::{BloodRequest, DonationRequest, DonationStatus, Donor, Notification};

/// Storage operation error.
///
/// ## Error Categories
///
/// - **Duplicate**: a uniqueness constraint rejected the write
/// - **InsufficientStock**: a usage would make stock negative
/// - **NotFound**: the referenced record does not exist
/// - **Domain**: the domain layer rejected the input
/// - **Database**: any other engine failure (connection, corrupt row, ...)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("insufficient {blood_type} stock: {available} on hand, {requested} requested")]
    InsufficientStock {
        blood_type: BloodType,
        available: i64,
        requested: i64,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("database error: {0}")]
    Database(String),
}

/// Donor registry storage.
#[async_trait]
pub trait DonorStore: Send + Sync {
    /// Insert a new donor. Fails with `Duplicate` if the id is taken.
    async fn insert_donor(&self, donor: &Donor) -> Result<(), StoreError>;

    async fn get_donor(&self, id: &DonorId) -> Result<Option<Donor>, StoreError>;

    /// Donors ordered by name (then id), optionally restricted to one blood type.
    async fn list_donors(&self, blood_type: Option<BloodType>) -> Result<Vec<Donor>, StoreError>;

    /// Overwrite an existing donor. Fails with `NotFound` if it does not exist.
    async fn update_donor(&self, donor: &Donor) -> Result<(), StoreError>;

    /// Delete a donor and its outreach records. Returns whether it existed.
    async fn delete_donor(&self, id: &DonorId) -> Result<bool, StoreError>;
}

/// Inventory ledger storage.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Ensure one unit exists per blood type; existing quantities are kept.
    async fn seed_inventory(&self, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn get_unit(&self, blood_type: BloodType) -> Result<Option<InventoryUnit>, StoreError>;

    async fn list_units(&self) -> Result<Vec<InventoryUnit>, StoreError>;

    /// Apply a stock delta atomically.
    ///
    /// Fails with `InsufficientStock` (and leaves stock untouched) if the
    /// result would be negative, with `Domain(Validation)` if it would overflow,
    /// and with `NotFound` if the unit was never set up.
    async fn adjust_stock(&self, cmd: &AdjustStock) -> Result<StockAdjusted, StoreError>;
}

/// Blood request storage.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert_request(&self, request: &BloodRequest) -> Result<(), StoreError>;

    async fn get_request(&self, id: RequestId) -> Result<Option<BloodRequest>, StoreError>;

    async fn list_requests(&self) -> Result<Vec<BloodRequest>, StoreError>;

    async fn update_request(&self, request: &BloodRequest) -> Result<(), StoreError>;

    /// Delete a request and its outreach records. Returns whether it existed.
    async fn delete_request(&self, id: RequestId) -> Result<bool, StoreError>;
}

/// Donation request and notification storage.
#[async_trait]
pub trait OutreachStore: Send + Sync {
    async fn insert_donation_request(&self, request: &DonationRequest) -> Result<(), StoreError>;

    async fn get_donation_request(
        &self,
        id: DonationRequestId,
    ) -> Result<Option<DonationRequest>, StoreError>;

    /// Persist the answer to a donation request that is still pending, and
    /// store `notification` with it in the same transaction.
    ///
    /// Fails with `Domain(Conflict)` if the stored request was already
    /// answered, and with `NotFound` if it does not exist. On failure nothing
    /// is written.
    async fn resolve_donation_request(
        &self,
        resolved: &DonationRequest,
        notification: Option<&Notification>,
    ) -> Result<(), StoreError>;

    /// Donation requests addressed to `donor`, newest first.
    async fn list_donation_requests(
        &self,
        donor: &DonorId,
        status: Option<DonationStatus>,
    ) -> Result<Vec<DonationRequest>, StoreError>;

    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError>;

    /// Notifications for a blood request, newest first.
    async fn list_notifications(&self, request: RequestId)
    -> Result<Vec<Notification>, StoreError>;

    /// Returns whether the notification existed.
    async fn mark_notification_read(&self, id: NotificationId) -> Result<bool, StoreError>;
}

/// Everything the `BloodBank` service needs from one backing store.
pub trait BloodBankStore: DonorStore + InventoryStore + RequestStore + OutreachStore {}

impl<S> BloodBankStore for S where S: DonorStore + InventoryStore + RequestStore + OutreachStore {}
