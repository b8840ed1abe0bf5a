use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bloodbank_core::{
    BloodType, DomainError, DonationRequestId, DonorId, Entity, NotificationId, RequestId,
};
use bloodbank_inventory::{AdjustStock, InventoryUnit, StockAdjusted};
use bloodbank_registry::{BloodRequest, DonationRequest, DonationStatus, Donor, Notification};

use super::r#trait::{DonorStore, InventoryStore, OutreachStore, RequestStore, StoreError};

#[derive(Debug, Default)]
struct State {
    donors: HashMap<DonorId, Donor>,
    inventory: HashMap<BloodType, InventoryUnit>,
    requests: HashMap<RequestId, BloodRequest>,
    donation_requests: HashMap<DonationRequestId, DonationRequest>,
    notifications: HashMap<NotificationId, Notification>,
}

/// In-memory store for tests/dev.
///
/// Mirrors the SQLite store's observable behavior, including cascading deletes
/// and the non-negative stock guard.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Database("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Database("lock poisoned".to_string()))
    }
}

/// Newest first, UUIDv7 ids break timestamp ties.
fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, K)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

/// The same foreign key and uniqueness checks the SQLite schema enforces.
fn check_notification(state: &State, notification: &Notification) -> Result<(), StoreError> {
    if !state.requests.contains_key(&notification.request_id) {
        return Err(StoreError::NotFound(format!(
            "blood request {}",
            notification.request_id
        )));
    }
    if !state.donors.contains_key(&notification.donor_id) {
        return Err(StoreError::NotFound(format!("donor {}", notification.donor_id)));
    }
    if state.notifications.contains_key(&notification.id) {
        return Err(StoreError::Duplicate(format!("notification {}", notification.id)));
    }
    Ok(())
}

#[async_trait]
impl DonorStore for InMemoryStore {
    async fn insert_donor(&self, donor: &Donor) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.donors.contains_key(donor.id()) {
            return Err(StoreError::Duplicate(format!("donor {}", donor.id())));
        }
        state.donors.insert(donor.id().clone(), donor.clone());
        Ok(())
    }

    async fn get_donor(&self, id: &DonorId) -> Result<Option<Donor>, StoreError> {
        Ok(self.read()?.donors.get(id).cloned())
    }

    async fn list_donors(&self, blood_type: Option<BloodType>) -> Result<Vec<Donor>, StoreError> {
        let state = self.read()?;
        let mut donors: Vec<Donor> = state
            .donors
            .values()
            .filter(|d| blood_type.is_none_or(|t| d.blood_type() == t))
            .cloned()
            .collect();
        donors.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id().cmp(b.id())));
        Ok(donors)
    }

    async fn update_donor(&self, donor: &Donor) -> Result<(), StoreError> {
        let mut state = self.write()?;
        match state.donors.get_mut(donor.id()) {
            Some(existing) => {
                *existing = donor.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("donor {}", donor.id()))),
        }
    }

    async fn delete_donor(&self, id: &DonorId) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if state.donors.remove(id).is_none() {
            return Ok(false);
        }
        state.donation_requests.retain(|_, r| &r.donor_id != id);
        state.notifications.retain(|_, n| &n.donor_id != id);
        Ok(true)
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn seed_inventory(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut state = self.write()?;
        for blood_type in BloodType::ALL {
            state
                .inventory
                .entry(blood_type)
                .or_insert_with(|| InventoryUnit::empty(blood_type, at));
        }
        Ok(())
    }

    async fn get_unit(&self, blood_type: BloodType) -> Result<Option<InventoryUnit>, StoreError> {
        Ok(self.read()?.inventory.get(&blood_type).cloned())
    }

    async fn list_units(&self) -> Result<Vec<InventoryUnit>, StoreError> {
        let state = self.read()?;
        let mut units: Vec<InventoryUnit> = state.inventory.values().cloned().collect();
        units.sort_by_key(|u| u.blood_type().ordinal());
        Ok(units)
    }

    async fn adjust_stock(&self, cmd: &AdjustStock) -> Result<StockAdjusted, StoreError> {
        let mut state = self.write()?;
        let unit = state
            .inventory
            .get_mut(&cmd.blood_type)
            .ok_or_else(|| StoreError::NotFound(format!("inventory unit {}", cmd.blood_type)))?;

        if unit.quantity().checked_add(cmd.delta).is_some_and(|q| q < 0) {
            return Err(StoreError::InsufficientStock {
                blood_type: cmd.blood_type,
                available: unit.quantity(),
                requested: cmd.delta.saturating_neg(),
            });
        }

        let adjusted = unit.handle_adjust(cmd)?;
        unit.apply(&adjusted);
        Ok(adjusted)
    }
}

#[async_trait]
impl RequestStore for InMemoryStore {
    async fn insert_request(&self, request: &BloodRequest) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.requests.contains_key(&request.id) {
            return Err(StoreError::Duplicate(format!("blood request {}", request.id)));
        }
        state.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<BloodRequest>, StoreError> {
        Ok(self.read()?.requests.get(&id).cloned())
    }

    async fn list_requests(&self) -> Result<Vec<BloodRequest>, StoreError> {
        let mut requests: Vec<BloodRequest> = self.read()?.requests.values().cloned().collect();
        newest_first(&mut requests, |r| (r.requested_at, *r.id.as_uuid()));
        Ok(requests)
    }

    async fn update_request(&self, request: &BloodRequest) -> Result<(), StoreError> {
        let mut state = self.write()?;
        match state.requests.get_mut(&request.id) {
            Some(existing) => {
                *existing = request.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("blood request {}", request.id))),
        }
    }

    async fn delete_request(&self, id: RequestId) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if state.requests.remove(&id).is_none() {
            return Ok(false);
        }
        state.donation_requests.retain(|_, r| r.request_id != id);
        state.notifications.retain(|_, n| n.request_id != id);
        Ok(true)
    }
}

#[async_trait]
impl OutreachStore for InMemoryStore {
    async fn insert_donation_request(&self, request: &DonationRequest) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.donors.contains_key(&request.donor_id) {
            return Err(StoreError::NotFound(format!("donor {}", request.donor_id)));
        }
        if !state.requests.contains_key(&request.request_id) {
            return Err(StoreError::NotFound(format!(
                "blood request {}",
                request.request_id
            )));
        }
        if state.donation_requests.contains_key(&request.id) {
            return Err(StoreError::Duplicate(format!("donation request {}", request.id)));
        }
        state.donation_requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn get_donation_request(
        &self,
        id: DonationRequestId,
    ) -> Result<Option<DonationRequest>, StoreError> {
        Ok(self.read()?.donation_requests.get(&id).cloned())
    }

    async fn resolve_donation_request(
        &self,
        resolved: &DonationRequest,
        notification: Option<&Notification>,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let current = state
            .donation_requests
            .get(&resolved.id)
            .ok_or_else(|| StoreError::NotFound(format!("donation request {}", resolved.id)))?;
        if current.status != DonationStatus::Pending {
            return Err(DomainError::conflict(format!(
                "donation request is already {}",
                current.status
            ))
            .into());
        }
        if let Some(notification) = notification {
            check_notification(&state, notification)?;
        }

        if let Some(existing) = state.donation_requests.get_mut(&resolved.id) {
            existing.status = resolved.status;
            existing.is_read = resolved.is_read;
        }
        if let Some(notification) = notification {
            state.notifications.insert(notification.id, notification.clone());
        }
        Ok(())
    }

    async fn list_donation_requests(
        &self,
        donor: &DonorId,
        status: Option<DonationStatus>,
    ) -> Result<Vec<DonationRequest>, StoreError> {
        let state = self.read()?;
        let mut found: Vec<DonationRequest> = state
            .donation_requests
            .values()
            .filter(|r| &r.donor_id == donor && status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        newest_first(&mut found, |r| (r.created_at, *r.id.as_uuid()));
        Ok(found)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        let mut state = self.write()?;
        check_notification(&state, notification)?;
        state.notifications.insert(notification.id, notification.clone());
        Ok(())
    }

    async fn list_notifications(
        &self,
        request: RequestId,
    ) -> Result<Vec<Notification>, StoreError> {
        let state = self.read()?;
        let mut found: Vec<Notification> = state
            .notifications
            .values()
            .filter(|n| n.request_id == request)
            .cloned()
            .collect();
        newest_first(&mut found, |n| (n.created_at, *n.id.as_uuid()));
        Ok(found)
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        match state.notifications.get_mut(&id) {
            Some(n) => {
                n.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
