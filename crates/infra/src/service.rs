//! `BloodBank`: the operations an operator runs against one store.
//!
//! Every method loads what it needs, lets the pure domain crates decide, and
//! persists the outcome. Clock reads happen here so the domain stays IO free.

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use tracing::{debug, info, instrument, warn};

use bloodbank_core::{BloodType, DonationRequestId, DonorId, Entity, NotificationId, RequestId};
use bloodbank_inventory::{AdjustStock, StockAdjusted, StockLevel, stock_report};
use bloodbank_registry::{
    BloodRequest, BloodTypeCount, CreateRequest, DonationRequest, DonationStatus, Donor,
    DonorUpdate, Notification, RegisterDonor, RequestUpdate, count_by_blood_type,
    sort_for_listing,
};

use crate::store::{BloodBankStore, StoreError};

/// Current time at the precision the stores persist (microseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Service facade over a [`BloodBankStore`].
#[derive(Debug, Clone)]
pub struct BloodBank<S> {
    store: S,
}

impl<S: BloodBankStore> BloodBank<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Seed one inventory unit per blood type. Existing stock is untouched,
    /// so running it twice is harmless.
    #[instrument(skip(self), err)]
    pub async fn setup(&self) -> Result<Vec<StockLevel>, StoreError> {
        self.store.seed_inventory(now()).await?;
        info!("inventory seeded");
        self.stock_report().await
    }

    // Donors

    #[instrument(skip(self, cmd), fields(donor_id = %cmd.donor_id), err)]
    pub async fn register_donor(&self, cmd: &RegisterDonor) -> Result<Donor, StoreError> {
        let donor = Donor::register(cmd)?;
        self.store.insert_donor(&donor).await?;
        info!(blood_type = %donor.blood_type(), "donor registered");
        Ok(donor)
    }

    pub async fn donor(&self, id: &DonorId) -> Result<Donor, StoreError> {
        self.store
            .get_donor(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("donor {id}")))
    }

    /// Donors ordered by name, optionally only those of one blood type.
    pub async fn list_donors(
        &self,
        blood_type: Option<BloodType>,
    ) -> Result<Vec<Donor>, StoreError> {
        let donors = self.store.list_donors(blood_type).await?;
        debug!(count = donors.len(), "donors listed");
        Ok(donors)
    }

    #[instrument(skip(self, update), fields(donor_id = %id), err)]
    pub async fn update_donor(
        &self,
        id: &DonorId,
        update: &DonorUpdate,
    ) -> Result<Donor, StoreError> {
        let current = self.donor(id).await?;
        let next = current.updated(update, now().date_naive())?;
        self.store.update_donor(&next).await?;
        info!("donor updated");
        Ok(next)
    }

    /// Set the donor's last donation date.
    ///
    /// Stock is not incremented; that is a separate `adjust_stock` call.
    #[instrument(skip(self), fields(donor_id = %id), err)]
    pub async fn record_donation(
        &self,
        id: &DonorId,
        date: NaiveDate,
    ) -> Result<Donor, StoreError> {
        let current = self.donor(id).await?;
        let next = current.record_donation(date, now().date_naive())?;
        self.store.update_donor(&next).await?;
        info!(%date, "donation recorded");
        Ok(next)
    }

    #[instrument(skip(self), fields(donor_id = %id), err)]
    pub async fn delete_donor(&self, id: &DonorId) -> Result<(), StoreError> {
        if !self.store.delete_donor(id).await? {
            return Err(StoreError::NotFound(format!("donor {id}")));
        }
        info!("donor deleted");
        Ok(())
    }

    pub async fn donor_counts(&self) -> Result<Vec<BloodTypeCount>, StoreError> {
        let donors = self.store.list_donors(None).await?;
        Ok(count_by_blood_type(&donors))
    }

    // Inventory

    /// Apply `delta` units to the stock of `blood_type`.
    ///
    /// A decrement larger than the stock on hand fails with
    /// [`StoreError::InsufficientStock`] and changes nothing.
    #[instrument(skip(self), err)]
    pub async fn adjust_stock(
        &self,
        blood_type: BloodType,
        delta: i64,
    ) -> Result<StockAdjusted, StoreError> {
        let cmd = AdjustStock {
            blood_type,
            delta,
            occurred_at: now(),
        };

        match self.store.adjust_stock(&cmd).await {
            Ok(adjusted) => {
                info!(quantity = adjusted.quantity_after, "stock adjusted");
                Ok(adjusted)
            }
            Err(err @ StoreError::InsufficientStock { available, .. }) => {
                warn!(available, "stock adjustment rejected");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// One line per blood type in canonical order.
    pub async fn stock_report(&self) -> Result<Vec<StockLevel>, StoreError> {
        let units = self.store.list_units().await?;
        Ok(stock_report(&units))
    }

    // Blood requests

    #[instrument(skip(self, cmd), fields(request_id = %cmd.request_id), err)]
    pub async fn create_request(&self, cmd: &CreateRequest) -> Result<BloodRequest, StoreError> {
        let request = BloodRequest::create(cmd)?;
        self.store.insert_request(&request).await?;
        info!(blood_type = %request.blood_type, "blood request created");
        Ok(request)
    }

    pub async fn request(&self, id: RequestId) -> Result<BloodRequest, StoreError> {
        self.store
            .get_request(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("blood request {id}")))
    }

    /// Requests by date needed (furthest first), undated last.
    pub async fn list_requests(&self) -> Result<Vec<BloodRequest>, StoreError> {
        let mut requests = self.store.list_requests().await?;
        sort_for_listing(&mut requests);
        Ok(requests)
    }

    #[instrument(skip(self, update), fields(request_id = %id), err)]
    pub async fn update_request(
        &self,
        id: RequestId,
        update: &RequestUpdate,
    ) -> Result<BloodRequest, StoreError> {
        let next = self.request(id).await?.updated(update)?;
        self.store.update_request(&next).await?;
        info!("blood request updated");
        Ok(next)
    }

    #[instrument(skip(self), fields(request_id = %id), err)]
    pub async fn delete_request(&self, id: RequestId) -> Result<(), StoreError> {
        if !self.store.delete_request(id).await? {
            return Err(StoreError::NotFound(format!("blood request {id}")));
        }
        info!("blood request deleted");
        Ok(())
    }

    /// Donors whose blood type matches the request.
    pub async fn matching_donors(&self, id: RequestId) -> Result<Vec<Donor>, StoreError> {
        let request = self.request(id).await?;
        let donors = self.store.list_donors(Some(request.blood_type)).await?;
        Ok(donors
            .into_iter()
            .filter(|d| request.is_matched_by(d))
            .collect())
    }

    // Outreach

    #[instrument(skip(self, message), err)]
    pub async fn send_donation_request(
        &self,
        donor_id: &DonorId,
        request_id: RequestId,
        message: Option<&str>,
    ) -> Result<DonationRequest, StoreError> {
        let donor = self.donor(donor_id).await?;
        let request = self.request(request_id).await?;
        let outreach =
            DonationRequest::send(DonationRequestId::new(), &donor, &request, message, now());
        self.store.insert_donation_request(&outreach).await?;
        info!(donation_request_id = %outreach.id, "donation request sent");
        Ok(outreach)
    }

    /// Pending donation requests addressed to the donor, newest first.
    pub async fn pending_for_donor(
        &self,
        donor_id: &DonorId,
    ) -> Result<Vec<DonationRequest>, StoreError> {
        self.donor(donor_id).await?;
        self.store
            .list_donation_requests(donor_id, Some(DonationStatus::Pending))
            .await
    }

    /// Accept a pending donation request and tell the requester.
    ///
    /// The status change and the notification are stored together. If the
    /// request was answered concurrently, this fails with a conflict and
    /// stores nothing.
    #[instrument(skip(self), fields(donation_request_id = %id), err)]
    pub async fn accept_donation_request(
        &self,
        id: DonationRequestId,
    ) -> Result<(DonationRequest, Notification), StoreError> {
        let accepted = self.donation_request(id).await?.accept()?;
        let donor = self.donor(&accepted.donor_id).await?;

        let notification =
            Notification::acceptance(NotificationId::new(), accepted.request_id, &donor, now());
        self.store
            .resolve_donation_request(&accepted, Some(&notification))
            .await?;

        info!(
            donor_id = %donor.id(),
            notification_id = %notification.id,
            "donation request accepted"
        );
        Ok((accepted, notification))
    }

    #[instrument(skip(self), fields(donation_request_id = %id), err)]
    pub async fn reject_donation_request(
        &self,
        id: DonationRequestId,
    ) -> Result<DonationRequest, StoreError> {
        let rejected = self.donation_request(id).await?.reject()?;
        self.store.resolve_donation_request(&rejected, None).await?;
        info!("donation request rejected");
        Ok(rejected)
    }

    /// Send the donor's contact details to the requester.
    #[instrument(skip(self), err)]
    pub async fn notify_requester(
        &self,
        request_id: RequestId,
        donor_id: &DonorId,
    ) -> Result<Notification, StoreError> {
        let request = self.request(request_id).await?;
        let donor = self.donor(donor_id).await?;
        let notification =
            Notification::donor_details(NotificationId::new(), &request, &donor, now());
        self.store.insert_notification(&notification).await?;
        info!(notification_id = %notification.id, "requester notified");
        Ok(notification)
    }

    /// Notifications for a blood request, newest first.
    pub async fn notifications(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<Notification>, StoreError> {
        self.request(request_id).await?;
        self.store.list_notifications(request_id).await
    }

    #[instrument(skip(self), fields(notification_id = %id), err)]
    pub async fn mark_notification_read(&self, id: NotificationId) -> Result<(), StoreError> {
        if !self.store.mark_notification_read(id).await? {
            return Err(StoreError::NotFound(format!("notification {id}")));
        }
        Ok(())
    }

    async fn donation_request(&self, id: DonationRequestId) -> Result<DonationRequest, StoreError> {
        self.store
            .get_donation_request(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("donation request {id}")))
    }
}
