//! Outreach: donation requests sent to donors and notifications sent back to
//! requesters.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloodbank_core::{
    DomainError, DomainResult, DonationRequestId, DonorId, Entity, NotificationId, RequestId,
};

use crate::donor::Donor;
use crate::request::BloodRequest;

/// Donation request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl DonationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Accepted => "accepted",
            DonationStatus::Rejected => "rejected",
        }
    }
}

impl core::fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DonationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DonationStatus::Pending),
            "accepted" => Ok(DonationStatus::Accepted),
            "rejected" => Ok(DonationStatus::Rejected),
            other => Err(DomainError::validation(format!(
                "unknown donation status: {other:?}"
            ))),
        }
    }
}

/// A request asking a donor to give blood for a specific blood request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRequest {
    pub id: DonationRequestId,
    pub donor_id: DonorId,
    pub request_id: RequestId,
    pub message: String,
    pub status: DonationStatus,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl DonationRequest {
    /// New pending request. Without an explicit message the default appeal
    /// text is used.
    pub fn send(
        id: DonationRequestId,
        donor: &Donor,
        request: &BloodRequest,
        message: Option<&str>,
        at: DateTime<Utc>,
    ) -> Self {
        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| appeal_message(donor, request));

        Self {
            id,
            donor_id: donor.id().clone(),
            request_id: request.id,
            message,
            status: DonationStatus::Pending,
            is_read: false,
            created_at: at,
        }
    }

    pub fn accept(&self) -> DomainResult<Self> {
        self.transition(DonationStatus::Accepted)
    }

    pub fn reject(&self) -> DomainResult<Self> {
        self.transition(DonationStatus::Rejected)
    }

    fn transition(&self, to: DonationStatus) -> DomainResult<Self> {
        if self.status != DonationStatus::Pending {
            return Err(DomainError::conflict(format!(
                "donation request is already {}",
                self.status
            )));
        }
        Ok(Self {
            status: to,
            is_read: true,
            ..self.clone()
        })
    }
}

impl Entity for DonationRequest {
    type Id = DonationRequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A message delivered to the requester of a blood request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub request_id: RequestId,
    pub donor_id: DonorId,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Share a potential donor's details with the requester.
    pub fn donor_details(
        id: NotificationId,
        request: &BloodRequest,
        donor: &Donor,
        at: DateTime<Utc>,
    ) -> Self {
        let message = format!(
            "Dear {},\n\n\
             A potential donor has been found for your request.\n\n\
             Donor: {}\n\
             Blood group: {}\n\
             Phone: {}\n\n\
             Please contact the donor to arrange the donation.\n\n\
             Blood Bank Administration",
            request.name,
            donor.name(),
            donor.blood_type(),
            donor.contact().phone,
        );
        Self::new(id, request.id, donor, message, at)
    }

    /// Tell the requester that `donor` accepted a donation request.
    pub fn acceptance(
        id: NotificationId,
        request_id: RequestId,
        donor: &Donor,
        at: DateTime<Utc>,
    ) -> Self {
        let message = format!(
            "Donor {} has accepted your request. Contact them to coordinate the donation.\n\n\
             Phone: {}",
            donor.name(),
            donor.contact().phone,
        );
        Self::new(id, request_id, donor, message, at)
    }

    fn new(
        id: NotificationId,
        request_id: RequestId,
        donor: &Donor,
        message: String,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            request_id,
            donor_id: donor.id().clone(),
            message,
            is_read: false,
            created_at: at,
        }
    }
}

impl Entity for Notification {
    type Id = NotificationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn appeal_message(donor: &Donor, request: &BloodRequest) -> String {
    let location = request.location.as_deref().unwrap_or("not specified");
    let date_needed = request
        .date_needed
        .map(|d| d.to_string())
        .unwrap_or_else(|| "as soon as possible".to_string());
    let note = if request.message.is_empty() {
        String::new()
    } else {
        format!("Note from the requester: {}\n", request.message)
    };

    format!(
        "Dear {},\n\n\
         Your blood type ({}) is urgently needed for patient {}. \
         Please consider donating.\n\n\
         Location: {}\n\
         Date needed: {}\n\
         {}\n\
         Thank you,\n\
         Blood Bank Administration",
        donor.name(),
        donor.blood_type(),
        request.name,
        location,
        date_needed,
        note,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::donor::{ContactInfo, RegisterDonor};
    use crate::request::CreateRequest;
    use bloodbank_core::BloodType;
    use chrono::NaiveDate;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn donor() -> Donor {
        Donor::register(&RegisterDonor {
            donor_id: DonorId::parse("D-9").unwrap(),
            name: "Karim".to_string(),
            age: 41,
            blood_type: BloodType::ONeg,
            contact: ContactInfo {
                phone: "+8801711111111".to_string(),
                address: "7 River St".to_string(),
                email: None,
            },
            last_donation: None,
            occurred_at: test_time(),
        })
        .unwrap()
    }

    fn request() -> BloodRequest {
        BloodRequest::create(&CreateRequest {
            request_id: RequestId::new(),
            name: "Nadia".to_string(),
            phone: "+8801822222222".to_string(),
            blood_type: BloodType::ONeg,
            reason: String::new(),
            message: "Please call before coming".to_string(),
            location: Some("Dhaka Medical College".to_string()),
            date_needed: NaiveDate::from_ymd_opt(2024, 7, 1),
            occurred_at: test_time(),
        })
        .unwrap()
    }

    fn send(donor: &Donor, request: &BloodRequest, message: Option<&str>) -> DonationRequest {
        DonationRequest::send(DonationRequestId::new(), donor, request, message, test_time())
    }

    #[test]
    fn send_without_message_uses_appeal_text() {
        let (donor, request) = (donor(), request());
        let dr = send(&donor, &request, None);

        assert_eq!(dr.status, DonationStatus::Pending);
        assert!(!dr.is_read);
        assert!(dr.message.contains("Karim"));
        assert!(dr.message.contains("O-"));
        assert!(dr.message.contains("Nadia"));
        assert!(dr.message.contains("Dhaka Medical College"));
        assert!(dr.message.contains("2024-07-01"));
        assert!(dr.message.contains("Note from the requester: Please call before coming"));
    }

    #[test]
    fn appeal_omits_an_empty_requester_note() {
        let donor = donor();
        let mut request = request();
        request.message = String::new();

        let dr = send(&donor, &request, None);
        assert!(!dr.message.contains("Note from the requester"));
        assert!(dr.message.contains("Date needed: 2024-07-01\n\nThank you"));
    }

    #[test]
    fn send_with_blank_message_falls_back_to_appeal() {
        let (donor, request) = (donor(), request());
        let custom = send(&donor, &request, Some("Come today"));
        assert_eq!(custom.message, "Come today");

        let blank = send(&donor, &request, Some("  "));
        assert!(blank.message.starts_with("Dear Karim"));
    }

    #[test]
    fn only_pending_requests_can_transition() {
        let (donor, request) = (donor(), request());
        let dr = send(&donor, &request, None);

        let accepted = dr.accept().unwrap();
        assert_eq!(accepted.status, DonationStatus::Accepted);
        assert!(accepted.is_read);

        assert!(matches!(accepted.reject(), Err(DomainError::Conflict(_))));
        assert!(matches!(dr.reject().unwrap().accept(), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            DonationStatus::Pending,
            DonationStatus::Accepted,
            DonationStatus::Rejected,
        ] {
            assert_eq!(s.as_str().parse::<DonationStatus>().unwrap(), s);
        }
        assert!("done".parse::<DonationStatus>().is_err());
    }

    #[test]
    fn notifications_carry_donor_contact() {
        let (donor, request) = (donor(), request());
        let details =
            Notification::donor_details(NotificationId::new(), &request, &donor, test_time());
        assert!(details.message.starts_with("Dear Nadia"));
        assert!(details.message.contains("+8801711111111"));
        assert_eq!(details.request_id, request.id);

        let accepted =
            Notification::acceptance(NotificationId::new(), request.id, &donor, test_time());
        assert!(accepted.message.contains("Karim has accepted"));
        assert!(!accepted.is_read);
    }
}
