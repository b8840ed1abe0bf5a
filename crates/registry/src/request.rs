use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use bloodbank_core::{BloodType, DomainError, DomainResult, Entity, RequestId};

use crate::donor::{Donor, NAME_MAX_LEN, PHONE_MAX_LEN};

pub const LOCATION_MAX_LEN: usize = 200;

/// A patient's need for blood, filed by a requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodRequest {
    pub id: RequestId,
    /// Patient (or requester) name.
    pub name: String,
    pub phone: String,
    pub blood_type: BloodType,
    /// Why the blood is needed; may be empty.
    pub reason: String,
    /// Note from the requester to prospective donors; may be empty.
    pub message: String,
    pub location: Option<String>,
    pub date_needed: Option<NaiveDate>,
    pub requested_at: DateTime<Utc>,
}

/// Command: CreateRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub request_id: RequestId,
    pub name: String,
    pub phone: String,
    pub blood_type: BloodType,
    pub reason: String,
    pub message: String,
    pub location: Option<String>,
    pub date_needed: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Edit of a blood request. `None` keeps the current value.
///
/// A blank `location` clears it; `date_needed: Some(None)` clears the date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub blood_type: Option<BloodType>,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "crate::present")]
    pub date_needed: Option<Option<NaiveDate>>,
}

impl BloodRequest {
    pub fn create(cmd: &CreateRequest) -> DomainResult<Self> {
        Ok(Self {
            id: cmd.request_id,
            name: non_empty("name", &cmd.name, NAME_MAX_LEN)?,
            phone: non_empty("phone", &cmd.phone, PHONE_MAX_LEN)?,
            blood_type: cmd.blood_type,
            reason: cmd.reason.trim().to_string(),
            message: cmd.message.trim().to_string(),
            location: optional_location(cmd.location.as_deref())?,
            date_needed: cmd.date_needed,
            requested_at: cmd.occurred_at,
        })
    }

    pub fn updated(&self, update: &RequestUpdate) -> DomainResult<Self> {
        let mut next = self.clone();
        if let Some(name) = &update.name {
            next.name = non_empty("name", name, NAME_MAX_LEN)?;
        }
        if let Some(phone) = &update.phone {
            next.phone = non_empty("phone", phone, PHONE_MAX_LEN)?;
        }
        if let Some(blood_type) = update.blood_type {
            next.blood_type = blood_type;
        }
        if let Some(reason) = &update.reason {
            next.reason = reason.trim().to_string();
        }
        if let Some(message) = &update.message {
            next.message = message.trim().to_string();
        }
        if update.location.is_some() {
            next.location = optional_location(update.location.as_deref())?;
        }
        if let Some(date_needed) = update.date_needed {
            next.date_needed = date_needed;
        }
        Ok(next)
    }

    /// Whether `donor` can answer this request (same blood type).
    pub fn is_matched_by(&self, donor: &Donor) -> bool {
        donor.blood_type() == self.blood_type
    }
}

impl Entity for BloodRequest {
    type Id = RequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Listing order: most distant `date_needed` first, undated requests last,
/// then newest filing first.
pub fn sort_for_listing(requests: &mut [BloodRequest]) {
    requests.sort_by(|a, b| {
        match (a.date_needed, b.date_needed) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => core::cmp::Ordering::Less,
            (None, Some(_)) => core::cmp::Ordering::Greater,
            (None, None) => core::cmp::Ordering::Equal,
        }
        .then_with(|| b.requested_at.cmp(&a.requested_at))
    });
}

fn non_empty(field: &str, value: &str, max: usize) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    if value.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{field} cannot exceed {max} characters"
        )));
    }
    Ok(value.to_string())
}

fn optional_location(location: Option<&str>) -> DomainResult<Option<String>> {
    match location.map(str::trim).filter(|l| !l.is_empty()) {
        Some(l) if l.chars().count() > LOCATION_MAX_LEN => Err(DomainError::validation(format!(
            "location cannot exceed {LOCATION_MAX_LEN} characters"
        ))),
        other => Ok(other.map(str::to_string)),
    }
}
