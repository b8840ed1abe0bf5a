use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use bloodbank_core::{BloodType, DomainError, DomainResult, DonorId, Entity, ValueObject};

pub const NAME_MAX_LEN: usize = 100;
pub const PHONE_MAX_LEN: usize = 15;
pub const MAX_AGE: u8 = 120;

/// Contact information for a donor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: String,
    pub address: String,
    pub email: Option<String>,
}

impl ValueObject for ContactInfo {}

impl ContactInfo {
    /// Trimmed copy; an empty email collapses to `None`.
    fn normalized(&self) -> DomainResult<Self> {
        let phone = self.phone.trim().to_string();
        if phone.is_empty() {
            return Err(DomainError::validation("phone cannot be empty"));
        }
        if phone.chars().count() > PHONE_MAX_LEN {
            return Err(DomainError::validation(format!(
                "phone cannot exceed {PHONE_MAX_LEN} characters"
            )));
        }

        let address = self.address.trim().to_string();
        if address.is_empty() {
            return Err(DomainError::validation("address cannot be empty"));
        }

        let email = self
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        if let Some(email) = &email {
            if !email.contains('@') {
                return Err(DomainError::validation(format!("invalid email: {email}")));
            }
        }

        Ok(Self {
            phone,
            address,
            email,
        })
    }
}

/// A registered donor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donor {
    id: DonorId,
    name: String,
    age: u8,
    blood_type: BloodType,
    contact: ContactInfo,
    last_donation: Option<NaiveDate>,
    registered_at: DateTime<Utc>,
}

/// Command: RegisterDonor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDonor {
    pub donor_id: DonorId,
    pub name: String,
    pub age: u8,
    pub blood_type: BloodType,
    pub contact: ContactInfo,
    pub last_donation: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Manual correction of a donor record. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorUpdate {
    pub name: Option<String>,
    pub age: Option<u8>,
    pub blood_type: Option<BloodType>,
    pub contact: Option<ContactInfo>,
    /// `Some(None)` clears the date.
    #[serde(default, deserialize_with = "crate::present")]
    pub last_donation: Option<Option<NaiveDate>>,
}

impl DonorUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.age.is_none()
            && self.blood_type.is_none()
            && self.contact.is_none()
            && self.last_donation.is_none()
    }
}

impl Donor {
    /// Validate a registration and build the donor record.
    ///
    /// Identifier uniqueness is a storage concern and is not checked here.
    pub fn register(cmd: &RegisterDonor) -> DomainResult<Self> {
        let today = cmd.occurred_at.date_naive();
        Ok(Self {
            id: cmd.donor_id.clone(),
            name: validate_name(&cmd.name)?,
            age: validate_age(cmd.age)?,
            blood_type: cmd.blood_type,
            contact: cmd.contact.normalized()?,
            last_donation: validate_donation_date(cmd.last_donation, today)?,
            registered_at: cmd.occurred_at,
        })
    }

    /// Rebuild a donor from stored columns.
    pub fn restore(
        id: DonorId,
        name: String,
        age: u8,
        blood_type: BloodType,
        contact: ContactInfo,
        last_donation: Option<NaiveDate>,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            age,
            blood_type,
            contact,
            last_donation,
            registered_at,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn age(&self) -> u8 {
        self.age
    }

    pub fn blood_type(&self) -> BloodType {
        self.blood_type
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn last_donation(&self) -> Option<NaiveDate> {
        self.last_donation
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    /// Apply a manual update, returning the new record.
    pub fn updated(&self, update: &DonorUpdate, today: NaiveDate) -> DomainResult<Self> {
        if update.is_empty() {
            return Err(DomainError::validation("update contains no changes"));
        }

        let mut next = self.clone();
        if let Some(name) = &update.name {
            next.name = validate_name(name)?;
        }
        if let Some(age) = update.age {
            next.age = validate_age(age)?;
        }
        if let Some(blood_type) = update.blood_type {
            next.blood_type = blood_type;
        }
        if let Some(contact) = &update.contact {
            next.contact = contact.normalized()?;
        }
        if let Some(last_donation) = update.last_donation {
            next.last_donation = validate_donation_date(last_donation, today)?;
        }
        Ok(next)
    }

    /// Record a donation on `date`.
    ///
    /// Stock is not touched; the matching inventory increment is a separate step.
    pub fn record_donation(&self, date: NaiveDate, today: NaiveDate) -> DomainResult<Self> {
        let mut next = self.clone();
        next.last_donation = validate_donation_date(Some(date), today)?;
        Ok(next)
    }
}

impl Entity for Donor {
    type Id = DonorId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    if name.chars().count() > NAME_MAX_LEN {
        return Err(DomainError::validation(format!(
            "name cannot exceed {NAME_MAX_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_age(age: u8) -> DomainResult<u8> {
    if age == 0 || age > MAX_AGE {
        return Err(DomainError::validation(format!(
            "age must be between 1 and {MAX_AGE}"
        )));
    }
    Ok(age)
}

fn validate_donation_date(
    date: Option<NaiveDate>,
    today: NaiveDate,
) -> DomainResult<Option<NaiveDate>> {
    match date {
        Some(d) if d > today => Err(DomainError::validation(format!(
            "donation date {d} is in the future"
        ))),
        other => Ok(other),
    }
}

/// Number of registered donors for one blood type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodTypeCount {
    pub blood_type: BloodType,
    pub donors: usize,
}

/// Donor counts per blood type, most common first.
///
/// Ties keep canonical blood type order; types without donors are omitted.
pub fn count_by_blood_type<'a>(donors: impl IntoIterator<Item = &'a Donor>) -> Vec<BloodTypeCount> {
    let mut tally = [0usize; BloodType::ALL.len()];
    for donor in donors {
        tally[donor.blood_type().ordinal()] += 1;
    }

    let mut counts: Vec<BloodTypeCount> = BloodType::ALL
        .into_iter()
        .filter(|t| tally[t.ordinal()] > 0)
        .map(|t| BloodTypeCount {
            blood_type: t,
            donors: tally[t.ordinal()],
        })
        .collect();

    // Stable sort keeps canonical order among equal counts.
    counts.sort_by(|a, b| b.donors.cmp(&a.donors));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_contact() -> ContactInfo {
        ContactInfo {
            phone: "+8801700000000".to_string(),
            address: "12 Lake Road".to_string(),
            email: Some("donor@example.com".to_string()),
        }
    }

    fn register_cmd(id: &str, blood_type: BloodType) -> RegisterDonor {
        RegisterDonor {
            donor_id: DonorId::parse(id).unwrap(),
            name: "Test Donor".to_string(),
            age: 30,
            blood_type,
            contact: test_contact(),
            last_donation: None,
            occurred_at: test_time(),
        }
    }

    fn test_donor(id: &str, blood_type: BloodType) -> Donor {
        Donor::register(&register_cmd(id, blood_type)).unwrap()
    }

    #[test]
    fn register_builds_normalized_record() {
        let mut cmd = register_cmd("D-1", BloodType::OPos);
        cmd.name = "  Rahim Uddin ".to_string();
        cmd.contact.email = Some("   ".to_string());

        let donor = Donor::register(&cmd).unwrap();
        assert_eq!(donor.id().as_str(), "D-1");
        assert_eq!(donor.name(), "Rahim Uddin");
        assert_eq!(donor.blood_type(), BloodType::OPos);
        assert_eq!(donor.contact().email, None);
        assert_eq!(donor.registered_at(), cmd.occurred_at);
    }

    #[test]
    fn register_rejects_invalid_fields() {
        let mut empty_name = register_cmd("D-1", BloodType::APos);
        empty_name.name = "   ".to_string();

        let mut zero_age = register_cmd("D-1", BloodType::APos);
        zero_age.age = 0;

        let mut long_phone = register_cmd("D-1", BloodType::APos);
        long_phone.contact.phone = "1".repeat(PHONE_MAX_LEN + 1);

        let mut bad_email = register_cmd("D-1", BloodType::APos);
        bad_email.contact.email = Some("not-an-email".to_string());

        let mut future_donation = register_cmd("D-1", BloodType::APos);
        future_donation.last_donation =
            Some(future_donation.occurred_at.date_naive() + chrono::Days::new(1));

        for cmd in [empty_name, zero_age, long_phone, bad_email, future_donation] {
            match Donor::register(&cmd) {
                Err(DomainError::Validation(_)) => {}
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn update_changes_only_given_fields() {
        let donor = test_donor("D-2", BloodType::BNeg);
        let today = test_time().date_naive();
        let update = DonorUpdate {
            name: Some("New Name".to_string()),
            blood_type: Some(BloodType::BPos),
            ..DonorUpdate::default()
        };

        let updated = donor.updated(&update, today).unwrap();
        assert_eq!(updated.name(), "New Name");
        assert_eq!(updated.blood_type(), BloodType::BPos);
        assert_eq!(updated.age(), donor.age());
        assert_eq!(updated.contact(), donor.contact());
        assert_eq!(updated.id(), donor.id());
    }

    #[test]
    fn empty_update_is_rejected() {
        let donor = test_donor("D-3", BloodType::ONeg);
        let err = donor
            .updated(&DonorUpdate::default(), test_time().date_naive())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn record_donation_sets_date_but_rejects_future() {
        let donor = test_donor("D-4", BloodType::AbNeg);
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();

        let donated = donor
            .record_donation(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), today)
            .unwrap();
        assert_eq!(donated.last_donation(), NaiveDate::from_ymd_opt(2024, 5, 1));

        assert!(
            donor
                .record_donation(NaiveDate::from_ymd_opt(2024, 5, 11).unwrap(), today)
                .is_err()
        );
    }

    #[test]
    fn update_can_set_or_clear_last_donation() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let donor = test_donor("D-5", BloodType::APos)
            .record_donation(NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(), today)
            .unwrap();

        let moved = DonorUpdate {
            last_donation: Some(NaiveDate::from_ymd_opt(2024, 5, 1)),
            ..DonorUpdate::default()
        };
        let updated = donor.updated(&moved, today).unwrap();
        assert_eq!(updated.last_donation(), NaiveDate::from_ymd_opt(2024, 5, 1));

        let cleared = DonorUpdate {
            last_donation: Some(None),
            ..DonorUpdate::default()
        };
        assert!(!cleared.is_empty());
        assert_eq!(donor.updated(&cleared, today).unwrap().last_donation(), None);

        let kept = DonorUpdate {
            age: Some(41),
            ..DonorUpdate::default()
        };
        assert_eq!(
            donor.updated(&kept, today).unwrap().last_donation(),
            donor.last_donation()
        );
    }

    #[test]
    fn explicit_null_in_json_clears_last_donation() {
        let clear: DonorUpdate = serde_json::from_str(r#"{"last_donation": null}"#).unwrap();
        assert_eq!(clear.last_donation, Some(None));

        let keep: DonorUpdate = serde_json::from_str(r#"{"age": 40}"#).unwrap();
        assert_eq!(keep.last_donation, None);
    }

    #[test]
    fn counts_are_sorted_by_count_then_canonical_order() {
        let donors = vec![
            test_donor("a", BloodType::ONeg),
            test_donor("b", BloodType::OPos),
            test_donor("c", BloodType::OPos),
            test_donor("d", BloodType::APos),
        ];

        let counts = count_by_blood_type(&donors);
        assert_eq!(
            counts,
            vec![
                BloodTypeCount {
                    blood_type: BloodType::OPos,
                    donors: 2,
                },
                BloodTypeCount {
                    blood_type: BloodType::APos,
                    donors: 1,
                },
                BloodTypeCount {
                    blood_type: BloodType::ONeg,
                    donors: 1,
                },
            ]
        );
    }
}
