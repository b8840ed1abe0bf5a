//! ABO/Rh blood type enumeration.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// One of the eight standard ABO/Rh blood types.
///
/// Serialized (and stored) as its label: `"A+"`, `"AB-"`, ...
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BloodType {
    APos,
    ANeg,
    BPos,
    BNeg,
    AbPos,
    AbNeg,
    OPos,
    ONeg,
}

impl BloodType {
    /// All blood types in canonical report order.
    pub const ALL: [BloodType; 8] = [
        BloodType::APos,
        BloodType::ANeg,
        BloodType::BPos,
        BloodType::BNeg,
        BloodType::AbPos,
        BloodType::AbNeg,
        BloodType::OPos,
        BloodType::ONeg,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BloodType::APos => "A+",
            BloodType::ANeg => "A-",
            BloodType::BPos => "B+",
            BloodType::BNeg => "B-",
            BloodType::AbPos => "AB+",
            BloodType::AbNeg => "AB-",
            BloodType::OPos => "O+",
            BloodType::ONeg => "O-",
        }
    }

    /// Position in [`BloodType::ALL`]; used as a stable sort key.
    pub fn ordinal(self) -> usize {
        self as usize
    }
}

impl ValueObject for BloodType {}

impl core::fmt::Display for BloodType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BloodType {
    type Err = DomainError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        BloodType::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::validation(format!("unknown blood type: {wanted:?}")))
    }
}

impl TryFrom<String> for BloodType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BloodType> for String {
    fn from(value: BloodType) -> Self {
        value.label().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_label_parses_back() {
        for t in BloodType::ALL {
            assert_eq!(t.label().parse::<BloodType>().unwrap(), t);
        }
    }

    #[test]
    fn parsing_ignores_case_and_whitespace() {
        assert_eq!(" ab+ ".parse::<BloodType>().unwrap(), BloodType::AbPos);
        assert_eq!("o-".parse::<BloodType>().unwrap(), BloodType::ONeg);
    }

    #[test]
    fn unknown_labels_are_rejected() {
        for bad in ["", "C+", "A", "AB", "0+"] {
            assert!(matches!(bad.parse::<BloodType>(), Err(DomainError::Validation(_))));
        }
    }

    #[test]
    fn ordinal_follows_report_order() {
        for (i, t) in BloodType::ALL.iter().enumerate() {
            assert_eq!(t.ordinal(), i);
        }
    }

    #[test]
    fn serializes_as_label() {
        assert_eq!(serde_json::to_string(&BloodType::AbNeg).unwrap(), "\"AB-\"");
        let parsed: BloodType = serde_json::from_str("\"b+\"").unwrap();
        assert_eq!(parsed, BloodType::BPos);
    }
}
