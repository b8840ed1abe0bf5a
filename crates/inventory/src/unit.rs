use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloodbank_core::{BloodType, DomainError, DomainResult, Entity};

/// Stock on hand for one blood type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryUnit {
    blood_type: BloodType,
    quantity: i64,
    updated_at: DateTime<Utc>,
}

impl InventoryUnit {
    /// A freshly set-up unit with no stock.
    pub fn empty(blood_type: BloodType, at: DateTime<Utc>) -> Self {
        Self {
            blood_type,
            quantity: 0,
            updated_at: at,
        }
    }

    /// Rebuild a unit from stored values.
    pub fn restore(
        blood_type: BloodType,
        quantity: i64,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity < 0 {
            return Err(DomainError::invariant(format!(
                "stored quantity for {blood_type} is negative ({quantity})"
            )));
        }
        Ok(Self {
            blood_type,
            quantity,
            updated_at,
        })
    }

    pub fn blood_type(&self) -> BloodType {
        self.blood_type
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Decide whether an adjustment is allowed.
    ///
    /// Positive deltas record donations, negative deltas record usage. A zero
    /// delta is accepted and only refreshes `updated_at`.
    pub fn handle_adjust(&self, cmd: &AdjustStock) -> DomainResult<StockAdjusted> {
        if cmd.blood_type != self.blood_type {
            return Err(DomainError::invariant("blood_type mismatch"));
        }

        let after = self
            .quantity
            .checked_add(cmd.delta)
            .ok_or_else(|| DomainError::validation("quantity overflow"))?;

        if after < 0 {
            return Err(DomainError::invariant(format!(
                "stock cannot go negative ({} on hand, {} requested)",
                self.quantity,
                cmd.delta.unsigned_abs()
            )));
        }

        Ok(StockAdjusted {
            blood_type: self.blood_type,
            delta: cmd.delta,
            quantity_before: self.quantity,
            quantity_after: after,
            occurred_at: cmd.occurred_at,
        })
    }

    /// Apply an accepted adjustment.
    pub fn apply(&mut self, adjusted: &StockAdjusted) {
        self.quantity = adjusted.quantity_after;
        self.updated_at = adjusted.occurred_at;
    }
}

impl Entity for InventoryUnit {
    type Id = BloodType;

    fn id(&self) -> &Self::Id {
        &self.blood_type
    }
}

/// Command: AdjustStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub blood_type: BloodType,
    pub delta: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Outcome of an accepted adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub blood_type: BloodType,
    pub delta: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub occurred_at: DateTime<Utc>,
}

/// One line of the stock report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub blood_type: BloodType,
    pub quantity: i64,
}

/// Build the stock report: exactly one line per blood type, in
/// [`BloodType::ALL`] order. Types without a unit report zero.
pub fn stock_report<'a>(units: impl IntoIterator<Item = &'a InventoryUnit>) -> Vec<StockLevel> {
    let mut levels: Vec<StockLevel> = BloodType::ALL
        .into_iter()
        .map(|blood_type| StockLevel {
            blood_type,
            quantity: 0,
        })
        .collect();

    for unit in units {
        levels[unit.blood_type.ordinal()].quantity = unit.quantity;
    }

    levels
}
