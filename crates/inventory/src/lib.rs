//! Inventory ledger domain module.
//!
//! This crate contains the stock rules for blood inventory (one unit count per
//! blood type), implemented purely as deterministic domain logic (no IO, no
//! storage).

pub mod unit;

pub use unit::{AdjustStock, InventoryUnit, StockAdjusted, StockLevel, stock_report};
