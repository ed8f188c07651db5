pub mod adjustments;
pub mod catalog;
pub mod kardex;
pub mod ledger;
pub mod movement_policy;
pub mod movements;
pub mod receiving;
pub mod reconciliation;
pub mod transfers;
