//! Loyalty ledger engine — points accrual from completed reservations,
//! redemption into discounts, reversal on cancellation, expiry, and
//! tier-threshold transitions.

pub mod engine;
pub mod store;

pub use engine::LoyaltyEngine;
pub use store::AccountStore;
