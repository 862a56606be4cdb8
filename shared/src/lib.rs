//! Shared domain logic for the Retail POS Back Office
//!
//! This crate contains the pure, database-free parts of the inventory
//! ledger: FEFO allocation planning, cost variance classification, and
//! validation helpers shared between the backend and other components.

pub mod allocation;
pub mod validation;
pub mod variance;

pub use allocation::*;
pub use validation::*;
pub use variance::*;
