//! HTTP handlers for the Retail POS Back Office API

pub mod adjustments;
pub mod allocations;
pub mod batches;
pub mod health;
pub mod movements;
pub mod receipts;
pub mod reports;

pub use adjustments::*;
pub use allocations::*;
pub use batches::*;
pub use health::*;
pub use movements::*;
pub use receipts::*;
pub use reports::*;
