//! Business logic services for the Retail POS Back Office

pub mod adjustment;
pub mod allocation;
pub mod batch;
pub mod movement;
pub mod product;
pub mod receipt;
pub mod valuation;

pub use adjustment::AdjustmentService;
pub use allocation::AllocationService;
pub use batch::BatchService;
pub use movement::MovementService;
pub use receipt::ReceiptService;
pub use valuation::ValuationService;
