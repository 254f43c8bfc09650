pub mod data;
pub mod insights;
pub mod outcome;
pub mod payout;
pub mod settlement;
pub mod sync;
pub mod totals;
