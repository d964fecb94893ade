pub mod accrual;
pub mod policy;

pub use accrual::{days_overdue, AccrualAction, AccrualEngine, AccrualSummary};
pub use policy::resolve_config;
