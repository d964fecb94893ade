pub mod allocator;
pub mod pricing;

pub use allocator::{BookingAllocator, LineRequest, OrderPlan, OrderRequest};
pub use pricing::{duration_units, price_line, LinePricing, OrderTotals};
