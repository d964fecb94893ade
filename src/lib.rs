pub mod availability;
pub mod booking;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod fees;
pub mod gateway;
pub mod lifecycle;
pub mod marketplace;
pub mod notify;
pub mod scheduler;
pub mod state;
pub mod types;

// re-export key types
pub use decimal::{Money, Rate};
pub use errors::{MarketError, Result};
pub use events::{Event, EventStore};
pub use availability::{AvailabilityCalculator, AvailabilityResult};
pub use booking::{
    BookingAllocator, LinePricing, LineRequest, OrderPlan, OrderRequest, OrderTotals,
};
pub use config::{LateFeeConfig, MarketConfig};
pub use fees::{AccrualAction, AccrualEngine, AccrualSummary};
pub use gateway::{MockGateway, PaymentConfirmation, PaymentGateway};
pub use marketplace::{DamageCharge, DisputeResolution, Marketplace};
pub use notify::{NotificationSink, NullSink, RecordingSink};
pub use scheduler::AccrualScheduler;
pub use state::{HostWallet, LateFee, Listing, Order, OrderLine, Reservation};
pub use types::{
    CalculationMethod, CompoundFrequency, DepositRule, FeeStatus, FeeType, ListingId,
    ListingStatus, OrderId, OrderStatus, PaymentOption, PaymentStatus, PercentageBase,
    ReservationStatus, UnitType,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
