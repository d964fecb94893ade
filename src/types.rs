use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a listing
pub type ListingId = Uuid;
/// unique identifier for an order
pub type OrderId = Uuid;
/// unique identifier for a reservation
pub type ReservationId = Uuid;
/// unique identifier for a late fee
pub type FeeId = Uuid;

/// account identifier for renters, hosts and admins
pub type AccountId = String;

/// rental unit granularity for a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitType {
    Hour,
    Day,
    Week,
}

impl UnitType {
    /// length of one billable unit
    pub fn unit_duration(&self) -> Duration {
        match self {
            UnitType::Hour => Duration::hours(1),
            UnitType::Day => Duration::days(1),
            UnitType::Week => Duration::weeks(1),
        }
    }
}

/// how the upfront deposit for a line is derived
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DepositRule {
    /// flat amount per rented unit
    Flat(Money),
    /// percent of the line total
    Percent(Decimal),
    /// no deposit collected
    None,
}

/// listing lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    Active,
    Paused,
    Retired,
}

/// reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// capacity held, awaiting payment/pickup
    Reserved,
    /// handed over to the renter
    Picked,
    /// rental underway
    Active,
    /// returned to the host
    Returned,
    /// released, no longer consumes capacity
    Cancelled,
    /// under dispute after return
    Disputed,
}

impl ReservationStatus {
    /// statuses that consume listing capacity
    pub fn consumes_capacity(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Reserved | ReservationStatus::Picked | ReservationStatus::Active
        )
    }
}

/// order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// created, awaiting payment
    Quote,
    /// payment received
    Confirmed,
    /// items picked up
    InProgress,
    /// returned without dispute
    Completed,
    Cancelled,
    /// damage or disagreement on return
    Disputed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

/// payment status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
    PartiallyRefunded,
}

/// how much of the order is collected at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentOption {
    /// full subtotal upfront
    Full,
    /// deposit only, remainder due later
    Deposit,
}

/// late fee category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeType {
    PaymentOverdue,
    ReturnOverdue,
    DamageFee,
    Custom,
}

/// late fee lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeStatus {
    /// accruing, re-evaluated on every engine run
    Active,
    Paid,
    Waived,
    Disputed,
    Cancelled,
}

impl FeeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FeeStatus::Paid | FeeStatus::Waived | FeeStatus::Cancelled)
    }
}

/// how a late fee amount is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalculationMethod {
    /// base + daily rate as a flat amount per chargeable day
    Fixed,
    /// base + percentage of an order amount per chargeable day
    Percentage,
    /// base compounded per period
    Compound,
}

/// which order amount a percentage fee is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PercentageBase {
    OrderTotal,
    RemainingAmount,
    DepositAmount,
}

/// compounding period for compound fees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompoundFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl CompoundFrequency {
    /// days per compounding period
    pub fn period_days(&self) -> u32 {
        match self {
            CompoundFrequency::Daily => 1,
            CompoundFrequency::Weekly => 7,
            CompoundFrequency::Monthly => 30,
        }
    }
}
