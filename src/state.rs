use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{
    AccountId, DepositRule, FeeId, FeeStatus, FeeType, ListingId, ListingStatus, OrderId,
    OrderStatus, PaymentOption, PaymentStatus, ReservationId, ReservationStatus, UnitType,
};

/// a rentable listing, consumed read-only by the booking core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub host_id: AccountId,
    pub title: String,
    pub category: String,
    pub status: ListingStatus,
    pub total_quantity: u32,
    pub unit_type: UnitType,
    pub base_price: Money,
    pub deposit_rule: DepositRule,
}

impl Listing {
    /// whether new reservations may be taken against this listing
    pub fn is_bookable(&self) -> bool {
        self.status == ListingStatus::Active && self.total_quantity >= 1
    }
}

/// a capacity hold on a listing over a half-open time window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub listing_id: ListingId,
    pub order_id: Option<OrderId>,
    pub quantity: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(
        listing_id: ListingId,
        quantity: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            listing_id,
            order_id: None,
            quantity,
            start,
            end,
            status: ReservationStatus::Reserved,
            created_at: now,
            updated_at: now,
        }
    }

    /// transition status, stamping the update time
    pub fn set_status(&mut self, status: ReservationStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}

/// one priced line of an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub listing_id: ListingId,
    pub quantity: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub unit_price: Money,
    /// billable units, partial units rounded up
    pub duration_units: u32,
    pub line_total: Money,
    pub deposit: Money,
    pub reservation_id: Option<ReservationId>,
}

/// append-only order history entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub label: String,
    pub timestamp: DateTime<Utc>,
    pub actor: AccountId,
    pub note: Option<String>,
}

/// a multi-line rental order against a single host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub renter_id: AccountId,
    pub host_id: AccountId,
    pub category: String,
    pub lines: Vec<OrderLine>,
    pub subtotal: Money,
    pub deposit_amount: Money,
    pub platform_commission: Money,
    pub total_amount: Money,
    pub remaining_amount: Money,
    pub payment_option: PaymentOption,
    pub payment_status: PaymentStatus,
    pub payment_ref: Option<String>,
    pub order_status: OrderStatus,
    pub timeline: Vec<TimelineEntry>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// append a timeline entry, never overwriting history
    pub fn record(&mut self, label: &str, actor: &str, note: Option<String>, now: DateTime<Utc>) {
        self.timeline.push(TimelineEntry {
            label: label.to_string(),
            timestamp: now,
            actor: actor.to_string(),
            note,
        });
    }

    /// latest line end date, the due date for overdue scans
    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.lines.iter().map(|l| l.end).max()
    }

    /// amount the host earns once the order settles
    pub fn host_earnings(&self) -> Money {
        self.subtotal - self.platform_commission
    }

    pub fn reservation_ids(&self) -> Vec<ReservationId> {
        self.lines.iter().filter_map(|l| l.reservation_id).collect()
    }
}

/// one recomputation of a fee amount, kept for audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeCalculation {
    pub days_overdue: u32,
    pub amount: Money,
    pub formula: String,
    pub calculated_at: DateTime<Utc>,
}

/// a queued notification for the external sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub recipient_id: AccountId,
    pub event_type: String,
    pub sent_at: DateTime<Utc>,
    pub delivered: bool,
}

/// a late fee levied against an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LateFee {
    pub id: FeeId,
    pub order_id: OrderId,
    pub renter_id: AccountId,
    pub host_id: AccountId,
    pub fee_type: FeeType,
    pub base_amount: Money,
    pub daily_rate: Decimal,
    pub max_amount: Money,
    pub current_amount: Money,
    pub days_overdue: u32,
    pub due_date: DateTime<Utc>,
    pub grace_period_days: u32,
    pub status: FeeStatus,
    pub auto_applied: bool,
    pub reason: Option<String>,
    pub waived_reason: Option<String>,
    pub waived_by: Option<AccountId>,
    pub waived_at: Option<DateTime<Utc>>,
    pub calculations: Vec<FeeCalculation>,
    pub notifications: Vec<NotificationRecord>,
    pub created_at: DateTime<Utc>,
    pub last_calculated: DateTime<Utc>,
}

impl LateFee {
    /// append an audit entry and advance the current amount
    pub fn record_calculation(
        &mut self,
        days_overdue: u32,
        amount: Money,
        formula: String,
        now: DateTime<Utc>,
    ) {
        self.days_overdue = days_overdue;
        self.current_amount = amount;
        self.last_calculated = now;
        self.calculations.push(FeeCalculation {
            days_overdue,
            amount,
            formula,
            calculated_at: now,
        });
    }

    pub fn record_notification(&mut self, record: NotificationRecord) {
        self.notifications.push(record);
    }
}

/// direction of a wallet ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerDirection {
    Credit,
    Debit,
}

/// append-only host earnings ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletEntry {
    pub amount: Money,
    pub direction: LedgerDirection,
    pub order_id: OrderId,
    pub note: String,
    pub timestamp: DateTime<Utc>,
}

/// per-host earnings balance plus its ledger
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostWallet {
    pub balance: Money,
    pub entries: Vec<WalletEntry>,
}

impl HostWallet {
    pub fn credit(&mut self, amount: Money, order_id: OrderId, note: &str, now: DateTime<Utc>) {
        self.balance += amount;
        self.entries.push(WalletEntry {
            amount,
            direction: LedgerDirection::Credit,
            order_id,
            note: note.to_string(),
            timestamp: now,
        });
    }

    pub fn debit(&mut self, amount: Money, order_id: OrderId, note: &str, now: DateTime<Utc>) {
        self.balance -= amount;
        self.entries.push(WalletEntry {
            amount,
            direction: LedgerDirection::Debit,
            order_id,
            note: note.to_string(),
            timestamp: now,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window(day: u32, span: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap();
        (start, start + chrono::Duration::days(span))
    }

    #[test]
    fn test_due_date_is_latest_line_end() {
        let (s1, e1) = window(1, 2);
        let (s2, e2) = window(3, 5);
        let line = |s, e| OrderLine {
            listing_id: Uuid::new_v4(),
            quantity: 1,
            start: s,
            end: e,
            unit_price: Money::from_major(10),
            duration_units: 1,
            line_total: Money::from_major(10),
            deposit: Money::ZERO,
            reservation_id: None,
        };
        let order = Order {
            id: Uuid::new_v4(),
            renter_id: "renter-1".into(),
            host_id: "host-1".into(),
            category: "tools".into(),
            lines: vec![line(s1, e1), line(s2, e2)],
            subtotal: Money::from_major(20),
            deposit_amount: Money::ZERO,
            platform_commission: Money::from_major(2),
            total_amount: Money::from_major(20),
            remaining_amount: Money::ZERO,
            payment_option: PaymentOption::Full,
            payment_status: PaymentStatus::Pending,
            payment_ref: None,
            order_status: OrderStatus::Quote,
            timeline: Vec::new(),
            created_at: s1,
        };
        assert_eq!(order.due_date(), Some(e2));
        assert_eq!(order.host_earnings(), Money::from_major(18));
    }

    #[test]
    fn test_wallet_ledger_balances() {
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let mut wallet = HostWallet::default();

        wallet.credit(Money::from_major(90), order_id, "payment", now);
        wallet.debit(Money::from_major(90), order_id, "cancellation reversal", now);

        assert_eq!(wallet.balance, Money::ZERO);
        assert_eq!(wallet.entries.len(), 2);
        assert_eq!(wallet.entries[0].direction, LedgerDirection::Credit);
        assert_eq!(wallet.entries[1].direction, LedgerDirection::Debit);
    }

    #[test]
    fn test_fee_calculation_trail_is_append_only() {
        let now = Utc::now();
        let mut fee = LateFee {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            renter_id: "renter-1".into(),
            host_id: "host-1".into(),
            fee_type: FeeType::PaymentOverdue,
            base_amount: Money::from_major(50),
            daily_rate: rust_decimal_macros::dec!(25),
            max_amount: Money::from_major(500),
            current_amount: Money::from_major(50),
            days_overdue: 0,
            due_date: now,
            grace_period_days: 1,
            status: FeeStatus::Active,
            auto_applied: true,
            reason: None,
            waived_reason: None,
            waived_by: None,
            waived_at: None,
            calculations: Vec::new(),
            notifications: Vec::new(),
            created_at: now,
            last_calculated: now,
        };

        fee.record_calculation(3, Money::from_major(100), "50 + 25*2".into(), now);
        fee.record_calculation(5, Money::from_major(150), "50 + 25*4".into(), now);

        assert_eq!(fee.calculations.len(), 2);
        assert_eq!(fee.current_amount, Money::from_major(150));
        assert_eq!(fee.days_overdue, 5);
    }
}
