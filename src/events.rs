use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{
    AccountId, FeeId, FeeType, ListingId, OrderId, OrderStatus, ReservationId, ReservationStatus,
};

/// all events emitted by the marketplace core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // booking events
    OrderCreated {
        order_id: OrderId,
        renter_id: AccountId,
        host_id: AccountId,
        line_count: usize,
        subtotal: Money,
        total_amount: Money,
        timestamp: DateTime<Utc>,
    },
    ReservationCreated {
        reservation_id: ReservationId,
        order_id: OrderId,
        listing_id: ListingId,
        quantity: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    // payment events
    CheckoutCreated {
        order_id: OrderId,
        session_ref: String,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentConfirmed {
        order_id: OrderId,
        payment_ref: String,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    HostCredited {
        host_id: AccountId,
        order_id: OrderId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    HostDebited {
        host_id: AccountId,
        order_id: OrderId,
        amount: Money,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // lifecycle events
    OrderStatusChanged {
        order_id: OrderId,
        old_status: OrderStatus,
        new_status: OrderStatus,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    ReservationStatusChanged {
        reservation_id: ReservationId,
        old_status: ReservationStatus,
        new_status: ReservationStatus,
        timestamp: DateTime<Utc>,
    },
    OrderCancelled {
        order_id: OrderId,
        reason: String,
        refunded: bool,
        timestamp: DateTime<Utc>,
    },

    // late fee events
    LateFeeCreated {
        fee_id: FeeId,
        order_id: OrderId,
        fee_type: FeeType,
        amount: Money,
        days_overdue: u32,
        timestamp: DateTime<Utc>,
    },
    LateFeeRecalculated {
        fee_id: FeeId,
        order_id: OrderId,
        old_amount: Money,
        new_amount: Money,
        days_overdue: u32,
        timestamp: DateTime<Utc>,
    },
    LateFeeWaived {
        fee_id: FeeId,
        waived_by: AccountId,
        reason: String,
        frozen_amount: Money,
        timestamp: DateTime<Utc>,
    },
    LateFeePaid {
        fee_id: FeeId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    // notification sink outcomes
    NotificationQueued {
        recipient_id: AccountId,
        event_type: String,
        timestamp: DateTime<Utc>,
    },
    NotificationFailed {
        recipient_id: AccountId,
        event_type: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    // scheduler events
    AccrualRunCompleted {
        processed: usize,
        created: usize,
        updated: usize,
        errors: usize,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
