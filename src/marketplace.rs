use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde_json::json;

use crate::availability::AvailabilityResult;
use crate::booking::{BookingAllocator, OrderRequest};
use crate::config::{LateFeeConfig, MarketConfig};
use crate::decimal::Money;
use crate::errors::{MarketError, Result};
use crate::events::{Event, EventStore};
use crate::fees::{AccrualAction, AccrualEngine, AccrualSummary};
use crate::gateway::PaymentGateway;
use crate::lifecycle::{ensure_order_transition, ensure_reservation_transition, reservation_path};
use crate::notify::{NotificationSink, NullSink};
use crate::state::{HostWallet, LateFee, Listing, NotificationRecord, Order, Reservation};
use crate::types::{
    AccountId, FeeId, FeeType, ListingId, OrderId, OrderStatus, PaymentStatus, ReservationId,
    ReservationStatus,
};

/// a damage claim attached on return
#[derive(Debug, Clone)]
pub struct DamageCharge {
    pub amount: Money,
    pub description: String,
}

/// how a disputed order is closed out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisputeResolution {
    Complete,
    Cancel,
}

/// everything the marketplace owns, guarded by one lock
///
/// Holding the lock across an entire operation is what makes
/// check-then-reserve, wallet-with-status, and find-or-create-fee each a
/// single serializable unit.
struct Core {
    listings: HashMap<ListingId, Listing>,
    orders: HashMap<OrderId, Order>,
    reservations: HashMap<ReservationId, Reservation>,
    fees: HashMap<FeeId, LateFee>,
    fee_configs: Vec<LateFeeConfig>,
    wallets: HashMap<AccountId, HostWallet>,
    events: EventStore,
}

/// the rental marketplace core: booking allocation, order lifecycle,
/// late-fee accrual and the host earnings ledger
pub struct Marketplace {
    config: MarketConfig,
    allocator: BookingAllocator,
    inner: Mutex<Core>,
    sink: Box<dyn NotificationSink>,
}

impl Marketplace {
    pub fn new(config: MarketConfig) -> Self {
        Self::with_sink(config, Box::new(NullSink))
    }

    pub fn with_sink(config: MarketConfig, sink: Box<dyn NotificationSink>) -> Self {
        let allocator = BookingAllocator::new(&config);
        Self {
            config,
            allocator,
            inner: Mutex::new(Core {
                listings: HashMap::new(),
                orders: HashMap::new(),
                reservations: HashMap::new(),
                fees: HashMap::new(),
                fee_configs: Vec::new(),
                wallets: HashMap::new(),
                events: EventStore::new(),
            }),
            sink,
        }
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    fn core(&self) -> MutexGuard<'_, Core> {
        // a poisoned lock still holds consistent state: every operation
        // validates before it mutates
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // --- administration ---------------------------------------------------

    pub fn upsert_listing(&self, listing: Listing) {
        self.core().listings.insert(listing.id, listing);
    }

    pub fn add_fee_config(&self, config: LateFeeConfig) -> Result<()> {
        config.validate()?;
        let mut core = self.core();
        if config.is_default
            && core
                .fee_configs
                .iter()
                .any(|c| c.fee_type == config.fee_type && c.is_default)
        {
            return Err(MarketError::InvalidConfiguration {
                message: format!("a default policy for {:?} already exists", config.fee_type),
            });
        }
        core.fee_configs.push(config);
        Ok(())
    }

    // --- booking ----------------------------------------------------------

    /// remaining capacity for a listing over a window
    pub fn check_availability(
        &self,
        listing_id: ListingId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        quantity: u32,
        time_provider: &SafeTimeProvider,
    ) -> Result<AvailabilityResult> {
        let core = self.core();
        let listing = core.listings.get(&listing_id).ok_or(MarketError::NotFound {
            entity: "listing",
            id: listing_id,
        })?;
        self.allocator.calculator().check(
            listing,
            core.reservations.values(),
            start,
            end,
            quantity,
            None,
            time_provider.now(),
        )
    }

    /// validate, price and atomically persist an order plus its reservations
    ///
    /// Either the whole order lands or nothing does: planning is pure, and
    /// the commit happens under the same lock acquisition as the
    /// availability checks.
    pub fn create_order(
        &self,
        request: &OrderRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<Order> {
        let now = time_provider.now();
        let mut core = self.core();

        let plan = self
            .allocator
            .plan(&core.listings, &core.reservations, request, now)?;

        core.events.emit(Event::OrderCreated {
            order_id: plan.order.id,
            renter_id: plan.order.renter_id.clone(),
            host_id: plan.order.host_id.clone(),
            line_count: plan.order.lines.len(),
            subtotal: plan.order.subtotal,
            total_amount: plan.order.total_amount,
            timestamp: now,
        });
        for reservation in &plan.reservations {
            core.events.emit(Event::ReservationCreated {
                reservation_id: reservation.id,
                order_id: plan.order.id,
                listing_id: reservation.listing_id,
                quantity: reservation.quantity,
                start: reservation.start,
                end: reservation.end,
            });
            core.reservations.insert(reservation.id, reservation.clone());
        }
        core.orders.insert(plan.order.id, plan.order.clone());

        Ok(plan.order)
    }

    /// open a checkout session with the payment gateway
    pub fn create_checkout(
        &self,
        order_id: OrderId,
        gateway: &dyn PaymentGateway,
        time_provider: &SafeTimeProvider,
    ) -> Result<String> {
        let order = self.order(order_id)?;
        let session_ref = gateway.create_checkout(&order)?;
        self.core().events.emit(Event::CheckoutCreated {
            order_id,
            session_ref: session_ref.clone(),
            amount: order.total_amount,
            timestamp: time_provider.now(),
        });
        Ok(session_ref)
    }

    // --- order lifecycle --------------------------------------------------

    /// payment success: quote -> confirmed, credit the host, hold the
    /// reservations
    pub fn confirm_payment(
        &self,
        order_id: OrderId,
        payment_ref: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<Order> {
        let now = time_provider.now();
        let mut core = self.core();

        let order = core.orders.get_mut(&order_id).ok_or(MarketError::NotFound {
            entity: "order",
            id: order_id,
        })?;
        ensure_order_transition(order.order_status, OrderStatus::Confirmed)?;

        let old_status = order.order_status;
        order.order_status = OrderStatus::Confirmed;
        order.payment_status = PaymentStatus::Paid;
        order.payment_ref = Some(payment_ref.to_string());
        order.record("payment_confirmed", "system", Some(payment_ref.to_string()), now);

        let host_id = order.host_id.clone();
        let earnings = order.host_earnings();
        let amount = order.total_amount;
        let reservation_ids = order.reservation_ids();

        // ledger credit lives inside the same critical section as the
        // status change
        core.wallets
            .entry(host_id.clone())
            .or_default()
            .credit(earnings, order_id, "order payment", now);

        // reservations stay Reserved; stamp them so the hold reflects payment
        for id in reservation_ids {
            if let Some(reservation) = core.reservations.get_mut(&id) {
                reservation.set_status(ReservationStatus::Reserved, now);
            }
        }

        core.events.emit(Event::PaymentConfirmed {
            order_id,
            payment_ref: payment_ref.to_string(),
            amount,
            timestamp: now,
        });
        core.events.emit(Event::HostCredited {
            host_id,
            order_id,
            amount: earnings,
            timestamp: now,
        });
        core.events.emit(Event::OrderStatusChanged {
            order_id,
            old_status,
            new_status: OrderStatus::Confirmed,
            reason: "payment confirmed".to_string(),
            timestamp: now,
        });

        Ok(core.orders[&order_id].clone())
    }

    /// payment failure reported by the gateway webhook
    pub fn mark_payment_failed(
        &self,
        order_id: OrderId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Order> {
        let now = time_provider.now();
        let mut core = self.core();
        let order = core.orders.get_mut(&order_id).ok_or(MarketError::NotFound {
            entity: "order",
            id: order_id,
        })?;
        if order.order_status != OrderStatus::Quote {
            return Err(MarketError::InvalidTransition {
                entity: "order",
                from: format!("{:?}", order.order_status),
                to: "Quote/payment_failed".to_string(),
            });
        }
        order.payment_status = PaymentStatus::Failed;
        order.record("payment_failed", "system", None, now);
        Ok(core.orders[&order_id].clone())
    }

    /// host hands the items over: confirmed -> in_progress
    pub fn mark_pickup(&self, order_id: OrderId, time_provider: &SafeTimeProvider) -> Result<Order> {
        let now = time_provider.now();
        let mut core = self.core();

        let order = core.orders.get_mut(&order_id).ok_or(MarketError::NotFound {
            entity: "order",
            id: order_id,
        })?;
        ensure_order_transition(order.order_status, OrderStatus::InProgress)?;

        let old_status = order.order_status;
        order.order_status = OrderStatus::InProgress;
        order.record("picked_up", &order.host_id.clone(), None, now);
        let reservation_ids = order.reservation_ids();

        for id in reservation_ids {
            Self::step_reservation(&mut core, id, ReservationStatus::Picked, now)?;
        }

        core.events.emit(Event::OrderStatusChanged {
            order_id,
            old_status,
            new_status: OrderStatus::InProgress,
            reason: "host pickup".to_string(),
            timestamp: now,
        });

        Ok(core.orders[&order_id].clone())
    }

    /// host takes the items back; damage charges dispute the order and
    /// raise damage fees, otherwise it completes
    pub fn mark_return(
        &self,
        order_id: OrderId,
        damage_charges: Vec<DamageCharge>,
        time_provider: &SafeTimeProvider,
    ) -> Result<Order> {
        let now = time_provider.now();
        let mut core = self.core();

        let order = core.orders.get_mut(&order_id).ok_or(MarketError::NotFound {
            entity: "order",
            id: order_id,
        })?;
        let new_status = if damage_charges.is_empty() {
            OrderStatus::Completed
        } else {
            OrderStatus::Disputed
        };
        ensure_order_transition(order.order_status, new_status)?;

        let old_status = order.order_status;
        order.order_status = new_status;
        order.record("returned", &order.host_id.clone(), None, now);
        let reservation_ids = order.reservation_ids();
        let renter_id = order.renter_id.clone();

        for id in reservation_ids {
            Self::step_reservation(&mut core, id, ReservationStatus::Returned, now)?;
        }

        for charge in &damage_charges {
            let order = &core.orders[&order_id];
            let fee = AccrualEngine::custom_fee(
                order,
                FeeType::DamageFee,
                charge.amount,
                charge.description.clone(),
                now,
            )?;
            core.events.emit(Event::LateFeeCreated {
                fee_id: fee.id,
                order_id,
                fee_type: FeeType::DamageFee,
                amount: fee.current_amount,
                days_overdue: 0,
                timestamp: now,
            });
            let fee_id = fee.id;
            core.fees.insert(fee.id, fee);
            self.send_fee_notification(
                &mut core,
                fee_id,
                &renter_id,
                "damage_fee_created",
                json!({ "order_id": order_id, "amount": charge.amount }),
                now,
            );
        }

        core.events.emit(Event::OrderStatusChanged {
            order_id,
            old_status,
            new_status,
            reason: if damage_charges.is_empty() {
                "returned clean".to_string()
            } else {
                format!("{} damage charge(s)", damage_charges.len())
            },
            timestamp: now,
        });

        Ok(core.orders[&order_id].clone())
    }

    /// close out a disputed order
    pub fn resolve_dispute(
        &self,
        order_id: OrderId,
        resolution: DisputeResolution,
        time_provider: &SafeTimeProvider,
    ) -> Result<Order> {
        match resolution {
            DisputeResolution::Cancel => {
                self.cancel_order(order_id, "dispute resolved against order", time_provider)
            }
            DisputeResolution::Complete => {
                let now = time_provider.now();
                let mut core = self.core();
                let order = core.orders.get_mut(&order_id).ok_or(MarketError::NotFound {
                    entity: "order",
                    id: order_id,
                })?;
                ensure_order_transition(order.order_status, OrderStatus::Completed)?;
                let old_status = order.order_status;
                order.order_status = OrderStatus::Completed;
                order.record("dispute_resolved", "system", None, now);
                core.events.emit(Event::OrderStatusChanged {
                    order_id,
                    old_status,
                    new_status: OrderStatus::Completed,
                    reason: "dispute resolved".to_string(),
                    timestamp: now,
                });
                Ok(core.orders[&order_id].clone())
            }
        }
    }

    /// cancel before completion; reverses the host credit when payment had
    /// succeeded and frees all reservation capacity immediately
    pub fn cancel_order(
        &self,
        order_id: OrderId,
        reason: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<Order> {
        let now = time_provider.now();
        let mut core = self.core();

        let order = core.orders.get_mut(&order_id).ok_or(MarketError::NotFound {
            entity: "order",
            id: order_id,
        })?;
        ensure_order_transition(order.order_status, OrderStatus::Cancelled)?;

        let old_status = order.order_status;
        let was_paid = order.payment_status == PaymentStatus::Paid;
        order.order_status = OrderStatus::Cancelled;
        if was_paid {
            order.payment_status = PaymentStatus::Refunded;
        }
        order.record("cancelled", "system", Some(reason.to_string()), now);

        let host_id = order.host_id.clone();
        let earnings = order.host_earnings();
        let reservation_ids = order.reservation_ids();

        if was_paid {
            // reversal in the same critical section as the status change
            core.wallets
                .entry(host_id.clone())
                .or_default()
                .debit(earnings, order_id, "cancellation reversal", now);
            core.events.emit(Event::HostDebited {
                host_id,
                order_id,
                amount: earnings,
                reason: "cancellation reversal".to_string(),
                timestamp: now,
            });
        }

        for id in reservation_ids {
            if let Some(reservation) = core.reservations.get_mut(&id) {
                if reservation.status.consumes_capacity() {
                    ensure_reservation_transition(reservation.status, ReservationStatus::Cancelled)?;
                    let old = reservation.status;
                    reservation.set_status(ReservationStatus::Cancelled, now);
                    core.events.emit(Event::ReservationStatusChanged {
                        reservation_id: id,
                        old_status: old,
                        new_status: ReservationStatus::Cancelled,
                        timestamp: now,
                    });
                }
            }
        }

        core.events.emit(Event::OrderCancelled {
            order_id,
            reason: reason.to_string(),
            refunded: was_paid,
            timestamp: now,
        });
        core.events.emit(Event::OrderStatusChanged {
            order_id,
            old_status,
            new_status: OrderStatus::Cancelled,
            reason: reason.to_string(),
            timestamp: now,
        });

        Ok(core.orders[&order_id].clone())
    }

    /// walk a reservation along the legal path to `target`
    fn step_reservation(
        core: &mut Core,
        id: ReservationId,
        target: ReservationStatus,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let reservation = core.reservations.get_mut(&id).ok_or(MarketError::NotFound {
            entity: "reservation",
            id,
        })?;
        for step in reservation_path(reservation.status, target)? {
            let old = reservation.status;
            reservation.set_status(step, now);
            core.events.emit(Event::ReservationStatusChanged {
                reservation_id: id,
                old_status: old,
                new_status: step,
                timestamp: now,
            });
        }
        Ok(())
    }

    // --- late fees --------------------------------------------------------

    /// scan for overdue payment/return conditions and create or recompute
    /// late fees; idempotent and safe to re-run or double-fire
    pub fn process_overdue_items(&self, time_provider: &SafeTimeProvider) -> AccrualSummary {
        let now = time_provider.now();
        let mut guard = self.core();
        let core = &mut *guard;

        let (summary, actions) =
            AccrualEngine::process(&core.orders, &mut core.fees, &core.fee_configs, now);

        for action in actions {
            match action {
                AccrualAction::Created {
                    fee_id,
                    order_id,
                    fee_type,
                    amount,
                    days_overdue,
                } => {
                    core.events.emit(Event::LateFeeCreated {
                        fee_id,
                        order_id,
                        fee_type,
                        amount,
                        days_overdue,
                        timestamp: now,
                    });
                    let renter_id = core.fees[&fee_id].renter_id.clone();
                    self.send_fee_notification(
                        &mut *core,
                        fee_id,
                        &renter_id,
                        "late_fee_created",
                        json!({
                            "order_id": order_id,
                            "amount": amount,
                            "days_overdue": days_overdue,
                        }),
                        now,
                    );
                }
                AccrualAction::Updated {
                    fee_id,
                    order_id,
                    old_amount,
                    new_amount,
                    days_overdue,
                } => {
                    core.events.emit(Event::LateFeeRecalculated {
                        fee_id,
                        order_id,
                        old_amount,
                        new_amount,
                        days_overdue,
                        timestamp: now,
                    });
                }
            }
        }

        core.events.emit(Event::AccrualRunCompleted {
            processed: summary.processed,
            created: summary.created,
            updated: summary.updated,
            errors: summary.errors.len(),
            timestamp: now,
        });

        summary
    }

    /// forgive an active fee; terminal, amount frozen
    pub fn waive_late_fee(
        &self,
        fee_id: FeeId,
        reason: &str,
        actor: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<LateFee> {
        let now = time_provider.now();
        let mut core = self.core();

        let fee = core.fees.get_mut(&fee_id).ok_or(MarketError::NotFound {
            entity: "late_fee",
            id: fee_id,
        })?;
        AccrualEngine::waive(fee, reason.to_string(), actor.to_string(), now)?;
        let frozen_amount = fee.current_amount;
        let renter_id = fee.renter_id.clone();

        core.events.emit(Event::LateFeeWaived {
            fee_id,
            waived_by: actor.to_string(),
            reason: reason.to_string(),
            frozen_amount,
            timestamp: now,
        });
        self.send_fee_notification(
            &mut core,
            fee_id,
            &renter_id,
            "late_fee_waived",
            json!({ "reason": reason, "amount": frozen_amount }),
            now,
        );

        Ok(core.fees[&fee_id].clone())
    }

    /// settle a fee as paid; terminal
    pub fn mark_late_fee_paid(
        &self,
        fee_id: FeeId,
        time_provider: &SafeTimeProvider,
    ) -> Result<LateFee> {
        let now = time_provider.now();
        let mut core = self.core();

        let fee = core.fees.get_mut(&fee_id).ok_or(MarketError::NotFound {
            entity: "late_fee",
            id: fee_id,
        })?;
        AccrualEngine::mark_paid(fee)?;
        let amount = fee.current_amount;
        let renter_id = fee.renter_id.clone();

        core.events.emit(Event::LateFeePaid {
            fee_id,
            amount,
            timestamp: now,
        });
        self.send_fee_notification(
            &mut core,
            fee_id,
            &renter_id,
            "late_fee_paid",
            json!({ "amount": amount }),
            now,
        );

        Ok(core.fees[&fee_id].clone())
    }

    /// admin-created fee outside policy resolution and grace logic
    pub fn create_custom_late_fee(
        &self,
        order_id: OrderId,
        amount: Money,
        reason: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<LateFee> {
        let now = time_provider.now();
        let mut core = self.core();

        let order = core.orders.get(&order_id).ok_or(MarketError::NotFound {
            entity: "order",
            id: order_id,
        })?;
        let fee =
            AccrualEngine::custom_fee(order, FeeType::Custom, amount, reason.to_string(), now)?;
        let fee_id = fee.id;
        let renter_id = fee.renter_id.clone();

        core.events.emit(Event::LateFeeCreated {
            fee_id,
            order_id,
            fee_type: FeeType::Custom,
            amount: fee.current_amount,
            days_overdue: 0,
            timestamp: now,
        });
        core.fees.insert(fee_id, fee);
        self.send_fee_notification(
            &mut core,
            fee_id,
            &renter_id,
            "custom_fee_created",
            json!({ "order_id": order_id, "amount": amount, "reason": reason }),
            now,
        );

        Ok(core.fees[&fee_id].clone())
    }

    /// deliver through the sink; failures become events, never errors
    fn send_fee_notification(
        &self,
        core: &mut Core,
        fee_id: FeeId,
        recipient_id: &AccountId,
        event_type: &str,
        payload: serde_json::Value,
        now: DateTime<Utc>,
    ) {
        let delivered = match self.sink.notify(recipient_id, event_type, &payload) {
            Ok(()) => {
                core.events.emit(Event::NotificationQueued {
                    recipient_id: recipient_id.clone(),
                    event_type: event_type.to_string(),
                    timestamp: now,
                });
                true
            }
            Err(e) => {
                core.events.emit(Event::NotificationFailed {
                    recipient_id: recipient_id.clone(),
                    event_type: event_type.to_string(),
                    error: e.to_string(),
                    timestamp: now,
                });
                false
            }
        };
        if let Some(fee) = core.fees.get_mut(&fee_id) {
            fee.record_notification(NotificationRecord {
                recipient_id: recipient_id.clone(),
                event_type: event_type.to_string(),
                sent_at: now,
                delivered,
            });
        }
    }

    // --- read access ------------------------------------------------------

    pub fn order(&self, order_id: OrderId) -> Result<Order> {
        self.core()
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(MarketError::NotFound {
                entity: "order",
                id: order_id,
            })
    }

    pub fn fee(&self, fee_id: FeeId) -> Result<LateFee> {
        self.core()
            .fees
            .get(&fee_id)
            .cloned()
            .ok_or(MarketError::NotFound {
                entity: "late_fee",
                id: fee_id,
            })
    }

    pub fn fees_for_order(&self, order_id: OrderId) -> Vec<LateFee> {
        self.core()
            .fees
            .values()
            .filter(|f| f.order_id == order_id)
            .cloned()
            .collect()
    }

    pub fn reservation(&self, reservation_id: ReservationId) -> Result<Reservation> {
        self.core()
            .reservations
            .get(&reservation_id)
            .cloned()
            .ok_or(MarketError::NotFound {
                entity: "reservation",
                id: reservation_id,
            })
    }

    pub fn host_balance(&self, host_id: &str) -> Money {
        self.core()
            .wallets
            .get(host_id)
            .map(|w| w.balance)
            .unwrap_or(Money::ZERO)
    }

    pub fn wallet(&self, host_id: &str) -> Option<HostWallet> {
        self.core().wallets.get(host_id).cloned()
    }

    pub fn order_count(&self) -> usize {
        self.core().orders.len()
    }

    pub fn reservation_count(&self) -> usize {
        self.core().reservations.len()
    }

    pub fn take_events(&self) -> Vec<Event> {
        self.core().events.take_events()
    }
}
