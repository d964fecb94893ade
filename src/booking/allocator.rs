use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::availability::AvailabilityCalculator;
use crate::booking::pricing::{price_line, OrderTotals};
use crate::config::MarketConfig;
use crate::decimal::Rate;
use crate::errors::{MarketError, Result};
use crate::state::{Listing, Order, OrderLine, Reservation};
use crate::types::{
    AccountId, ListingId, OrderStatus, PaymentOption, PaymentStatus, ReservationId,
};

/// one requested line of a booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineRequest {
    pub listing_id: ListingId,
    pub quantity: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// a booking request covering one or more lines against a single host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub renter_id: AccountId,
    pub lines: Vec<LineRequest>,
    pub payment_option: PaymentOption,
}

/// a fully validated and priced booking, ready to persist as one unit
///
/// Construction is pure: nothing is written until the caller commits the
/// plan, so a failed plan leaves the store untouched.
#[derive(Debug, Clone)]
pub struct OrderPlan {
    pub order: Order,
    pub reservations: Vec<Reservation>,
}

/// validates, prices and assembles multi-line orders
pub struct BookingAllocator {
    calculator: AvailabilityCalculator,
    commission: Rate,
}

impl BookingAllocator {
    pub fn new(config: &MarketConfig) -> Self {
        Self {
            calculator: AvailabilityCalculator::new(config.allow_past_start),
            commission: config.commission,
        }
    }

    pub fn calculator(&self) -> &AvailabilityCalculator {
        &self.calculator
    }

    /// validate every line's availability and assemble the order plus its
    /// reservations
    ///
    /// Must run inside the same critical section as the commit of the
    /// returned plan; the availability read is only safe against concurrent
    /// bookings while that section is held.
    pub fn plan(
        &self,
        listings: &HashMap<ListingId, Listing>,
        reservations: &HashMap<ReservationId, Reservation>,
        request: &OrderRequest,
        now: DateTime<Utc>,
    ) -> Result<OrderPlan> {
        if request.lines.is_empty() {
            return Err(MarketError::validation("order must have at least one line"));
        }

        // every line must resolve to the same host
        let mut host_id: Option<AccountId> = None;
        for line in &request.lines {
            let listing = listings.get(&line.listing_id).ok_or(MarketError::NotFound {
                entity: "listing",
                id: line.listing_id,
            })?;
            match &host_id {
                None => host_id = Some(listing.host_id.clone()),
                Some(host) if *host != listing.host_id => {
                    return Err(MarketError::validation(
                        "all lines of an order must belong to one host",
                    ));
                }
                Some(_) => {}
            }
        }
        let host_id = host_id.ok_or_else(|| {
            MarketError::validation("order must have at least one line")
        })?;

        let order_id = Uuid::new_v4();
        let mut planned_reservations: Vec<Reservation> = Vec::with_capacity(request.lines.len());
        let mut order_lines: Vec<OrderLine> = Vec::with_capacity(request.lines.len());

        for line in &request.lines {
            let listing = &listings[&line.listing_id];

            // earlier lines of this same request also consume capacity
            let result = self.calculator.check(
                listing,
                reservations.values().chain(planned_reservations.iter()),
                line.start,
                line.end,
                line.quantity,
                None,
                now,
            )?;

            if !result.available {
                return Err(MarketError::InsufficientAvailability {
                    listing_id: listing.id,
                    requested: line.quantity,
                    available: result.available_qty,
                });
            }

            let pricing = price_line(listing, line.quantity, line.start, line.end)?;

            let mut reservation =
                Reservation::new(listing.id, line.quantity, line.start, line.end, now);
            reservation.order_id = Some(order_id);

            order_lines.push(OrderLine {
                listing_id: listing.id,
                quantity: line.quantity,
                start: line.start,
                end: line.end,
                unit_price: pricing.unit_price,
                duration_units: pricing.duration_units,
                line_total: pricing.line_total,
                deposit: pricing.deposit,
                reservation_id: Some(reservation.id),
            });
            planned_reservations.push(reservation);
        }

        let totals = OrderTotals::compute(&order_lines, self.commission, request.payment_option);
        let category = listings[&request.lines[0].listing_id].category.clone();

        let mut order = Order {
            id: order_id,
            renter_id: request.renter_id.clone(),
            host_id,
            category,
            lines: order_lines,
            subtotal: totals.subtotal,
            deposit_amount: totals.deposit_amount,
            platform_commission: totals.platform_commission,
            total_amount: totals.total_amount,
            remaining_amount: totals.remaining_amount,
            payment_option: request.payment_option,
            payment_status: PaymentStatus::Pending,
            payment_ref: None,
            order_status: OrderStatus::Quote,
            timeline: Vec::new(),
            created_at: now,
        };
        order.record("order_created", &request.renter_id, None, now);

        Ok(OrderPlan {
            order,
            reservations: planned_reservations,
        })
    }
}
