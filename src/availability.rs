use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{MarketError, Result};
use crate::state::{Listing, Reservation};
use crate::types::OrderId;

/// half-open interval overlap: [s1, e1) and [s2, e2) share an instant
/// iff s1 < e2 && s2 < e1; touching endpoints do not overlap
pub fn overlaps(
    s1: DateTime<Utc>,
    e1: DateTime<Utc>,
    s2: DateTime<Utc>,
    e2: DateTime<Utc>,
) -> bool {
    s1 < e2 && s2 < e1
}

/// remaining capacity for a listing over a query window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResult {
    pub available: bool,
    pub available_qty: u32,
    pub reserved_qty: u32,
    pub total_qty: u32,
}

/// computes remaining capacity against the reservation ledger
///
/// Read-only; callers must run it inside the same critical section as the
/// subsequent reservation write to keep check-and-reserve atomic.
pub struct AvailabilityCalculator {
    allow_past_start: bool,
}

impl AvailabilityCalculator {
    /// `allow_past_start` relaxes the past-date check for back-dated
    /// administrative seeding
    pub fn new(allow_past_start: bool) -> Self {
        Self { allow_past_start }
    }

    /// validate a requested window against the clock
    pub fn validate_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if start >= end {
            return Err(MarketError::validation(format!(
                "window start {} must precede end {}",
                start, end
            )));
        }
        if !self.allow_past_start && start < now {
            return Err(MarketError::validation(format!(
                "window start {} is in the past",
                start
            )));
        }
        Ok(())
    }

    /// remaining capacity for `listing` over `[start, end)`
    ///
    /// Reservations in a capacity-consuming status whose window strictly
    /// overlaps the query count against the listing's total quantity;
    /// reservations belonging to `exclude_order` are ignored.
    pub fn check<'a>(
        &self,
        listing: &Listing,
        reservations: impl Iterator<Item = &'a Reservation>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        requested_qty: u32,
        exclude_order: Option<OrderId>,
        now: DateTime<Utc>,
    ) -> Result<AvailabilityResult> {
        self.validate_window(start, end, now)?;

        if !listing.is_bookable() {
            return Err(MarketError::ListingNotBookable {
                listing_id: listing.id,
            });
        }

        let reserved_qty: u32 = reservations
            .filter(|r| r.listing_id == listing.id)
            .filter(|r| r.status.consumes_capacity())
            .filter(|r| exclude_order.is_none() || r.order_id != exclude_order)
            .filter(|r| overlaps(r.start, r.end, start, end))
            .map(|r| r.quantity)
            .sum();

        let available_qty = listing.total_quantity.saturating_sub(reserved_qty);

        Ok(AvailabilityResult {
            available: available_qty >= requested_qty,
            available_qty,
            reserved_qty,
            total_qty: listing.total_quantity,
        })
    }
}
