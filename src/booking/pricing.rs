use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::decimal::{Money, Rate};
use crate::errors::{MarketError, Result};
use crate::state::{Listing, OrderLine};
use crate::types::{DepositRule, PaymentOption, UnitType};

/// billable units over a window, partial units rounded up
pub fn duration_units(start: DateTime<Utc>, end: DateTime<Utc>, unit: UnitType) -> Result<u32> {
    let span = (end - start).num_seconds();
    if span <= 0 {
        return Err(MarketError::validation(format!(
            "window start {} must precede end {}",
            start, end
        )));
    }
    let unit_secs = unit.unit_duration().num_seconds();
    Ok(((span + unit_secs - 1) / unit_secs) as u32)
}

/// priced values for one order line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePricing {
    pub unit_price: Money,
    pub duration_units: u32,
    pub line_total: Money,
    pub deposit: Money,
}

/// price a single line: base price x quantity x billable units,
/// deposit per the listing's rule
pub fn price_line(
    listing: &Listing,
    quantity: u32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<LinePricing> {
    if quantity < 1 {
        return Err(MarketError::validation(format!(
            "quantity must be at least 1 for listing {}",
            listing.id
        )));
    }

    let duration = duration_units(start, end, listing.unit_type)?;
    let line_total = listing.base_price * Decimal::from(quantity) * Decimal::from(duration);

    let deposit = match listing.deposit_rule {
        DepositRule::Flat(amount) => amount * Decimal::from(quantity),
        DepositRule::Percent(pct) => line_total.percentage(pct),
        DepositRule::None => Money::ZERO,
    };

    Ok(LinePricing {
        unit_price: listing.base_price,
        duration_units: duration,
        line_total,
        deposit,
    })
}

/// order-level totals derived from priced lines
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub deposit_amount: Money,
    pub platform_commission: Money,
    pub total_amount: Money,
    pub remaining_amount: Money,
}

impl OrderTotals {
    /// the per-line deposit summation here is the single authority for
    /// `deposit_amount`
    pub fn compute(lines: &[OrderLine], commission: Rate, option: PaymentOption) -> Self {
        let subtotal: Money = lines.iter().map(|l| l.line_total).sum();
        let deposit_amount: Money = lines.iter().map(|l| l.deposit).sum();
        let platform_commission = subtotal.percentage(commission.as_percentage());

        let total_amount = match option {
            PaymentOption::Full => subtotal,
            PaymentOption::Deposit => deposit_amount,
        };

        Self {
            subtotal,
            deposit_amount,
            platform_commission,
            total_amount,
            remaining_amount: subtotal - total_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ListingStatus;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, h, 0, 0).unwrap()
    }

    fn listing(unit_type: UnitType, base_price: Money, deposit_rule: DepositRule) -> Listing {
        Listing {
            id: Uuid::new_v4(),
            host_id: "host-1".into(),
            title: "camera kit".into(),
            category: "cameras".into(),
            status: ListingStatus::Active,
            total_quantity: 3,
            unit_type,
            base_price,
            deposit_rule,
        }
    }

    fn line(listing: &Listing, qty: u32, start: DateTime<Utc>, end: DateTime<Utc>) -> OrderLine {
        let pricing = price_line(listing, qty, start, end).unwrap();
        OrderLine {
            listing_id: listing.id,
            quantity: qty,
            start,
            end,
            unit_price: pricing.unit_price,
            duration_units: pricing.duration_units,
            line_total: pricing.line_total,
            deposit: pricing.deposit,
            reservation_id: None,
        }
    }

    #[test]
    fn test_duration_ceiling() {
        // 2 days and 1 hour bills as 3 days
        let units = duration_units(at(1, 0), at(3, 1), UnitType::Day).unwrap();
        assert_eq!(units, 3);

        // exactly 2 days bills as 2 days
        let units = duration_units(at(1, 0), at(3, 0), UnitType::Day).unwrap();
        assert_eq!(units, 2);

        // 90 minutes bills as 2 hours
        let units =
            duration_units(at(1, 0), at(1, 0) + Duration::minutes(90), UnitType::Hour).unwrap();
        assert_eq!(units, 2);

        // 8 days bills as 2 weeks
        let units = duration_units(at(1, 0), at(9, 0), UnitType::Week).unwrap();
        assert_eq!(units, 2);
    }

    #[test]
    fn test_line_total_identity() {
        let listing = listing(UnitType::Day, Money::from_major(40), DepositRule::None);
        let pricing = price_line(&listing, 2, at(1, 0), at(4, 0)).unwrap();

        assert_eq!(pricing.duration_units, 3);
        // lineTotal = unitPrice x qty x duration
        assert_eq!(pricing.line_total, Money::from_major(40 * 2 * 3));
        assert_eq!(pricing.deposit, Money::ZERO);
    }

    #[test]
    fn test_deposit_rules() {
        let flat = listing(
            UnitType::Day,
            Money::from_major(40),
            DepositRule::Flat(Money::from_major(15)),
        );
        let pricing = price_line(&flat, 2, at(1, 0), at(2, 0)).unwrap();
        assert_eq!(pricing.deposit, Money::from_major(30));

        let percent = listing(
            UnitType::Day,
            Money::from_major(40),
            DepositRule::Percent(dec!(25)),
        );
        let pricing = price_line(&percent, 2, at(1, 0), at(2, 0)).unwrap();
        // 25% of 80
        assert_eq!(pricing.deposit, Money::from_major(20));
    }

    #[test]
    fn test_order_totals() {
        let l1 = listing(
            UnitType::Day,
            Money::from_major(40),
            DepositRule::Flat(Money::from_major(10)),
        );
        let l2 = listing(
            UnitType::Day,
            Money::from_major(25),
            DepositRule::Percent(dec!(20)),
        );
        let lines = vec![
            line(&l1, 1, at(1, 0), at(3, 0)), // 80, deposit 10
            line(&l2, 2, at(1, 0), at(3, 0)), // 100, deposit 20
        ];

        let totals = OrderTotals::compute(&lines, Rate::from_percentage(10), PaymentOption::Full);
        assert_eq!(totals.subtotal, Money::from_major(180));
        assert_eq!(totals.deposit_amount, Money::from_major(30));
        assert_eq!(totals.platform_commission, Money::from_major(18));
        assert_eq!(totals.total_amount, Money::from_major(180));
        assert_eq!(totals.remaining_amount, Money::ZERO);

        let deposit_only =
            OrderTotals::compute(&lines, Rate::from_percentage(10), PaymentOption::Deposit);
        assert_eq!(deposit_only.total_amount, Money::from_major(30));
        assert_eq!(deposit_only.remaining_amount, Money::from_major(150));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let listing = listing(UnitType::Day, Money::from_major(40), DepositRule::None);
        assert!(price_line(&listing, 0, at(1, 0), at(2, 0)).is_err());
    }
}
