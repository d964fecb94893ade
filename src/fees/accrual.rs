use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::LateFeeConfig;
use crate::decimal::Money;
use crate::errors::{MarketError, Result};
use crate::fees::policy::resolve_config;
use crate::state::{LateFee, Order};
use crate::types::{
    AccountId, CalculationMethod, FeeId, FeeStatus, FeeType, OrderId, OrderStatus, PaymentStatus,
    PercentageBase,
};

/// outcome of one accrual run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccrualSummary {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub errors: Vec<String>,
}

/// a fee-level effect of an accrual run, for event/notification fan-out
#[derive(Debug, Clone, PartialEq)]
pub enum AccrualAction {
    Created {
        fee_id: FeeId,
        order_id: OrderId,
        fee_type: FeeType,
        amount: Money,
        days_overdue: u32,
    },
    Updated {
        fee_id: FeeId,
        order_id: OrderId,
        old_amount: Money,
        new_amount: Money,
        days_overdue: u32,
    },
}

/// whole days overdue, any partial day counting as a full one
pub fn days_overdue(now: DateTime<Utc>, due: DateTime<Utc>) -> u32 {
    let seconds = (now - due).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    ((seconds + 86_399) / 86_400) as u32
}

/// scans orders for overdue conditions and creates or recomputes late fees
///
/// Idempotent: re-running over the same data recomputes the same amounts
/// and never duplicates an active fee for an (order, type) pair. Callers
/// must hold the store lock across the whole run so the existing-fee check
/// and fee creation are one unit.
pub struct AccrualEngine;

impl AccrualEngine {
    /// run the overdue scan against the order and fee stores
    pub fn process(
        orders: &HashMap<OrderId, Order>,
        fees: &mut HashMap<FeeId, LateFee>,
        configs: &[LateFeeConfig],
        now: DateTime<Utc>,
    ) -> (AccrualSummary, Vec<AccrualAction>) {
        let mut summary = AccrualSummary::default();
        let mut actions = Vec::new();

        for (fee_type, order) in Self::candidates(orders, now) {
            summary.processed += 1;
            match Self::accrue_one(fee_type, order, fees, configs, now) {
                Ok(Some(action)) => {
                    match action {
                        AccrualAction::Created { .. } => summary.created += 1,
                        AccrualAction::Updated { .. } => summary.updated += 1,
                    }
                    actions.push(action);
                }
                Ok(None) => {}
                Err(e) => summary.errors.push(format!("order {}: {}", order.id, e)),
            }
        }

        (summary, actions)
    }

    /// orders eligible for overdue-payment or overdue-return fees
    fn candidates(
        orders: &HashMap<OrderId, Order>,
        now: DateTime<Utc>,
    ) -> Vec<(FeeType, &Order)> {
        let mut out = Vec::new();
        for order in orders.values() {
            match order.due_date() {
                Some(due) if due < now => {}
                _ => continue,
            }

            let payment_overdue = matches!(
                order.payment_status,
                PaymentStatus::Pending | PaymentStatus::Failed
            ) && matches!(
                order.order_status,
                OrderStatus::Confirmed | OrderStatus::InProgress
            );
            if payment_overdue {
                out.push((FeeType::PaymentOverdue, order));
            }

            let return_overdue = order.payment_status == PaymentStatus::Paid
                && order.order_status == OrderStatus::InProgress;
            if return_overdue {
                out.push((FeeType::ReturnOverdue, order));
            }
        }
        out
    }

    /// create or recompute the fee for one (order, type) pair
    fn accrue_one(
        fee_type: FeeType,
        order: &Order,
        fees: &mut HashMap<FeeId, LateFee>,
        configs: &[LateFeeConfig],
        now: DateTime<Utc>,
    ) -> Result<Option<AccrualAction>> {
        let config = match resolve_config(configs, fee_type, order) {
            Some(c) if c.auto_apply => c,
            _ => return Ok(None),
        };

        let due = order.due_date().ok_or_else(|| {
            MarketError::validation(format!("order {} has no lines", order.id))
        })?;
        let days = days_overdue(now, due);
        if days <= config.grace_period_days {
            return Ok(None);
        }

        // at most one active fee per (order, type): recompute, never duplicate
        let existing = fees
            .values_mut()
            .find(|f| f.order_id == order.id && f.fee_type == fee_type && f.status == FeeStatus::Active);

        match existing {
            Some(fee) => {
                let (computed, formula) = Self::compute_amount(config, order, days)?;
                // amounts never shrink while active, even after a config edit
                let new_amount = computed.max(fee.current_amount);
                let old_amount = fee.current_amount;
                let fee_id = fee.id;
                fee.record_calculation(days, new_amount, formula, now);
                Ok(Some(AccrualAction::Updated {
                    fee_id,
                    order_id: order.id,
                    old_amount,
                    new_amount,
                    days_overdue: days,
                }))
            }
            None => {
                let (amount, formula) = Self::compute_amount(config, order, days)?;
                let mut fee = LateFee {
                    id: Uuid::new_v4(),
                    order_id: order.id,
                    renter_id: order.renter_id.clone(),
                    host_id: order.host_id.clone(),
                    fee_type,
                    base_amount: config.base_amount,
                    daily_rate: config.daily_rate,
                    max_amount: config.max_amount,
                    current_amount: amount,
                    days_overdue: days,
                    due_date: due,
                    grace_period_days: config.grace_period_days,
                    status: FeeStatus::Active,
                    auto_applied: true,
                    reason: Some(config.name.clone()),
                    waived_reason: None,
                    waived_by: None,
                    waived_at: None,
                    calculations: Vec::new(),
                    notifications: Vec::new(),
                    created_at: now,
                    last_calculated: now,
                };
                fee.record_calculation(days, amount, formula, now);
                let action = AccrualAction::Created {
                    fee_id: fee.id,
                    order_id: order.id,
                    fee_type,
                    amount,
                    days_overdue: days,
                };
                fees.insert(fee.id, fee);
                Ok(Some(action))
            }
        }
    }

    /// amount for the configured calculation method, clamped to the cap
    pub fn compute_amount(
        config: &LateFeeConfig,
        order: &Order,
        days: u32,
    ) -> Result<(Money, String)> {
        let chargeable = days.saturating_sub(config.grace_period_days);

        let (amount, formula) = match config.calculation_method {
            CalculationMethod::Fixed => {
                let amount = config.base_amount
                    + Money::from_decimal(config.daily_rate * Decimal::from(chargeable));
                let formula = format!(
                    "{} + {} * ({} - {})",
                    config.base_amount, config.daily_rate, days, config.grace_period_days
                );
                (amount, formula)
            }
            CalculationMethod::Percentage => {
                let base = match config.percentage_base {
                    PercentageBase::OrderTotal => order.total_amount,
                    PercentageBase::RemainingAmount => order.remaining_amount,
                    PercentageBase::DepositAmount => order.deposit_amount,
                };
                let amount = config.base_amount
                    + base.percentage(config.daily_rate) * Decimal::from(chargeable);
                let formula = format!(
                    "{} + {} * {}% * {} days",
                    config.base_amount, base, config.daily_rate, chargeable
                );
                (amount, formula)
            }
            CalculationMethod::Compound => {
                let periods = chargeable / config.compound_frequency.period_days();
                let period_rate = Decimal::ONE + config.daily_rate / Decimal::from(100);
                let mut factor = Decimal::ONE;
                for _ in 0..periods {
                    factor *= period_rate;
                }
                let amount = Money::from_decimal(config.base_amount.as_decimal() * factor);
                let formula = format!(
                    "{} * (1 + {}%)^{}",
                    config.base_amount, config.daily_rate, periods
                );
                (amount, formula)
            }
        };

        if amount.is_negative() {
            return Err(MarketError::CalculationError {
                message: format!("negative fee amount from policy '{}'", config.name),
            });
        }

        let clamped = if config.max_amount.is_positive() {
            amount.min(config.max_amount)
        } else {
            amount
        };
        Ok((clamped, formula))
    }

    /// admin-created fee: fixed amount, no policy, no grace period
    pub fn custom_fee(
        order: &Order,
        fee_type: FeeType,
        amount: Money,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<LateFee> {
        if !amount.is_positive() {
            return Err(MarketError::InvalidFeeAmount { amount });
        }

        let mut fee = LateFee {
            id: Uuid::new_v4(),
            order_id: order.id,
            renter_id: order.renter_id.clone(),
            host_id: order.host_id.clone(),
            fee_type,
            base_amount: amount,
            daily_rate: Decimal::ZERO,
            max_amount: amount,
            current_amount: amount,
            days_overdue: 0,
            due_date: now,
            grace_period_days: 0,
            status: FeeStatus::Active,
            auto_applied: false,
            reason: Some(reason.clone()),
            waived_reason: None,
            waived_by: None,
            waived_at: None,
            calculations: Vec::new(),
            notifications: Vec::new(),
            created_at: now,
            last_calculated: now,
        };
        fee.record_calculation(0, amount, format!("fixed: {}", reason), now);
        Ok(fee)
    }

    /// waive an active fee: terminal, amount frozen
    pub fn waive(
        fee: &mut LateFee,
        reason: String,
        actor: AccountId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if fee.status != FeeStatus::Active {
            return Err(MarketError::InvalidTransition {
                entity: "late_fee",
                from: format!("{:?}", fee.status),
                to: format!("{:?}", FeeStatus::Waived),
            });
        }
        fee.status = FeeStatus::Waived;
        fee.waived_reason = Some(reason);
        fee.waived_by = Some(actor);
        fee.waived_at = Some(now);
        Ok(())
    }

    /// settle a fee as paid: terminal
    pub fn mark_paid(fee: &mut LateFee) -> Result<()> {
        if !matches!(fee.status, FeeStatus::Active | FeeStatus::Disputed) {
            return Err(MarketError::InvalidTransition {
                entity: "late_fee",
                from: format!("{:?}", fee.status),
                to: format!("{:?}", FeeStatus::Paid),
            });
        }
        fee.status = FeeStatus::Paid;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::OrderLine;
    use crate::types::{CompoundFrequency, PaymentOption};
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, 0, 0, 0).unwrap()
    }

    fn overdue_order(status: OrderStatus, payment: PaymentStatus, end: DateTime<Utc>) -> Order {
        let start = end - Duration::days(2);
        Order {
            id: Uuid::new_v4(),
            renter_id: "renter-1".into(),
            host_id: "host-1".into(),
            category: "tools".into(),
            lines: vec![OrderLine {
                listing_id: Uuid::new_v4(),
                quantity: 1,
                start,
                end,
                unit_price: Money::from_major(50),
                duration_units: 2,
                line_total: Money::from_major(100),
                deposit: Money::from_major(20),
                reservation_id: None,
            }],
            subtotal: Money::from_major(100),
            deposit_amount: Money::from_major(20),
            platform_commission: Money::from_major(10),
            total_amount: Money::from_major(100),
            remaining_amount: Money::ZERO,
            payment_option: PaymentOption::Full,
            payment_status: payment,
            payment_ref: None,
            order_status: status,
            timeline: Vec::new(),
            created_at: start,
        }
    }

    #[test]
    fn test_days_overdue_ceiling() {
        let due = day(10);
        assert_eq!(days_overdue(due, due), 0);
        assert_eq!(days_overdue(due - Duration::hours(1), due), 0);
        assert_eq!(days_overdue(due + Duration::hours(1), due), 1);
        assert_eq!(days_overdue(due + Duration::days(1), due), 1);
        assert_eq!(days_overdue(due + Duration::days(1) + Duration::minutes(1), due), 2);
        assert_eq!(days_overdue(due + Duration::days(5), due), 5);
    }

    #[test]
    fn test_fixed_amount_example() {
        // base=50, rate=25, max=500, grace=1, days=5 -> min(50 + 25*4, 500) = 150
        let config = LateFeeConfig::payment_overdue_default();
        let order = overdue_order(OrderStatus::Confirmed, PaymentStatus::Pending, day(10));
        let (amount, formula) = AccrualEngine::compute_amount(&config, &order, 5).unwrap();
        assert_eq!(amount, Money::from_major(150));
        assert_eq!(formula, "50 + 25 * (5 - 1)");
    }

    #[test]
    fn test_amount_clamped_to_max() {
        let config = LateFeeConfig::payment_overdue_default();
        let order = overdue_order(OrderStatus::Confirmed, PaymentStatus::Pending, day(10));
        // 50 + 25*99 would be 2525; capped at 500
        let (amount, _) = AccrualEngine::compute_amount(&config, &order, 100).unwrap();
        assert_eq!(amount, Money::from_major(500));
    }

    #[test]
    fn test_percentage_amount() {
        let mut config = LateFeeConfig::return_overdue_default();
        config.grace_period_days = 0;
        config.base_amount = Money::from_major(25);
        config.daily_rate = dec!(5);
        let order = overdue_order(OrderStatus::InProgress, PaymentStatus::Paid, day(10));

        // 25 + 100 * 5% * 3 = 40
        let (amount, _) = AccrualEngine::compute_amount(&config, &order, 3).unwrap();
        assert_eq!(amount, Money::from_major(40));
    }

    #[test]
    fn test_percentage_bases() {
        let mut config = LateFeeConfig::return_overdue_default();
        config.base_amount = Money::ZERO;
        config.daily_rate = dec!(10);
        let order = overdue_order(OrderStatus::InProgress, PaymentStatus::Paid, day(10));

        config.percentage_base = PercentageBase::OrderTotal;
        let (total_based, _) = AccrualEngine::compute_amount(&config, &order, 1).unwrap();
        assert_eq!(total_based, Money::from_major(10));

        config.percentage_base = PercentageBase::DepositAmount;
        let (deposit_based, _) = AccrualEngine::compute_amount(&config, &order, 1).unwrap();
        assert_eq!(deposit_based, Money::from_major(2));
    }

    #[test]
    fn test_compound_amount() {
        let mut config = LateFeeConfig::compound_return_overdue(vec![], 0);
        config.base_amount = Money::from_major(100);
        config.daily_rate = dec!(10);
        config.compound_frequency = CompoundFrequency::Daily;
        config.grace_period_days = 0;
        let order = overdue_order(OrderStatus::InProgress, PaymentStatus::Paid, day(10));

        // 100 * 1.1^3 = 133.10
        let (amount, _) = AccrualEngine::compute_amount(&config, &order, 3).unwrap();
        assert_eq!(amount, Money::from_str_exact("133.10").unwrap());

        // weekly frequency: 10 days = 1 full period
        config.compound_frequency = CompoundFrequency::Weekly;
        let (amount, _) = AccrualEngine::compute_amount(&config, &order, 10).unwrap();
        assert_eq!(amount, Money::from_major(110));
    }

    #[test]
    fn test_process_creates_once_then_updates() {
        let order = overdue_order(OrderStatus::Confirmed, PaymentStatus::Pending, day(10));
        let orders: HashMap<_, _> = [(order.id, order)].into();
        let mut fees = HashMap::new();
        let configs = vec![LateFeeConfig::payment_overdue_default()];

        // 5 days overdue
        let (summary, actions) = AccrualEngine::process(&orders, &mut fees, &configs, day(15));
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 0);
        assert!(summary.errors.is_empty());
        assert_eq!(fees.len(), 1);
        let fee = fees.values().next().unwrap();
        assert_eq!(fee.current_amount, Money::from_major(150));
        assert_eq!(fee.days_overdue, 5);
        assert!(matches!(actions[0], AccrualAction::Created { .. }));

        // immediate re-run: same data, same amount, no duplicate fee
        let (summary, _) = AccrualEngine::process(&orders, &mut fees, &configs, day(15));
        assert_eq!(summary.created, 0);
        assert_eq!(summary.updated, 1);
        assert_eq!(fees.len(), 1);
        let fee = fees.values().next().unwrap();
        assert_eq!(fee.current_amount, Money::from_major(150));
        assert_eq!(fee.calculations.len(), 2);

        // two days later the amount grows monotonically
        let (_, actions) = AccrualEngine::process(&orders, &mut fees, &configs, day(17));
        let fee = fees.values().next().unwrap();
        assert_eq!(fee.current_amount, Money::from_major(200));
        match &actions[0] {
            AccrualAction::Updated { old_amount, new_amount, .. } => {
                assert_eq!(*old_amount, Money::from_major(150));
                assert_eq!(*new_amount, Money::from_major(200));
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn test_grace_period_skips() {
        let order = overdue_order(OrderStatus::Confirmed, PaymentStatus::Pending, day(10));
        let orders: HashMap<_, _> = [(order.id, order)].into();
        let mut fees = HashMap::new();
        let configs = vec![LateFeeConfig::payment_overdue_default()]; // grace 1

        // 1 day overdue, inside grace
        let (summary, _) = AccrualEngine::process(&orders, &mut fees, &configs, day(11));
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.created, 0);
        assert!(fees.is_empty());
    }

    #[test]
    fn test_candidate_filters() {
        let mut fees = HashMap::new();
        let configs = vec![
            LateFeeConfig::payment_overdue_default(),
            LateFeeConfig::return_overdue_default(),
        ];

        // quote orders never accrue payment fees
        let quote = overdue_order(OrderStatus::Quote, PaymentStatus::Pending, day(10));
        // paid + in_progress accrues a return fee only
        let returning = overdue_order(OrderStatus::InProgress, PaymentStatus::Paid, day(10));
        // not yet due
        let current = overdue_order(OrderStatus::Confirmed, PaymentStatus::Pending, day(25));

        let orders: HashMap<_, _> = [quote, returning, current]
            .into_iter()
            .map(|o| (o.id, o))
            .collect();

        let (summary, _) = AccrualEngine::process(&orders, &mut fees, &configs, day(15));
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(fees.values().next().unwrap().fee_type, FeeType::ReturnOverdue);
    }

    #[test]
    fn test_auto_apply_off_skips() {
        let order = overdue_order(OrderStatus::Confirmed, PaymentStatus::Pending, day(10));
        let orders: HashMap<_, _> = [(order.id, order)].into();
        let mut fees = HashMap::new();
        let mut config = LateFeeConfig::payment_overdue_default();
        config.auto_apply = false;

        let (summary, _) = AccrualEngine::process(&orders, &mut fees, &[config], day(15));
        assert_eq!(summary.created, 0);
        assert!(fees.is_empty());
    }

    #[test]
    fn test_waive_freezes_amount() {
        let order = overdue_order(OrderStatus::Confirmed, PaymentStatus::Pending, day(10));
        let orders: HashMap<_, _> = [(order.id, order)].into();
        let mut fees = HashMap::new();
        let configs = vec![LateFeeConfig::payment_overdue_default()];

        AccrualEngine::process(&orders, &mut fees, &configs, day(15));
        let fee_id = *fees.keys().next().unwrap();

        AccrualEngine::waive(
            fees.get_mut(&fee_id).unwrap(),
            "goodwill".into(),
            "admin-1".into(),
            day(15),
        )
        .unwrap();
        let frozen = fees[&fee_id].current_amount;

        // later runs neither reactivate nor grow the waived fee; a fresh
        // active fee may be created for the still-overdue order
        let (summary, _) = AccrualEngine::process(&orders, &mut fees, &configs, day(20));
        assert_eq!(fees[&fee_id].current_amount, frozen);
        assert_eq!(fees[&fee_id].status, FeeStatus::Waived);
        assert_eq!(summary.updated, 0);

        // waiving twice is an invalid transition
        let err = AccrualEngine::waive(
            fees.get_mut(&fee_id).unwrap(),
            "again".into(),
            "admin-1".into(),
            day(20),
        )
        .unwrap_err();
        assert!(matches!(err, MarketError::InvalidTransition { .. }));
    }

    #[test]
    fn test_mark_paid_is_terminal() {
        let order = overdue_order(OrderStatus::Confirmed, PaymentStatus::Pending, day(10));
        let mut fee = AccrualEngine::custom_fee(
            &order,
            FeeType::Custom,
            Money::from_major(75),
            "broken latch".into(),
            day(11),
        )
        .unwrap();
        assert!(!fee.auto_applied);
        assert_eq!(fee.current_amount, Money::from_major(75));

        AccrualEngine::mark_paid(&mut fee).unwrap();
        assert_eq!(fee.status, FeeStatus::Paid);
        assert!(AccrualEngine::mark_paid(&mut fee).is_err());
    }

    #[test]
    fn test_custom_fee_rejects_non_positive() {
        let order = overdue_order(OrderStatus::Confirmed, PaymentStatus::Pending, day(10));
        assert!(AccrualEngine::custom_fee(
            &order,
            FeeType::Custom,
            Money::ZERO,
            "nothing".into(),
            day(11)
        )
        .is_err());
    }
}
