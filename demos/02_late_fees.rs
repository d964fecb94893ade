/// late fees - accrual over controlled time, waiving and settlement
use rental_core::booking::{LineRequest, OrderRequest};
use rental_core::{
    AccrualScheduler, DepositRule, LateFeeConfig, Listing, ListingStatus, MarketConfig,
    Marketplace, Money, PaymentOption, SafeTimeProvider, TimeSource, UnitType, Uuid,
};
use chrono::{Duration, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== late fee example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let market = Marketplace::new(MarketConfig::default());
    market.add_fee_config(LateFeeConfig::payment_overdue_default())?;
    market.add_fee_config(LateFeeConfig::return_overdue_default())?;

    let listing = Listing {
        id: Uuid::new_v4(),
        host_id: "host-1".into(),
        title: "party tent".into(),
        category: "events".into(),
        status: ListingStatus::Active,
        total_quantity: 3,
        unit_type: UnitType::Day,
        base_price: Money::from_major(100),
        deposit_rule: DepositRule::None,
    };
    market.upsert_listing(listing.clone());

    // rent for two days, paid up front, picked up on time
    let start = time.now() + Duration::days(1);
    let order = market.create_order(
        &OrderRequest {
            renter_id: "renter-1".into(),
            lines: vec![LineRequest {
                listing_id: listing.id,
                quantity: 1,
                start,
                end: start + Duration::days(2),
            }],
            payment_option: PaymentOption::Full,
        },
        &time,
    )?;
    market.confirm_payment(order.id, "pay_demo", &time)?;
    market.mark_pickup(order.id, &time)?;
    println!("order due back on {}", start + Duration::days(2));

    // the tent never comes back; run the scheduler day by day
    let mut scheduler = AccrualScheduler::new(Duration::hours(24));
    for day in 1..=6 {
        controller.advance(Duration::days(1));
        if let Some(summary) = scheduler.run_if_due(&market, &time) {
            println!(
                "day {}: processed {}, created {}, updated {}",
                day, summary.processed, summary.created, summary.updated
            );
        }
    }

    let fee = market.fees_for_order(order.id).remove(0);
    println!("\nfee after 6 days: ${} ({} days overdue)",
        fee.current_amount.as_decimal(), fee.days_overdue);
    for calc in &fee.calculations {
        println!("  {} -> ${}", calc.formula, calc.amount.as_decimal());
    }

    // the host forgives it
    let fee = market.waive_late_fee(fee.id, "regular customer", "host-1", &time)?;
    println!("\nwaived by {:?}, amount frozen at ${}",
        fee.waived_by, fee.current_amount.as_decimal());

    // later runs leave the waived fee alone
    controller.advance(Duration::days(2));
    scheduler.run_now(&market, &time);
    let fee = market.fee(fee.id)?;
    println!("after two more days: status {:?}, amount ${}",
        fee.status, fee.current_amount.as_decimal());

    Ok(())
}
