/// quick start - book a listing and confirm payment
use rental_core::booking::{LineRequest, OrderRequest};
use rental_core::{
    DepositRule, Listing, ListingStatus, MarketConfig, Marketplace, Money, PaymentOption,
    SafeTimeProvider, TimeSource, UnitType, Uuid,
};
use chrono::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let market = Marketplace::new(MarketConfig::default());
    let time = SafeTimeProvider::new(TimeSource::System);

    // list a generator, 2 units at $50/day with a flat $10 deposit
    let listing = Listing {
        id: Uuid::new_v4(),
        host_id: "host-1".into(),
        title: "3kW generator".into(),
        category: "tools".into(),
        status: ListingStatus::Active,
        total_quantity: 2,
        unit_type: UnitType::Day,
        base_price: Money::from_major(50),
        deposit_rule: DepositRule::Flat(Money::from_major(10)),
    };
    market.upsert_listing(listing.clone());

    // book one unit for two days
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
    println!("order {} total: ${}", order.id, order.total_amount.as_decimal());

    // payment confirmed by the gateway webhook
    let order = market.confirm_payment(order.id, "pay_demo", &time)?;
    println!("status: {:?}", order.order_status);
    println!("host balance: ${}", market.host_balance("host-1").as_decimal());

    Ok(())
}
