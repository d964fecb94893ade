/// booking lifecycle - availability, pickup, return and cancellation
use rental_core::booking::{LineRequest, OrderRequest};
use rental_core::{
    DepositRule, Listing, ListingStatus, MarketConfig, Marketplace, MockGateway, Money,
    PaymentGateway, PaymentOption, SafeTimeProvider, TimeSource, UnitType, Uuid,
};
use chrono::{Duration, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== booking lifecycle example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
    ));
    let market = Marketplace::new(MarketConfig::default());
    let gateway = MockGateway::new();

    let listing = Listing {
        id: Uuid::new_v4(),
        host_id: "host-1".into(),
        title: "dslr camera kit".into(),
        category: "cameras".into(),
        status: ListingStatus::Active,
        total_quantity: 1,
        unit_type: UnitType::Day,
        base_price: Money::from_major(80),
        deposit_rule: DepositRule::Percent(rust_decimal_macros::dec!(20)),
    };
    market.upsert_listing(listing.clone());

    let start = time.now() + Duration::days(1);
    let end = start + Duration::days(3);

    // check before booking
    let availability = market.check_availability(listing.id, start, end, 1, &time)?;
    println!("available: {} ({} of {} units free)",
        availability.available, availability.available_qty, availability.total_qty);

    // book it
    let order = market.create_order(
        &OrderRequest {
            renter_id: "renter-1".into(),
            lines: vec![LineRequest { listing_id: listing.id, quantity: 1, start, end }],
            payment_option: PaymentOption::Full,
        },
        &time,
    )?;
    println!("\norder created: subtotal ${}, deposit ${}, commission ${}",
        order.subtotal.as_decimal(),
        order.deposit_amount.as_decimal(),
        order.platform_commission.as_decimal());

    // the same window is now fully reserved
    let availability = market.check_availability(listing.id, start, end, 1, &time)?;
    println!("after booking, available: {}", availability.available);

    // checkout and confirm through the gateway
    let session = market.create_checkout(order.id, &gateway, &time)?;
    let confirmation = gateway.confirm(&session)?;
    let order = market.confirm_payment(order.id, &confirmation.payment_ref, &time)?;
    println!("\npaid, status: {:?}", order.order_status);

    // hand over and take back
    let order = market.mark_pickup(order.id, &time)?;
    println!("picked up, status: {:?}", order.order_status);
    let order = market.mark_return(order.id, Vec::new(), &time)?;
    println!("returned clean, status: {:?}", order.order_status);

    // a second booking: this one gets cancelled after payment
    let start = end + Duration::days(1);
    let order = market.create_order(
        &OrderRequest {
            renter_id: "renter-2".into(),
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
    market.confirm_payment(order.id, "pay_demo_2", &time)?;
    println!("\nhost balance after second payment: ${}",
        market.host_balance("host-1").as_decimal());

    let order = market.cancel_order(order.id, "renter changed plans", &time)?;
    println!("cancelled, payment status: {:?}", order.payment_status);
    println!("host balance after reversal: ${}", market.host_balance("host-1").as_decimal());

    // capacity freed immediately
    let availability = market.check_availability(
        listing.id, start, start + Duration::days(2), 1, &time)?;
    println!("window free again: {}", availability.available);

    Ok(())
}
