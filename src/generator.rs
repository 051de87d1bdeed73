//! Synthetic Order Generator
//!
//! Produces random, well-formed orders for the demo publisher and for load
//! tests. Not used on the serving path.

use chrono::{SubsecRound, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::json;

use crate::models::Order;

fn random_string(rng: &mut impl Rng, len: usize) -> String {
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

fn random_phone(rng: &mut impl Rng) -> String {
    let digits: String = (0..10)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect();
    format!("+{}", digits)
}

fn random_delivery(rng: &mut impl Rng) -> serde_json::Value {
    json!({
        "name": format!("{} {}", random_string(rng, 10), random_string(rng, 10)),
        "phone": random_phone(rng),
        "zip": rng.random_range(0..1_000_000u32).to_string(),
        "city": random_string(rng, 10),
        "address": format!("{} {}", random_string(rng, 10), rng.random_range(0..100u32)),
        "region": random_string(rng, 10),
        "email": format!("{}@gmail.com", random_string(rng, 10)),
    })
}

fn random_payment(rng: &mut impl Rng) -> serde_json::Value {
    let delivery_cost: i64 = rng.random_range(0..2_000);
    let goods_total: i64 = rng.random_range(1..10_000);
    json!({
        "transaction": random_string(rng, 20),
        "request_id": "",
        "currency": "USD",
        "provider": "wbpay",
        "amount": delivery_cost + goods_total,
        "payment_dt": Utc::now().timestamp(),
        "bank": random_string(rng, 6),
        "delivery_cost": delivery_cost,
        "goods_total": goods_total,
        "custom_fee": 0,
    })
}

fn random_items(rng: &mut impl Rng, track_number: &str) -> serde_json::Value {
    let count: usize = rng.random_range(1..=5);
    let items: Vec<_> = (0..count)
        .map(|_| {
            let price: i64 = rng.random_range(1..5_000);
            let sale: i64 = rng.random_range(0..50);
            json!({
                "chrt_id": rng.random_range(1..10_000_000u32),
                "track_number": track_number,
                "price": price,
                "rid": random_string(rng, 20),
                "name": random_string(rng, 12),
                "sale": sale,
                "size": "0",
                "total_price": price * (100 - sale) / 100,
                "nm_id": rng.random_range(1..10_000_000u32),
                "brand": random_string(rng, 8),
                "status": 202,
            })
        })
        .collect();
    serde_json::Value::Array(items)
}

/// Generates a random, valid order.
pub fn random_order() -> Order {
    let mut rng = rand::rng();
    let track_number = random_string(&mut rng, 12);

    Order {
        id: random_string(&mut rng, 19),
        entry: random_string(&mut rng, 4),
        delivery: random_delivery(&mut rng).to_string(),
        payment: random_payment(&mut rng).to_string(),
        items: random_items(&mut rng, &track_number).to_string(),
        track_number,
        locale: "en".to_string(),
        internal_signature: random_string(&mut rng, 20),
        customer_id: random_string(&mut rng, 8),
        delivery_service: random_string(&mut rng, 10),
        shard_key: rng.random_range(0..10u8).to_string(),
        sm_id: rng.random_range(0..100i32),
        date_created: Utc::now().trunc_subsecs(6),
        oof_shard: rng.random_range(0..10u8).to_string(),
    }
}

/// Generates a random order serialized the way producers publish it.
pub fn random_order_json() -> String {
    serde_json::to_string_pretty(&random_order()).unwrap_or_default()
}
