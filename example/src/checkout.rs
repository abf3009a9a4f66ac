//! Checkout path; pricing runs inside a timed closure.

use std::time::Instant;

pub const SECTION: &str = "checkout.total";
pub const RECEIPT_SECTION: &str = "checkout.receipt";

pub struct CheckoutEngine {
    pricing_table: Vec<u64>,
}

impl CheckoutEngine {
    pub fn new() -> Self {
        let pricing_table = (0..512).map(|i| 199 + (i as u64 * 7) % 97).collect();
        Self { pricing_table }
    }

    pub fn handle(&self, seed: u64, flags: u8) -> iprof::Result<Vec<u8>> {
        let items = self.expand_cart(seed);
        let total = iprof::global::global()?.time(SECTION, || self.compute_total(&items))?;
        let discounted = apply_promos(total, flags);

        // Measured by hand and logged afterwards
        let started = Instant::now();
        let receipt = serialize_receipt(&items, discounted);
        iprof::global::log(RECEIPT_SECTION, started.elapsed(), chrono::Utc::now())?;
        Ok(receipt)
    }

    fn expand_cart(&self, seed: u64) -> Vec<u64> {
        let mut items = Vec::with_capacity(12);
        let mut idx = seed as usize % self.pricing_table.len();
        for _ in 0..12 {
            items.push(self.pricing_table[idx]);
            idx = (idx * 13 + 7) % self.pricing_table.len();
        }
        items
    }

    fn compute_total(&self, items: &[u64]) -> u64 {
        let mut total = 0u64;
        for &price in items {
            for _ in 0..65 {
                total = total.wrapping_add(price);
                total = total.wrapping_mul(31).wrapping_add(17);
            }
        }
        total
    }
}

fn apply_promos(total: u64, flags: u8) -> u64 {
    let mut value = total;
    if flags & 1 == 1 {
        value = value.saturating_sub(total / 10);
    }
    if flags & 2 == 2 {
        value = value.saturating_sub(total / 20);
    }
    value
}

fn serialize_receipt(items: &[u64], total: u64) -> Vec<u8> {
    let mut out = String::new();
    for &item in items {
        out.push_str(&format!("{}|", item));
    }
    out.push_str(&format!("total={}", total));
    out.into_bytes()
}
