//! Synthetic raw sales datasets, for trying the pipeline against a fresh
//! bucket.
//!
//! Rows look like `order_id,product,quantity,price,region`. A configurable
//! share of rows carries a broken quantity or price so the preprocessing
//! stage has something to drop.

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::error::Result;
use crate::record;

const PRODUCTS: &[&str] = &[
    "Widget",
    "Gizmo",
    "Doohickey",
    "Sprocket",
    "Gadget, Deluxe",
    "Thingamajig",
    "Whatsit",
    "Contraption",
    "Flux Capacitor",
    "Sonic Screwdriver",
    "Bolt",
    "Nut",
];

const REGIONS: &[&str] = &["north", "south", "east", "west"];

const BAD_QUANTITIES: &[&str] = &["", "n/a", "-3", "4.5", "lots"];
const BAD_PRICES: &[&str] = &["", "free", "-1.00", "NaN", "$9.99"];

#[derive(Debug, Clone, Copy)]
pub struct DatasetSpec {
    pub rows: usize,
    /// Probability in `0.0..=1.0` that a row gets a broken numeric field.
    pub malformed_ratio: f64,
}

impl Default for DatasetSpec {
    fn default() -> Self {
        Self {
            rows: 1_000,
            malformed_ratio: 0.05,
        }
    }
}

/// Builds the CSV body of a raw dataset.
pub fn generate_dataset<R: Rng + ?Sized>(spec: DatasetSpec, rng: &mut R) -> Result<Vec<u8>> {
    let ratio = if spec.malformed_ratio.is_nan() {
        0.0
    } else {
        spec.malformed_ratio.clamp(0.0, 1.0)
    };
    let mut rows = Vec::with_capacity(spec.rows);

    for i in 0..spec.rows {
        let product = PRODUCTS.choose(rng).copied().unwrap_or("Widget");
        let region = REGIONS.choose(rng).copied().unwrap_or("north");

        let mut quantity = rng.random_range(1..=50).to_string();
        let mut price = format!("{:.2}", rng.random_range(0.5..250.0));

        if rng.random_bool(ratio) {
            if rng.random_bool(0.5) {
                quantity = BAD_QUANTITIES.choose(rng).copied().unwrap_or("").to_string();
            } else {
                price = BAD_PRICES.choose(rng).copied().unwrap_or("").to_string();
            }
        }

        rows.push([
            format!("{}", 100_000 + i),
            product.to_string(),
            quantity,
            price,
            region.to_string(),
        ]);
    }

    record::write_rows(rows)
}
