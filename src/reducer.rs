//! Reducing stage: sums quantity per product and ranks products by volume.
//!
//! Products are held in first-seen order and ranked with a stable sort, so
//! ties keep that order. Both emitted lists are produced from the same
//! ranked sequence and are therefore aligned row by row.

use ahash::AHashMap;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::record::{self, Sale};

/// Per-product totals. Names are the raw bytes of the name column.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub name: Vec<u8>,
    pub total_quantity: i64,
    /// Price of the last row seen for this product.
    pub last_price: f64,
}

/// Aggregates sorted by total quantity, highest first. Index is rank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    entries: Vec<Aggregate>,
}

impl Ranking {
    pub fn entries(&self) -> &[Aggregate] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(name, total_quantity)` rows in rank order.
    pub fn volume_rows(&self) -> impl Iterator<Item = [Vec<u8>; 2]> + '_ {
        self.entries
            .iter()
            .map(|a| [a.name.clone(), a.total_quantity.to_string().into_bytes()])
    }

    /// `(name, last_price)` rows in the same rank order.
    pub fn price_rows(&self) -> impl Iterator<Item = [Vec<u8>; 2]> + '_ {
        self.entries
            .iter()
            .map(|a| [a.name.clone(), record::format_price(a.last_price).into_bytes()])
    }
}

/// Accumulates sales into per-product aggregates, in first-seen order.
#[derive(Debug, Default)]
pub struct Aggregator {
    index: AHashMap<Vec<u8>, usize>,
    aggregates: Vec<Aggregate>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sale: Sale) -> Result<()> {
        match self.index.get(&sale.name) {
            Some(&slot) => {
                let entry = &mut self.aggregates[slot];
                entry.total_quantity = entry
                    .total_quantity
                    .checked_add(sale.quantity)
                    .ok_or_else(|| PipelineError::NumericOverflow {
                        name: String::from_utf8_lossy(&sale.name).into_owned(),
                    })?;
                entry.last_price = sale.price;
            }
            None => {
                self.index.insert(sale.name.clone(), self.aggregates.len());
                self.aggregates.push(Aggregate {
                    name: sale.name,
                    total_quantity: sale.quantity,
                    last_price: sale.price,
                });
            }
        }
        Ok(())
    }

    pub fn aggregates(&self) -> &[Aggregate] {
        &self.aggregates
    }

    pub fn into_ranking(self) -> Ranking {
        let mut entries = self.aggregates;
        // sort_by is stable
        entries.sort_by(|a, b| b.total_quantity.cmp(&a.total_quantity));
        Ranking { entries }
    }
}

/// Aggregates then ranks. Fails only on quantity overflow.
pub fn aggregate_and_rank<I>(sales: I) -> Result<Ranking>
where
    I: IntoIterator<Item = Sale>,
{
    let mut aggregator = Aggregator::new();
    for sale in sales {
        aggregator.add(sale)?;
    }
    Ok(aggregator.into_ranking())
}

/// Output of one reduce pass over a mapped object.
#[derive(Debug)]
pub struct Reduced {
    pub volume: Vec<u8>,
    pub prices: Vec<u8>,
    pub ranking: Ranking,
    pub rows_read: usize,
    pub dropped: usize,
}

pub fn reduce_csv(input: &[u8]) -> Result<Reduced> {
    let rows = record::read_rows(input)?;
    let mut dropped = 0;

    let sales = rows.iter().filter_map(|row| {
        let sale = match (row.get(0), row.get(1), row.get(2)) {
            (Some(name), Some(quantity), Some(price)) => Sale::parse(name, quantity, price),
            _ => None,
        };
        if sale.is_none() {
            debug!(line = record::line_of(row), "dropping malformed mapped row");
            dropped += 1;
        }
        sale
    });
    let ranking = aggregate_and_rank(sales)?;

    Ok(Reduced {
        volume: record::write_rows(ranking.volume_rows())?,
        prices: record::write_rows(ranking.price_rows())?,
        ranking,
        rows_read: rows.len(),
        dropped,
    })
}
