//! Price update stage: raises prices of the best sellers and lowers prices
//! of the worst sellers.
//!
//! Input is the ranked price list written by the reducer. Position in that
//! list is the rank; rows are adjusted in place and written back in the same
//! order.

use tracing::debug;

use crate::error::Result;
use crate::record;

pub const TOP_MULTIPLIER: f64 = 1.10;
pub const BOTTOM_MULTIPLIER: f64 = 0.90;

/// Where a rank falls relative to the decile boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Top,
    Middle,
    Bottom,
}

impl Band {
    /// Band of 0-based `rank` in a list of `len` entries.
    ///
    /// Both boundaries are inclusive against `len / 10`, so the top band
    /// holds `len / 10 + 1` ranks and the bottom band `len / 10`.
    pub fn of(rank: usize, len: usize) -> Self {
        let decile = len / 10;
        if rank <= decile {
            Band::Top
        } else if rank >= len - decile {
            Band::Bottom
        } else {
            Band::Middle
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            Band::Top => TOP_MULTIPLIER,
            Band::Middle => 1.0,
            Band::Bottom => BOTTOM_MULTIPLIER,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedEntry {
    pub name: Vec<u8>,
    pub price: f64,
}

/// Applies the band multiplier for each position. Order is preserved.
pub fn adjust_prices(entries: Vec<PricedEntry>) -> Vec<PricedEntry> {
    let len = entries.len();
    entries
        .into_iter()
        .enumerate()
        .map(|(rank, entry)| match Band::of(rank, len) {
            Band::Middle => entry,
            band => PricedEntry {
                price: entry.price * band.multiplier(),
                ..entry
            },
        })
        .collect()
}

/// Output of one update pass over a ranked price object.
#[derive(Debug)]
pub struct Updated {
    pub body: Vec<u8>,
    pub entries: Vec<PricedEntry>,
    pub rows_read: usize,
    pub dropped: usize,
}

pub fn adjust_prices_csv(input: &[u8]) -> Result<Updated> {
    let rows = record::read_rows(input)?;
    let rows_read = rows.len();
    let mut entries = Vec::with_capacity(rows_read);

    for row in &rows {
        let parsed = match (row.get(0), row.get(1).and_then(record::price_field)) {
            (Some(name), Some(price)) => Some(PricedEntry {
                name: name.to_vec(),
                price,
            }),
            _ => None,
        };
        match parsed {
            Some(entry) => entries.push(entry),
            None => debug!(line = record::line_of(row), "dropping malformed price row"),
        }
    }

    let dropped = rows_read - entries.len();
    let entries = adjust_prices(entries);
    let body = record::write_rows(
        entries
            .iter()
            .map(|e| [e.name.clone(), record::format_price(e.price).into_bytes()]),
    )?;

    Ok(Updated {
        body,
        entries,
        rows_read,
        dropped,
    })
}
