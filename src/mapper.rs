//! Mapping stage: projects cleaned rows down to `(name, quantity, price)`.
//!
//! Fields are copied as raw bytes. Numbers are parsed by the validator and
//! again by the reducer, never here.

use csv::ByteRecord;

use crate::error::Result;
use crate::record::{self, NAME_COLUMN, PRICE_COLUMN, QUANTITY_COLUMN};

/// A projected row, fields kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedRecord {
    pub name: Vec<u8>,
    pub quantity: Vec<u8>,
    pub price: Vec<u8>,
}

impl MappedRecord {
    fn from_row(row: &ByteRecord) -> Self {
        let field = |i: usize| row.get(i).unwrap_or_default().to_vec();
        Self {
            name: field(NAME_COLUMN),
            quantity: field(QUANTITY_COLUMN),
            price: field(PRICE_COLUMN),
        }
    }

    pub fn fields(&self) -> [&[u8]; 3] {
        [&self.name, &self.quantity, &self.price]
    }
}

/// One mapped record per input row, same order.
pub fn project(rows: &[ByteRecord]) -> Vec<MappedRecord> {
    rows.iter().map(MappedRecord::from_row).collect()
}

pub fn project_csv(input: &[u8]) -> Result<(Vec<u8>, Vec<MappedRecord>)> {
    let mapped = project(&record::read_rows(input)?);
    let body = record::write_rows(mapped.iter().map(MappedRecord::fields))?;
    Ok((body, mapped))
}
