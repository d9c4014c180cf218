//! Row model and CSV wire format shared by every stage.
//!
//! Objects exchanged between stages are headerless, comma-separated,
//! newline-terminated CSV. Rows are decoded as raw bytes: only `quantity` and
//! `price` must be UTF-8, every other field (the product name included) is
//! carried through as-is.

use csv::{ByteRecord, ReaderBuilder, Terminator, WriterBuilder};

use crate::error::{PipelineError, Result};

/// Position of the product name in a raw or cleaned row.
pub const NAME_COLUMN: usize = 1;
/// Position of the sold quantity in a raw or cleaned row.
pub const QUANTITY_COLUMN: usize = 2;
/// Position of the unit price in a raw or cleaned row.
pub const PRICE_COLUMN: usize = 3;
/// A raw row must reach at least the price column.
pub const RAW_MIN_COLUMNS: usize = PRICE_COLUMN + 1;

/// Significant digits used when rendering prices.
pub const PRICE_DIGITS: usize = 8;

/// One `(name, quantity, price)` row after numeric parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Sale {
    pub name: Vec<u8>,
    pub quantity: i64,
    pub price: f64,
}

impl Sale {
    /// Parses the three fields, `None` when either number is malformed.
    pub fn parse(name: &[u8], quantity: &[u8], price: &[u8]) -> Option<Self> {
        Some(Self {
            name: name.to_vec(),
            quantity: quantity_field(quantity)?,
            price: price_field(price)?,
        })
    }
}

/// [`parse_quantity`] over a raw field; non-UTF-8 bytes are malformed.
pub fn quantity_field(bytes: &[u8]) -> Option<i64> {
    std::str::from_utf8(bytes).ok().and_then(parse_quantity)
}

/// [`parse_price`] over a raw field; non-UTF-8 bytes are malformed.
pub fn price_field(bytes: &[u8]) -> Option<f64> {
    std::str::from_utf8(bytes).ok().and_then(parse_price)
}

/// Base-10 signed 64-bit integer, rejected when negative.
pub fn parse_quantity(text: &str) -> Option<i64> {
    text.parse::<i64>().ok().filter(|q| *q >= 0)
}

/// Decimal price, rejected when negative, infinite or NaN.
pub fn parse_price(text: &str) -> Option<f64> {
    text.parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p >= 0.0)
}

/// Renders a price in general format with [`PRICE_DIGITS`] significant
/// digits: fixed notation for exponents in `-4..8`, scientific otherwise,
/// trailing zeros removed.
pub fn format_price(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let scientific = format!("{:.*e}", PRICE_DIGITS - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= PRICE_DIGITS as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (PRICE_DIGITS as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Decodes a whole object into rows. Rows may have differing widths.
pub fn read_rows(bytes: &[u8]) -> Result<Vec<ByteRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    reader
        .byte_records()
        .map(|row| row.map_err(PipelineError::from))
        .collect()
}

/// Encodes rows into a single object body.
pub fn write_rows<I, R, F>(rows: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = F>,
    F: AsRef<[u8]>,
{
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in rows {
        writer.write_record(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| PipelineError::Io(e.into_error()))
}

/// 1-based line of a decoded row, for log messages.
pub fn line_of(row: &ByteRecord) -> u64 {
    row.position().map(|p| p.line()).unwrap_or(0)
}
