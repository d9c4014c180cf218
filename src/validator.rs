//! Preprocessing stage: drops rows whose quantity or price does not parse.

use csv::ByteRecord;
use tracing::debug;

use crate::error::Result;
use crate::record::{self, PRICE_COLUMN, QUANTITY_COLUMN, RAW_MIN_COLUMNS};

/// Rows kept and dropped by one validation pass.
#[derive(Debug, Default)]
pub struct Validated {
    pub rows: Vec<ByteRecord>,
    pub dropped: usize,
}

/// True when the row carries a parseable quantity and price.
pub fn is_valid(row: &ByteRecord) -> bool {
    if row.len() < RAW_MIN_COLUMNS {
        return false;
    }
    record::quantity_field(&row[QUANTITY_COLUMN]).is_some()
        && record::price_field(&row[PRICE_COLUMN]).is_some()
}

/// Keeps valid rows in their original order, byte for byte.
pub fn validate(rows: Vec<ByteRecord>) -> Validated {
    let mut out = Validated::default();

    for row in rows {
        if is_valid(&row) {
            out.rows.push(row);
        } else {
            debug!(line = record::line_of(&row), "dropping malformed row");
            out.dropped += 1;
        }
    }

    out
}

/// Bytes-in, bytes-out form used by the stage runner.
pub fn validate_csv(input: &[u8]) -> Result<(Vec<u8>, Validated)> {
    let validated = validate(record::read_rows(input)?);
    let body = record::write_rows(validated.rows.iter())?;
    Ok((body, validated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_rows_with_unparseable_numbers() {
        let input = b"a,widget,5,2.50\nb,gizmo,x,3.00\nc,doohickey,2,\n";
        let (body, validated) = validate_csv(input).unwrap();

        assert_eq!(body, b"a,widget,5,2.50\n".to_vec());
        assert_eq!(validated.rows.len(), 1);
        assert_eq!(validated.dropped, 2);
    }

    #[test]
    fn clean_input_passes_through_unchanged() {
        let input = b"1,widget,5,2.5,north\n2,\"gizmo, blue\",0,0.99,south\n3,widget,12,2.5,east\n";
        let (once, _) = validate_csv(input).unwrap();
        assert_eq!(once, input.to_vec());

        let (twice, validated) = validate_csv(&once).unwrap();
        assert_eq!(twice, once);
        assert_eq!(validated.dropped, 0);
    }

    #[test]
    fn short_rows_are_malformed() {
        let (body, validated) = validate_csv(b"1,widget,5\n2,gizmo,1,1.0\n").unwrap();
        assert_eq!(body, b"2,gizmo,1,1.0\n".to_vec());
        assert_eq!(validated.dropped, 1);
    }

    #[test]
    fn negative_and_non_finite_values_are_rejected() {
        let input = b"1,a,-3,1.0\n2,b,3,-1.0\n3,c,3,NaN\n4,d,3,1e3\n";
        let (body, _) = validate_csv(input).unwrap();
        assert_eq!(body, b"4,d,3,1e3\n".to_vec());
    }

    #[test]
    fn non_utf8_text_columns_pass_through() {
        let input = b"1,Widget,5,2.50\n2,Caf\xE9,3,1.00\n3,Gizmo,2,1.00,r\xE9gion\n";
        let (body, validated) = validate_csv(input).unwrap();

        assert_eq!(body, input.to_vec());
        assert_eq!(validated.rows.len(), 3);
        assert_eq!(validated.dropped, 0);
    }

    #[test]
    fn non_utf8_numbers_are_malformed() {
        let input = b"1,Widget,5\xB2,2.50\n2,Gizmo,3,1.0\xA0\n3,Bolt,1,1\n";
        let (body, validated) = validate_csv(input).unwrap();

        assert_eq!(body, b"3,Bolt,1,1\n".to_vec());
        assert_eq!(validated.dropped, 2);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let (body, validated) = validate_csv(b"").unwrap();
        assert!(body.is_empty());
        assert_eq!(validated.dropped, 0);
    }
}
