use crate::domain::model::Record;
use crate::utils::error::{EtlError, Result};

pub const DEFAULT_LOCATION_COLUMN: &str = "Case Location";

/// ISO-8859-1 maps every byte to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Reads the location column out of a Latin-1 encoded CSV with a header row.
pub fn read_records(bytes: &[u8], location_column: &str) -> Result<Vec<Record>> {
    let text = decode_latin1(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let column = headers
        .iter()
        .position(|header| header.trim() == location_column)
        .ok_or_else(|| EtlError::InputDecodeError {
            message: format!(
                "column '{}' not found (available: {})",
                location_column,
                headers.iter().collect::<Vec<_>>().join(", ")
            ),
        })?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        // 欄位不足的列視為空白地點
        let location = row.get(column).unwrap_or_default();
        records.push(Record::new(location));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_location_column() {
        let csv = b"Case ID,Case Location,Type\n1,BLK123456001,noise\n2,BLK456789002,litter\n";
        let records = read_records(csv, DEFAULT_LOCATION_COLUMN).unwrap();

        assert_eq!(
            records,
            vec![Record::new("BLK123456001"), Record::new("BLK456789002")]
        );
    }

    #[test]
    fn test_decodes_latin1_bytes() {
        // 0xE9 is "é" in ISO-8859-1 and invalid as standalone UTF-8
        let csv = b"Case Location\nCaf\xe9 760221\n";
        let records = read_records(csv, DEFAULT_LOCATION_COLUMN).unwrap();

        assert_eq!(records[0].location, "Café 760221");
    }

    #[test]
    fn test_missing_column_is_input_error() {
        let csv = b"Address\nBLK123456001\n";
        let result = read_records(csv, DEFAULT_LOCATION_COLUMN);

        assert!(matches!(result, Err(EtlError::InputDecodeError { .. })));
    }

    #[test]
    fn test_short_rows_are_kept() {
        let csv = b"Case Location,Case ID,Remarks\nBLK123456001,1,ok\nBLK456789002,2\n";
        let records = read_records(csv, DEFAULT_LOCATION_COLUMN).unwrap();

        assert_eq!(
            records,
            vec![Record::new("BLK123456001"), Record::new("BLK456789002")]
        );
    }

    #[test]
    fn test_row_missing_location_cell_becomes_empty() {
        let csv = b"Case ID,Remarks,Case Location\n1,ok,BLK123456001\n2\n";
        let records = read_records(csv, DEFAULT_LOCATION_COLUMN).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].location, "");
    }

    #[test]
    fn test_empty_location_is_kept() {
        let csv = b"Case ID,Case Location\n1,\n";
        let records = read_records(csv, DEFAULT_LOCATION_COLUMN).unwrap();
        assert_eq!(records, vec![Record::new("")]);
    }
}
