use crate::domain::model::PostalAggregate;
use crate::utils::error::{EtlError, Result};
use serde::{Serialize, Serializer};

pub const CSV_HEADERS: [&str; 5] = [
    "Postal.Code",
    "Count",
    "Block",
    "OnemapLongitude",
    "OnemapLatitude",
];

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Postal.Code")]
    postal_code: &'a str,
    #[serde(rename = "Count")]
    count: u64,
    #[serde(rename = "Block")]
    block: &'a str,
    #[serde(rename = "OnemapLongitude", serialize_with = "nan_as_empty")]
    longitude: f64,
    #[serde(rename = "OnemapLatitude", serialize_with = "nan_as_empty")]
    latitude: f64,
}

// 未解析的座標輸出為空欄位
fn nan_as_empty<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    if value.is_nan() {
        serializer.serialize_str("")
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Serializes the aggregate table, unresolved rows included.
pub fn write_csv(rows: &[PostalAggregate]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    if rows.is_empty() {
        // serde only emits headers together with the first record
        writer.write_record(CSV_HEADERS)?;
    }

    for row in rows {
        writer.serialize(CsvRow {
            postal_code: &row.postal_code,
            count: row.count,
            block: &row.block,
            longitude: row.longitude,
            latitude: row.latitude,
        })?;
    }

    writer.into_inner().map_err(|e| EtlError::ProcessingError {
        message: format!("Failed to flush CSV output: {}", e),
    })
}
