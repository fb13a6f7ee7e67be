//! Request field parsing for the upload and view endpoints.

use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_file_extension, validate_name_component, validate_required_field,
};
use std::collections::HashMap;
use std::path::Path;

/// Decodes `application/x-www-form-urlencoded` data (query string or body).
pub fn parse_form(input: &[u8]) -> HashMap<String, String> {
    url::form_urlencoded::parse(input)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

fn required(fields: &HashMap<String, String>, name: &str) -> Result<String> {
    let value = fields.get(name).cloned();
    validate_required_field(name, &value).cloned()
}

/// Identifies a generated report: `{prefix}_{case_type}_{year}_{month}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportKey {
    pub prefix: String,
    pub case_type: String,
    pub year: String,
    pub month: String,
}

impl ReportKey {
    pub fn new(prefix: String, case_type: String, year: String, month: String) -> Result<Self> {
        validate_name_component("prefix", &prefix)?;
        validate_name_component("case_type", &case_type)?;
        validate_name_component("year", &year)?;
        validate_name_component("month", &month)?;
        Ok(Self {
            prefix,
            case_type,
            year,
            month,
        })
    }

    pub fn file_stem(&self) -> String {
        format!("{}_{}_{}_{}", self.prefix, self.case_type, self.year, self.month)
    }

    pub fn csv_name(&self) -> String {
        format!("{}.csv", self.file_stem())
    }

    pub fn html_name(&self) -> String {
        format!("{}.html", self.file_stem())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadForm {
    pub file_name: String,
    pub key: ReportKey,
    pub min_count: i64,
}

impl UploadForm {
    pub fn from_fields(fields: &HashMap<String, String>, allowed_extensions: &[String]) -> Result<Self> {
        let raw_name = required(fields, "file_name")?;
        if raw_name.trim().is_empty() {
            return Err(EtlError::InvalidConfigValueError {
                field: "file_name".to_string(),
                value: raw_name,
                reason: "No selected file".to_string(),
            });
        }

        // 只保留檔名，避免寫出上傳目錄
        let file_name = Path::new(&raw_name)
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| EtlError::InvalidConfigValueError {
                field: "file_name".to_string(),
                value: raw_name.clone(),
                reason: "Invalid file name".to_string(),
            })?;
        validate_file_extension("file_name", &file_name, allowed_extensions)?;

        let key = ReportKey::new(
            required(fields, "prefix")?,
            required(fields, "case_type")?,
            required(fields, "year")?,
            required(fields, "month")?,
        )?;

        let raw_min_count = required(fields, "min_count")?;
        let min_count = raw_min_count
            .trim()
            .parse::<i64>()
            .map_err(|e| EtlError::InvalidConfigValueError {
                field: "min_count".to_string(),
                value: raw_min_count.clone(),
                reason: format!("Must be an integer: {}", e),
            })?;

        Ok(Self {
            file_name,
            key,
            min_count,
        })
    }
}

/// Field names follow the view form of the upload page.
pub fn view_key_from_fields(fields: &HashMap<String, String>) -> Result<ReportKey> {
    ReportKey::new(
        required(fields, "existing_prefix")?,
        required(fields, "case_type_view")?,
        required(fields, "existing_year")?,
        required(fields, "existing_month")?,
    )
}
