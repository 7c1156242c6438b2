//! Country-partitioned xlsx output

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use rust_xlsxwriter::{Workbook, XlsxError};
use thiserror::Error;
use tracing::info;

use crate::sheet_name::SheetNameRegistry;
use crate::types::{header_row, Field, Record};

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("failed to write workbook: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("failed to prepare output directory: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSummary {
    pub name: String,
    pub country: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub sheets: Vec<SheetSummary>,
    /// Records dropped because their Job ID was already applied to
    pub excluded: usize,
}

impl WriteSummary {
    pub fn rows(&self) -> usize {
        self.sheets.iter().map(|s| s.rows).sum()
    }
}

/// Records whose Job ID is not in `applied`, plus the number dropped
pub fn exclude_applied<'r>(
    records: &'r [Record],
    applied: &HashSet<String>,
) -> (Vec<&'r Record>, usize) {
    let mut kept = Vec::with_capacity(records.len());
    let mut excluded = 0;
    for record in records {
        if applied.contains(&record.job_id) {
            info!("Excluding applied job ID: {}", record.job_id);
            excluded += 1;
        } else {
            kept.push(record);
        }
    }
    (kept, excluded)
}

/// Group by country, countries in order of first appearance
pub fn partition_by_country<'r>(
    records: impl IntoIterator<Item = &'r Record>,
) -> IndexMap<String, Vec<&'r Record>> {
    let mut partitions: IndexMap<String, Vec<&Record>> = IndexMap::new();
    for record in records {
        partitions
            .entry(record.country_or_unknown().to_string())
            .or_default()
            .push(record);
    }
    partitions
}

/// Write one sheet per country to `path`, replacing any existing file
pub fn write_workbook(
    records: &[Record],
    applied: &HashSet<String>,
    path: &Path,
) -> Result<WriteSummary, WorkbookError> {
    let (kept, excluded) = exclude_applied(records, applied);
    let partitions = partition_by_country(kept);

    let mut workbook = Workbook::new();
    let mut registry = SheetNameRegistry::new();
    let mut sheets = Vec::with_capacity(partitions.len());

    for (country, rows) in &partitions {
        let name = registry.assign(country);
        let sheet = workbook.add_worksheet();
        sheet.set_name(&name)?;

        for (col, header) in header_row().into_iter().enumerate() {
            sheet.write_string(0, col as u16, header)?;
        }
        for (i, record) in rows.iter().enumerate() {
            let row = i as u32 + 1;
            for (col, field) in Field::ALL.iter().enumerate() {
                let value = match field {
                    Field::Country => country.as_str(),
                    _ => record.get(*field),
                };
                sheet.write_string(row, col as u16, value)?;
            }
        }

        info!("Sheet '{}': {} rows", name, rows.len());
        sheets.push(SheetSummary {
            name,
            country: country.clone(),
            rows: rows.len(),
        });
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    workbook.save(path)?;

    Ok(WriteSummary { sheets, excluded })
}
