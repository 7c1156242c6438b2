//! Job IDs already applied to, read from a previously saved sheet

use std::collections::HashSet;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use thiserror::Error;
use tracing::{error, info};

/// Header of the identifier column
pub const JOB_ID_HEADER: &str = "Job ID";

#[derive(Debug, Error)]
pub enum AppliedError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("failed to read csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("workbook has no sheets")]
    NoSheets,
    #[error("'Job ID' column not found")]
    MissingColumn,
}

/// Applied IDs at `path`; any failure is logged and yields an empty set
pub fn load_applied_ids(path: &Path) -> HashSet<String> {
    match read_applied_ids(path) {
        Ok(ids) => {
            info!("Loaded {} applied job IDs from {}", ids.len(), path.display());
            ids
        }
        Err(e) => {
            error!("Error loading applied jobs from {}: {}", path.display(), e);
            HashSet::new()
        }
    }
}

pub fn read_applied_ids(path: &Path) -> Result<HashSet<String>, AppliedError> {
    if !path.exists() {
        return Err(AppliedError::NotFound(path.display().to_string()));
    }

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        read_csv(path)
    } else {
        read_workbook(path)
    }
}

fn read_workbook(path: &Path) -> Result<HashSet<String>, AppliedError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(AppliedError::NoSheets)??;

    let mut rows = range.rows();
    let header = rows.next().ok_or(AppliedError::MissingColumn)?;
    let column = header
        .iter()
        .position(|cell| matches!(cell, Data::String(s) if s == JOB_ID_HEADER))
        .ok_or(AppliedError::MissingColumn)?;

    Ok(rows
        .filter_map(|row| row.get(column))
        .map(cell_text)
        .filter(|id| !id.is_empty())
        .collect())
}

fn read_csv(path: &Path) -> Result<HashSet<String>, AppliedError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let column = reader
        .headers()?
        .iter()
        .position(|h| h == JOB_ID_HEADER)
        .ok_or(AppliedError::MissingColumn)?;

    let mut ids = HashSet::new();
    for row in reader.records() {
        let row = row?;
        if let Some(id) = row.get(column).map(str::trim).filter(|id| !id.is_empty()) {
            ids.insert(id.to_string());
        }
    }
    Ok(ids)
}

/// Cell as an ID string; whole floats drop their ".0"
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", *f as i64)
        }
        other => other.to_string().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use std::fs;

    #[test]
    fn test_csv_ids_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("applied.csv");
        fs::write(&path, "Title,Job ID\nIntern,12345\nOther, 67890 \nBlank,\n").unwrap();

        let ids = load_applied_ids(&path);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("12345"));
        assert!(ids.contains("67890"));
    }

    #[test]
    fn test_csv_ragged_rows_still_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("applied.csv");
        fs::write(&path, "Title,Job ID,Notes\nIntern,12345\nOther,67890,late,extra\nShort\n").unwrap();

        let ids = read_applied_ids(&path).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("12345"));
        assert!(ids.contains("67890"));
    }

    #[test]
    fn test_missing_column_yields_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("applied.csv");
        fs::write(&path, "Title,JobID\nIntern,12345\n").unwrap();

        assert!(matches!(
            read_applied_ids(&path),
            Err(AppliedError::MissingColumn)
        ));
        assert!(load_applied_ids(&path).is_empty());
    }

    #[test]
    fn test_missing_file_yields_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("applied_intern.xlsx");
        assert!(matches!(
            read_applied_ids(&path),
            Err(AppliedError::NotFound(_))
        ));
        assert!(load_applied_ids(&path).is_empty());
    }

    #[test]
    fn test_xlsx_numeric_and_text_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("applied_intern.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Title").unwrap();
        sheet.write_string(0, 1, "Job ID").unwrap();
        sheet.write_string(1, 0, "Intern").unwrap();
        sheet.write_number(1, 1, 12345.0).unwrap();
        sheet.write_string(2, 1, " 67890 ").unwrap();
        sheet.write_string(3, 0, "no id").unwrap();
        workbook.save(&path).unwrap();

        let ids = read_applied_ids(&path).unwrap();
        let mut ids: Vec<_> = ids.into_iter().collect();
        ids.sort();
        assert_eq!(ids, vec!["12345", "67890"]);
    }

    #[test]
    fn test_cell_text_formats() {
        assert_eq!(cell_text(&Data::Float(12345.0)), "12345");
        assert_eq!(cell_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::Empty), "");
    }
}
