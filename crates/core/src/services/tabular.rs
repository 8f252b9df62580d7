//! Tabular file parsing for bulk uploads.
//!
//! Turns a CSV or Excel file into uniform string rows keyed by normalized
//! header names, so the row processor never cares which format the file
//! arrived in.

use std::collections::HashMap;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use catalog_common::{AppError, AppResult};

/// One data row: normalized header -> trimmed cell value.
pub type RawRow = HashMap<String, String>;

/// Parse a tabular file into rows.
///
/// The original file name decides the parser: `.csv` goes through the csv
/// crate, `.xlsx`/`.xls` through calamine (first worksheet only). Any
/// malformed input fails the whole parse; a file with only a header row
/// yields an empty vec.
pub fn parse_rows(path: &Path, original_name: &str) -> AppResult<Vec<RawRow>> {
    match file_extension(original_name).as_deref() {
        Some("csv") => parse_csv(path),
        Some("xlsx" | "xls") => parse_workbook(path),
        _ => Err(AppError::BadRequest(format!(
            "Unsupported file extension for {original_name}"
        ))),
    }
}

/// Lowercased extension of a file name, if it has one.
pub(crate) fn file_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

fn parse_csv(path: &Path) -> AppResult<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AppError::BadRequest(format!("Failed to read CSV file: {e}")))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::BadRequest(format!("Failed to parse CSV file: {e}")))?
        .iter()
        .map(normalize_header)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| AppError::BadRequest(format!("Failed to parse CSV file: {e}")))?;

        // Short records leave trailing columns empty; extra cells are dropped.
        let mut row = RawRow::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            row.insert(header.clone(), record.get(i).unwrap_or("").to_string());
        }
        rows.push(row);
    }

    Ok(rows)
}

fn parse_workbook(path: &Path) -> AppResult<Vec<RawRow>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AppError::BadRequest(format!("Failed to read Excel file: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::BadRequest("Excel file contains no worksheets".to_string()))?
        .map_err(|e| AppError::BadRequest(format!("Failed to parse Excel file: {e}")))?;

    let mut sheet_rows = range.rows();
    let Some(header_row) = sheet_rows.next() else {
        return Ok(Vec::new());
    };

    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| normalize_header(&cell_to_string(cell)))
        .collect();

    let mut rows = Vec::new();
    for sheet_row in sheet_rows {
        let mut row = RawRow::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let value = sheet_row.get(i).map(cell_to_string).unwrap_or_default();
            row.insert(header.clone(), value);
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Normalize a header: trim, split camelCase, lowercase, spaces to
/// underscores.
///
/// `Category Name`, `categoryName` and `CATEGORY_NAME` all map to
/// `category_name`.
fn normalize_header(header: &str) -> String {
    let mut normalized = String::with_capacity(header.len() + 2);
    let mut prev = '_';
    for c in header.trim().chars() {
        if c.is_uppercase() && prev.is_lowercase() {
            normalized.push('_');
        }
        normalized.push(if c == ' ' { '_' } else { c });
        prev = c;
    }
    normalized.to_lowercase()
}

/// Stringify a cell. Whole numbers never carry a trailing `.0`.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn write_temp(name: &str, contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header(" Category Name "), "category_name");
        assert_eq!(normalize_header("categoryName"), "category_name");
        assert_eq!(normalize_header("categoryId"), "category_id");
        assert_eq!(normalize_header("CATEGORY_NAME"), "category_name");
        assert_eq!(normalize_header("PRICE"), "price");
        assert_eq!(normalize_header("name"), "name");
    }

    #[test]
    fn test_parse_csv_normalizes_headers_and_trims_cells() {
        let (_dir, path) = write_temp(
            "products.csv",
            b"Name, Price ,Category Name\n Widget ,9.99, Electronics \n",
        );

        let rows = parse_rows(&path, "products.csv").unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name").map(String::as_str), Some("Widget"));
        assert_eq!(rows[0].get("price").map(String::as_str), Some("9.99"));
        assert_eq!(
            rows[0].get("category_name").map(String::as_str),
            Some("Electronics")
        );
    }

    #[test]
    fn test_parse_csv_short_records_fill_empty() {
        let (_dir, path) = write_temp(
            "products.csv",
            b"name,price,category_id\nWidget,9.99\nGadget,1.50,cat1\n",
        );

        let rows = parse_rows(&path, "products.csv").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("category_id").map(String::as_str), Some(""));
        assert_eq!(rows[1].get("category_id").map(String::as_str), Some("cat1"));
    }

    #[test]
    fn test_parse_csv_header_only_is_empty() {
        let (_dir, path) = write_temp("products.csv", b"name,price,category_id\n");

        let rows = parse_rows(&path, "products.csv").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_parse_csv_invalid_utf8_fails_whole_parse() {
        let (_dir, path) = write_temp(
            "products.csv",
            b"name,price\nWid\xFF\xFEget,9.99\nGadget,1.50\n",
        );

        let err = parse_rows(&path, "products.csv").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_parse_rejects_unsupported_extension() {
        let (_dir, path) = write_temp("products.txt", b"name,price\n");

        let err = parse_rows(&path, "products.txt").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_parse_xlsx_first_worksheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.xlsx");

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "Name").unwrap();
        worksheet.write_string(0, 1, "Price").unwrap();
        worksheet.write_string(0, 2, "Category Name").unwrap();
        worksheet.write_string(1, 0, "Widget").unwrap();
        worksheet.write_number(1, 1, 19.0).unwrap();
        worksheet.write_string(1, 2, "Electronics").unwrap();
        worksheet.write_string(2, 0, "Gadget").unwrap();
        worksheet.write_number(2, 1, 2.5).unwrap();
        worksheet.write_string(2, 2, "Electronics").unwrap();
        workbook.save(&path).unwrap();

        let rows = parse_rows(&path, "products.xlsx").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name").map(String::as_str), Some("Widget"));
        // Whole numbers come back without a trailing .0
        assert_eq!(rows[0].get("price").map(String::as_str), Some("19"));
        assert_eq!(rows[1].get("price").map(String::as_str), Some("2.5"));
        assert_eq!(
            rows[1].get("category_name").map(String::as_str),
            Some("Electronics")
        );
    }

    #[test]
    fn test_parse_xlsx_header_only_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.xlsx");

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "name").unwrap();
        worksheet.write_string(0, 1, "price").unwrap();
        workbook.save(&path).unwrap();

        let rows = parse_rows(&path, "products.xlsx").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("products.CSV").as_deref(), Some("csv"));
        assert_eq!(file_extension("report.v2.xlsx").as_deref(), Some("xlsx"));
        assert_eq!(file_extension("noext"), None);
    }
}
