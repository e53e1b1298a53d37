//! Store workbook encoding
//!
//! One sheet named `RSVP`, a header row of [`COLUMNS`], one row per guest.
//! Columns are located by header name on read, so a sheet edited by hand with
//! reordered or extra columns still loads.

use std::io::Cursor;

use calamine::{DataType, Reader, Xlsx};
use rust_xlsxwriter::Workbook;

use super::row::{PersistedGuestRow, COLUMNS};
use super::StoreError;

/// Name of the single sheet
pub const SHEET_NAME: &str = "RSVP";

/// Excel's row ceiling, header included
const MAX_SHEET_ROWS: usize = 1_048_576;

/// Decode every guest row from workbook bytes
pub fn decode_rows(bytes: &[u8]) -> Result<Vec<PersistedGuestRow>, StoreError> {
    let mut workbook = Xlsx::new(Cursor::new(bytes))?;

    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Ok(Vec::new());
    };

    let range = match workbook.worksheet_range(&sheet_name) {
        Some(Ok(range)) => range,
        Some(Err(e)) => return Err(e.into()),
        None => return Ok(Vec::new()),
    };

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header.iter().map(|c| cell_text(c).trim().to_string()).collect();

    Ok(rows
        .filter(|cells| cells.iter().any(|c| !matches!(c, DataType::Empty)))
        .map(|cells| {
            let mut row = PersistedGuestRow::default();
            for (header, cell) in headers.iter().zip(cells.iter()) {
                row.set_text(header, cell_text(cell));
            }
            row
        })
        .collect())
}

/// Encode guest rows into workbook bytes
pub fn encode_rows(rows: &[PersistedGuestRow]) -> Result<Vec<u8>, StoreError> {
    if rows.len() + 1 > MAX_SHEET_ROWS {
        return Err(StoreError::Full(rows.len()));
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, name) in COLUMNS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *name)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let row_num = (i + 1) as u32;
        for (col, name) in COLUMNS.iter().enumerate() {
            let col = col as u16;
            if *name == "guest_index" {
                worksheet.write_number(row_num, col, row.guest_index)?;
                continue;
            }
            let text = row.text(name);
            if !text.is_empty() {
                worksheet.write_string(row_num, col, text)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn cell_text(cell: &DataType) -> String {
    match cell {
        DataType::Empty => String::new(),
        DataType::String(s) => s.clone(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(index: u32, passport: bool) -> PersistedGuestRow {
        PersistedGuestRow {
            guest_id: format!("a@b.com_{}", index),
            main_email: "a@b.com".to_string(),
            guest_index: index,
            first_name: "Dana".to_string(),
            last_name: "Levi".to_string(),
            allergies: "nuts, soy".to_string(),
            passport,
            ..Default::default()
        }
    }

    #[test]
    fn test_encode_then_decode_preserves_rows() {
        let rows = vec![row(1, true), row(2, false)];
        let bytes = encode_rows(&rows).unwrap();
        assert_eq!(decode_rows(&bytes).unwrap(), rows);
    }

    #[test]
    fn test_empty_store_has_header_only() {
        let bytes = encode_rows(&[]).unwrap();
        assert!(decode_rows(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_garbage_bytes_are_an_error() {
        assert!(decode_rows(b"definitely not a zip archive").is_err());
    }
}
