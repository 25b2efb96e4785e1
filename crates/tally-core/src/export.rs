//! Augmented CSV writer
//!
//! Output keeps the input column order and row order, with Business Type and
//! Retailer appended when the input did not already carry them.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{
    TransactionRecord, COL_BUSINESS_TYPE, COL_CREDIT, COL_DATE, COL_DEBIT, COL_DESCRIPTION,
    COL_MEMBER_NAME, COL_RETAILER, COL_STATUS,
};
use crate::store::RecordStore;

/// Columns backed by record fields
const KNOWN_COLUMNS: [&str; 8] = [
    COL_STATUS,
    COL_DATE,
    COL_DESCRIPTION,
    COL_DEBIT,
    COL_CREDIT,
    COL_MEMBER_NAME,
    COL_BUSINESS_TYPE,
    COL_RETAILER,
];

/// Write the store as CSV to any writer
pub fn write_csv<W: Write>(writer: W, store: &RecordStore) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    let headers = store.output_headers();
    wtr.write_record(&headers)?;

    let columns = output_columns(&headers);
    for record in store.records() {
        let row: Vec<String> = columns.iter().map(|c| cell(record, c)).collect();
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the store to `path` atomically.
///
/// The CSV is written to a temp file next to `path` and then renamed into place,
/// so a failure never leaves a partial file behind. The store is not modified
/// and the call can simply be retried.
pub fn save_csv(path: &Path, store: &RecordStore) -> Result<()> {
    let mut buf = Vec::new();
    write_csv(&mut buf, store)?;

    let write_err = |source: std::io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(&buf).map_err(write_err)?;
    temp.flush().map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;

    info!("Wrote {} transactions to {}", store.len(), path.display());
    Ok(())
}

/// Where an output column takes its value from
enum Column<'a> {
    Known(&'a str),
    /// Index into `TransactionRecord::extra`
    Extra(usize),
}

/// The first occurrence of a known header maps to its field; every other
/// column is an extra, numbered in header order as the loader numbers them.
fn output_columns(headers: &[String]) -> Vec<Column<'_>> {
    let mut seen = HashSet::new();
    let mut next_extra = 0;
    headers
        .iter()
        .map(|h| {
            let name = h.as_str();
            if KNOWN_COLUMNS.contains(&name) && seen.insert(name) {
                Column::Known(name)
            } else {
                next_extra += 1;
                Column::Extra(next_extra - 1)
            }
        })
        .collect()
}

fn cell(record: &TransactionRecord, column: &Column<'_>) -> String {
    match *column {
        Column::Known(COL_STATUS) => record.status.clone(),
        Column::Known(COL_DATE) => record.date.clone(),
        Column::Known(COL_DESCRIPTION) => record.description.clone(),
        Column::Known(COL_DEBIT) => record.debit.as_ref().map(|a| a.to_string()).unwrap_or_default(),
        Column::Known(COL_CREDIT) => record.credit.as_ref().map(|a| a.to_string()).unwrap_or_default(),
        Column::Known(COL_MEMBER_NAME) => record.member_name.clone(),
        Column::Known(COL_BUSINESS_TYPE) => record
            .business_type
            .clone()
            .or_else(|| record.imported_raw.as_ref().map(|(b, _)| b.clone()))
            .unwrap_or_default(),
        Column::Known(COL_RETAILER) => record
            .retailer
            .clone()
            .or_else(|| record.imported_raw.as_ref().map(|(_, r)| r.clone()))
            .unwrap_or_default(),
        Column::Known(_) => String::new(),
        Column::Extra(i) => record.extra.get(i).cloned().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::load_csv;
    use crate::models::LabelSource;

    #[test]
    fn test_roundtrip_adds_empty_label_columns() {
        let input = "Status,Date,Description,Debit,Credit,Member Name
Cleared,2024-01-05,STARBUCKS #123,4.50,,Alice
Pending,2024-01-06,\"ACME, INC\",,\"$1,000.00\",Bob
";
        let store = load_csv(input.as_bytes()).unwrap();
        let mut out = Vec::new();
        write_csv(&mut out, &store).unwrap();

        let expected = "Status,Date,Description,Debit,Credit,Member Name,Business Type,Retailer
Cleared,2024-01-05,STARBUCKS #123,4.50,,Alice,,
Pending,2024-01-06,\"ACME, INC\",,\"$1,000.00\",Bob,,
";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_labels_and_extra_columns_written() {
        let input = "Date,Description,Status,Debit,Credit,Member Name,Note
2024-01-05,STARBUCKS,Cleared,4.50,,Alice,morning
";
        let mut store = load_csv(input.as_bytes()).unwrap();
        store
            .set_labels(0, "Food", "Starbucks", LabelSource::Rule)
            .unwrap();

        let mut out = Vec::new();
        write_csv(&mut out, &store).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Date,Description,Status,Debit,Credit,Member Name,Note,Business Type,Retailer"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-01-05,STARBUCKS,Cleared,4.50,,Alice,morning,Food,Starbucks"
        );
    }

    #[test]
    fn test_existing_label_columns_keep_position() {
        let input = "Business Type,Retailer,Status,Date,Description,Debit,Credit,Member Name
Food,Cafe,Posted,2024-01-01,CAFE,3.00,,A
";
        let store = load_csv(input.as_bytes()).unwrap();
        let mut out = Vec::new();
        write_csv(&mut out, &store).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), input);
    }

    #[test]
    fn test_half_labeled_row_written_back_unchanged() {
        let input = "Status,Date,Description,Debit,Credit,Member Name,Business Type,Retailer
P,2024-01-01,X,1.00,,A,Food,
P,2024-01-02,Y,2.00,,A,,Corner Shop
";
        let mut store = load_csv(input.as_bytes()).unwrap();
        assert_eq!(store.uncategorized_ids(), vec![0, 1]);

        let mut out = Vec::new();
        write_csv(&mut out, &store).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), input);

        // Labeling the row replaces both cells
        store.set_labels(1, "Shopping", "Corner Shop", LabelSource::Manual).unwrap();
        let mut out = Vec::new();
        write_csv(&mut out, &store).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("P,2024-01-01,X,1.00,,A,Food,\n"));
        assert!(text.contains("P,2024-01-02,Y,2.00,,A,Shopping,Corner Shop\n"));
    }

    #[test]
    fn test_duplicate_header_kept_as_extra() {
        let input = "Status,Date,Description,Debit,Credit,Member Name,Date
Posted,2024-01-01,CAFE,3.00,,A,2024-01-02
";
        let store = load_csv(input.as_bytes()).unwrap();
        assert_eq!(store.get(0).unwrap().date, "2024-01-01");

        let mut out = Vec::new();
        write_csv(&mut out, &store).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text.lines().nth(1).unwrap(),
            "Posted,2024-01-01,CAFE,3.00,,A,2024-01-02,,"
        );
    }

    #[test]
    fn test_save_csv_to_missing_dir_is_write_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("no-such-dir").join("out.csv");
        let store = RecordStore::from_records(Vec::new());

        let err = save_csv(&path, &store).unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_save_csv_writes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let input = "Status,Date,Description,Debit,Credit,Member Name
Cleared,2024-01-05,X,1.00,,A
";
        let store = load_csv(input.as_bytes()).unwrap();
        save_csv(&path, &store).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Status,Date,Description,Debit,Credit,Member Name,Business Type,Retailer"));
        assert!(written.contains("Cleared,2024-01-05,X,1.00,,A,,"));
    }
}
