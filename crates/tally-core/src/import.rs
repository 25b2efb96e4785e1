//! CSV loader for bank transaction exports
//!
//! Expected header (any order, extra columns allowed):
//! Status,Date,Description,Debit,Credit,Member Name
//!
//! If the file was produced by a previous run it may also carry
//! Business Type,Retailer; those labels are loaded as-is.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{
    Amount, LabelSource, TransactionRecord, COL_BUSINESS_TYPE, COL_CREDIT, COL_DATE, COL_DEBIT,
    COL_DESCRIPTION, COL_MEMBER_NAME, COL_RETAILER, COL_STATUS, REQUIRED_COLUMNS,
};
use crate::store::RecordStore;

/// Column positions resolved from the header row
struct ColumnMap {
    status: usize,
    date: usize,
    description: usize,
    debit: usize,
    credit: usize,
    member_name: usize,
    business_type: Option<usize>,
    retailer: Option<usize>,
    extra: Vec<usize>,
}

impl ColumnMap {
    fn resolve(headers: &[String]) -> Result<Self> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, h) in headers.iter().enumerate() {
            index.entry(h.as_str()).or_insert(i);
        }

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !index.contains_key(c))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Load(format!(
                "CSV file missing required columns: {}",
                missing.join(", ")
            )));
        }

        let business_type = index.get(COL_BUSINESS_TYPE).copied();
        let retailer = index.get(COL_RETAILER).copied();

        let known: Vec<usize> = REQUIRED_COLUMNS
            .iter()
            .map(|c| index[c])
            .chain(business_type)
            .chain(retailer)
            .collect();
        let extra = (0..headers.len()).filter(|i| !known.contains(i)).collect();

        Ok(Self {
            status: index[COL_STATUS],
            date: index[COL_DATE],
            description: index[COL_DESCRIPTION],
            debit: index[COL_DEBIT],
            credit: index[COL_CREDIT],
            member_name: index[COL_MEMBER_NAME],
            business_type,
            retailer,
            extra,
        })
    }
}

/// Load transactions from any reader
pub fn load_csv<R: Read>(reader: R) -> Result<RecordStore> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| csv_load_error(e, 1))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    let columns = ColumnMap::resolve(&headers)?;
    let extra_columns = columns.extra.iter().map(|&i| headers[i].clone()).collect();

    let mut store = RecordStore::with_headers(headers, extra_columns);

    for (row, result) in rdr.records().enumerate() {
        // Line 1 is the header
        let line = row + 2;
        let record = result.map_err(|e| csv_load_error(e, line))?;
        let tx = parse_row(&record, &columns, line)?;
        store.push(tx);
    }

    debug!(
        "Loaded {} transactions ({} already labeled)",
        store.len(),
        store.categorized_count()
    );
    Ok(store)
}

/// Load transactions from a file path
pub fn load_csv_path(path: &Path) -> Result<RecordStore> {
    let file = File::open(path)
        .map_err(|e| Error::Load(format!("Failed to open {}: {}", path.display(), e)))?;
    load_csv(file)
}

/// Unreadable input (bad UTF-8, broken quoting) is a load failure
fn csv_load_error(err: csv::Error, line: usize) -> Error {
    let line = err.position().map_or(line as u64, |p| p.line());
    Error::Load(format!("line {}: {}", line, err))
}

fn parse_row(record: &StringRecord, columns: &ColumnMap, line: usize) -> Result<TransactionRecord> {
    let field = |i: usize| record.get(i).unwrap_or("");

    let debit = Amount::parse(field(columns.debit))
        .map_err(|e| Error::Load(format!("line {}: Debit: {}", line, e)))?;
    let credit = Amount::parse(field(columns.credit))
        .map_err(|e| Error::Load(format!("line {}: Credit: {}", line, e)))?;

    let mut tx = TransactionRecord::new(
        field(columns.status),
        field(columns.date),
        field(columns.description),
        debit,
        credit,
        field(columns.member_name),
    );
    tx.extra = columns.extra.iter().map(|&i| field(i).to_string()).collect();

    let raw_business_type = columns.business_type.map(field).unwrap_or("");
    let raw_retailer = columns.retailer.map(field).unwrap_or("");
    let business_type = raw_business_type.trim();
    let retailer = raw_retailer.trim();

    match (business_type.is_empty(), retailer.is_empty()) {
        (false, false) => {
            tx.business_type = Some(business_type.to_string());
            tx.retailer = Some(retailer.to_string());
            tx.label_source = Some(LabelSource::Imported);
        }
        (true, true) => {}
        _ => {
            warn!(
                "line {}: only one of Business Type/Retailer set for '{}', treating as uncategorized",
                line, tx.description
            );
            tx.imported_raw = Some((raw_business_type.to_string(), raw_retailer.to_string()));
        }
    }

    Ok(tx)
}
