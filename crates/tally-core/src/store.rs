//! In-memory transaction record store
//!
//! Records keep their input order for the whole run. A record's position is its
//! [`RecordId`]. Labels are written through [`RecordStore::set_labels`], which
//! never replaces existing labels, or [`RecordStore::overwrite_labels`], which is
//! reserved for explicit user overrides.

use crate::error::{Error, Result};
use crate::models::{
    LabelSource, RecordId, TransactionRecord, COL_BUSINESS_TYPE, COL_RETAILER, REQUIRED_COLUMNS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordStore {
    /// Input header in its original order
    headers: Vec<String>,
    /// Non-required, non-label columns carried through unchanged
    extra_columns: Vec<String>,
    records: Vec<TransactionRecord>,
}

impl RecordStore {
    /// Create a store with an explicit input header
    pub fn with_headers(headers: Vec<String>, extra_columns: Vec<String>) -> Self {
        Self {
            headers,
            extra_columns,
            records: Vec::new(),
        }
    }

    /// Create a store with the canonical header
    pub fn from_records(records: Vec<TransactionRecord>) -> Self {
        Self {
            headers: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            extra_columns: Vec::new(),
            records,
        }
    }

    pub fn push(&mut self, record: TransactionRecord) -> RecordId {
        self.records.push(record);
        self.records.len() - 1
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    /// Input header followed by Business Type and Retailer when the input lacked them
    pub fn output_headers(&self) -> Vec<String> {
        let mut headers = self.headers.clone();
        for col in [COL_BUSINESS_TYPE, COL_RETAILER] {
            if !headers.iter().any(|h| h == col) {
                headers.push(col.to_string());
            }
        }
        headers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: RecordId) -> Option<&TransactionRecord> {
        self.records.get(id)
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &TransactionRecord)> {
        self.records.iter().enumerate()
    }

    /// Ids of records without a business type, in input order
    pub fn uncategorized_ids(&self) -> Vec<RecordId> {
        self.iter()
            .filter(|(_, r)| !r.is_categorized())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn categorized_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_categorized()).count()
    }

    /// Set labels on an unlabeled record.
    ///
    /// Returns `Ok(false)` and leaves the record untouched if it already has labels.
    pub fn set_labels(
        &mut self,
        id: RecordId,
        business_type: &str,
        retailer: &str,
        source: LabelSource,
    ) -> Result<bool> {
        validate_labels(business_type, retailer)?;
        let record = self.record_mut(id)?;

        if record.business_type.is_some() || record.retailer.is_some() {
            return Ok(false);
        }

        record.business_type = Some(business_type.to_string());
        record.retailer = Some(retailer.to_string());
        record.label_source = Some(source);
        Ok(true)
    }

    /// Replace a record's labels regardless of their current state
    pub fn overwrite_labels(
        &mut self,
        id: RecordId,
        business_type: &str,
        retailer: &str,
        source: LabelSource,
    ) -> Result<()> {
        validate_labels(business_type, retailer)?;
        let record = self.record_mut(id)?;

        record.business_type = Some(business_type.to_string());
        record.retailer = Some(retailer.to_string());
        record.label_source = Some(source);
        Ok(())
    }

    /// Remove both labels, returning the record to uncategorized
    pub fn clear_labels(&mut self, id: RecordId) -> Result<()> {
        let record = self.record_mut(id)?;
        record.business_type = None;
        record.retailer = None;
        record.label_source = None;
        Ok(())
    }

    fn record_mut(&mut self, id: RecordId) -> Result<&mut TransactionRecord> {
        self.records
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("Record #{}", id)))
    }
}

/// Business type and retailer are set together or not at all
pub(crate) fn validate_labels(business_type: &str, retailer: &str) -> Result<()> {
    if business_type.trim().is_empty() || retailer.trim().is_empty() {
        return Err(Error::InvalidData(
            "Business type and retailer must both be non-empty".into(),
        ));
    }
    Ok(())
}
