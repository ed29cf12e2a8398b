//! Duplicate resolution by identifier, first occurrence wins.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::models::{EventAction, RawRecord, TransformReport, TransformationEvent};

/// Drops rows whose identifier was already seen earlier in the batch.
#[derive(Debug, Clone)]
pub struct DuplicateResolver {
    key: String,
}

impl DuplicateResolver {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stable filter over `records`.
    ///
    /// Returns the surviving rows paired with their 1-based data row number.
    /// Every dropped row is logged to `report` as a `DUPLICATE_REMOVED` event
    /// and counted in `duplicates_removed`. Rows with an empty identifier are
    /// always kept. If no row carries the key column at all, every row passes.
    pub fn resolve<'a>(
        &self,
        records: &'a [RawRecord],
        report: &mut TransformReport,
    ) -> Vec<(usize, &'a RawRecord)> {
        let numbered = records.iter().enumerate().map(|(i, r)| (i + 1, r));

        if !records.iter().any(|r| r.contains(&self.key)) {
            debug!(key = %self.key, "dedup key column absent, skipping duplicate check");
            return numbered.collect();
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut kept = Vec::with_capacity(records.len());

        for (row, record) in numbered {
            let id = record.get(&self.key).map(str::trim).unwrap_or("");
            if id.is_empty() || seen.insert(id) {
                kept.push((row, record));
                continue;
            }

            debug!(row, id, "dropping duplicate row");
            report.record_event(
                TransformationEvent::new(
                    EventAction::DuplicateRemoved,
                    format!("Duplicate {} '{}'", self.key, id),
                )
                .at_row(row),
            );
            report.duplicates_removed += 1;
        }

        if report.duplicates_removed > 0 {
            info!("Removed {} duplicate records", report.duplicates_removed);
        }

        kept
    }
}
