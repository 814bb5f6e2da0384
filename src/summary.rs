//! Grouped totals over the records of one period.
//!
//! Each summary groups the records by one or two dimensions and sums their values. Records with a
//! missing dimension are grouped under `""`, so the rows of every summary always add up to the
//! total of the period.

use crate::model::Record;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One group key and the sum of the values of the records that share it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub keys: Vec<String>,
    pub total: f64,
}

impl SummaryRow {
    pub fn new<S: Into<String>>(keys: impl IntoIterator<Item = S>, total: f64) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            total,
        }
    }
}

/// The three summaries shown for a period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Summaries {
    pub by_type: Vec<SummaryRow>,
    pub by_type_and_financial_category: Vec<SummaryRow>,
    pub by_type_and_account: Vec<SummaryRow>,
}

impl Summaries {
    pub fn new(view: &[&Record]) -> Self {
        Self {
            by_type: by_type(view),
            by_type_and_financial_category: by_type_and_financial_category(view),
            by_type_and_account: by_type_and_account(view),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
            && self.by_type_and_financial_category.is_empty()
            && self.by_type_and_account.is_empty()
    }
}

/// Totals per operation type.
pub fn by_type(view: &[&Record]) -> Vec<SummaryRow> {
    group_and_sum(view, |r| vec![r.operation_type()])
}

/// Totals per operation type and financial category.
pub fn by_type_and_financial_category(view: &[&Record]) -> Vec<SummaryRow> {
    group_and_sum(view, |r| vec![r.operation_type(), r.financial_category()])
}

/// Totals per operation type and accounting account.
pub fn by_type_and_account(view: &[&Record]) -> Vec<SummaryRow> {
    group_and_sum(view, |r| vec![r.operation_type(), r.account()])
}

/// The sum of the values of every record in `view`.
pub fn total(view: &[&Record]) -> f64 {
    view.iter().map(|r| r.value()).sum()
}

/// Groups `view` by the keys that `key` extracts and sums the values in each group. Rows are sorted
/// by total, largest first, and by key when totals are equal.
fn group_and_sum<'a, F>(view: &[&'a Record], key: F) -> Vec<SummaryRow>
where
    F: Fn(&'a Record) -> Vec<&'a str>,
{
    let mut groups: BTreeMap<Vec<&str>, f64> = BTreeMap::new();
    for &record in view {
        *groups.entry(key(record)).or_insert(0.0) += record.value();
    }
    let mut rows: Vec<SummaryRow> = groups
        .into_iter()
        .map(|(keys, total)| SummaryRow::new(keys, total))
        .collect();
    rows.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.keys.cmp(&b.keys))
    });
    rows
}
