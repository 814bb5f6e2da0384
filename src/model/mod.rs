//! Types that represent the core data model: the `Record`, the `RecordSet` that holds a whole
//! document, and `Reais` for displaying amounts.
mod reais;
mod record;
mod record_set;

pub use reais::Reais;
pub use record::{
    Record, RecordEdit, RecordId, ACCOUNT, CATEGORY, DESCRIPTION, FINANCIAL_CATEGORY, ID,
    OPERATION_TYPE, PERIOD, SUPPLIER, VALUE,
};
pub use record_set::{filter_by_period, RecordSet};
