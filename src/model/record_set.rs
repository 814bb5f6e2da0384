use crate::error::Res;
use crate::model::{Record, RecordEdit};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// All records of the document, in document order.
///
/// Identifiers are expected to be unique. Lookups return the first match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    /// Parses the bytes of a document, which must be a JSON array of objects.
    pub fn parse(bytes: &[u8]) -> Res<Self> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).context("The document is not valid JSON")?;
        let items = match value {
            serde_json::Value::Array(items) => items,
            other => bail!(
                "The document must be a JSON array of records, found {}",
                kind(&other)
            ),
        };
        let mut records = Vec::with_capacity(items.len());
        for (ix, item) in items.into_iter().enumerate() {
            if !item.is_object() {
                bail!("Item {ix} of the document is {}, not an object", kind(&item));
            }
            let record: Record = serde_json::from_value(item)
                .with_context(|| format!("Unable to read record {ix}"))?;
            records.push(record);
        }
        Ok(Self { records })
    }

    /// Serializes the whole set the way the document is stored: a pretty JSON array with a
    /// two-space indent.
    pub fn to_document(&self) -> Res<Vec<u8>> {
        serde_json::to_vec_pretty(&self.records).context("Unable to serialize the records")
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The distinct, non-empty period labels, most recent (greatest) first.
    pub fn available_periods(&self) -> Vec<String> {
        let periods: BTreeSet<&str> = self
            .records
            .iter()
            .map(Record::period)
            .filter(|p| !p.is_empty())
            .collect();
        periods.into_iter().rev().map(str::to_string).collect()
    }

    /// The records whose period label is exactly `period`, in document order.
    pub fn filter_by_period(&self, period: &str) -> Vec<&Record> {
        filter_by_period(self.records.iter(), period)
    }

    /// The first record with the identifier `id`.
    pub fn find_by_id(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.has_id(id))
    }

    /// Overwrites the editable fields of the record with the identifier `id`. The set is left
    /// unchanged when no record matches.
    pub fn apply_edit(&mut self, id: &str, edit: &RecordEdit) -> Res<&Record> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.has_id(id))
            .with_context(|| format!("Record not found: no record has the id '{id}'"))?;
        record.apply(edit);
        Ok(&*record)
    }
}

/// Keeps the records whose period label is exactly `period`. Applying it to its own output with the
/// same `period` returns the same records.
pub fn filter_by_period<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    period: &str,
) -> Vec<&'a Record> {
    records
        .into_iter()
        .filter(|r| r.period() == period)
        .collect()
}

fn kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scenario() -> RecordSet {
        let doc = json!([
            {"id": 1, "TipoOperacao": "Despesa", "Valor": 100, "Mês/Ano": "2024-01"},
            {"id": 2, "TipoOperacao": "Despesa", "Valor": 50, "Mês/Ano": "2024-01"},
            {"id": 3, "TipoOperacao": "Receita", "Valor": 30, "Mês/Ano": "2024-02"}
        ]);
        RecordSet::parse(doc.to_string().as_bytes()).unwrap()
    }

    fn ids(records: &[&Record]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.id().map(|id| id.to_string()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_available_periods() {
        assert_eq!(scenario().available_periods(), vec!["2024-02", "2024-01"]);
    }

    #[test]
    fn test_available_periods_skip_empty_and_collapse() {
        let doc = json!([
            {"id": 1, "Mês/Ano": "2023-12"},
            {"id": 2, "Mês/Ano": ""},
            {"id": 3},
            {"id": 4, "Mês/Ano": "2023-12"},
            {"id": 5, "Mês/Ano": "2024-05"}
        ]);
        let set = RecordSet::parse(doc.to_string().as_bytes()).unwrap();
        assert_eq!(set.available_periods(), vec!["2024-05", "2023-12"]);
    }

    #[test]
    fn test_filter_by_period() {
        let set = scenario();
        let view = set.filter_by_period("2024-01");
        assert_eq!(ids(&view), vec!["1", "2"]);
        assert!(set.filter_by_period("2030-01").is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let set = scenario();
        let once = set.filter_by_period("2024-02");
        let twice = filter_by_period(once.iter().copied(), "2024-02");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_find_by_id_scans_everything() {
        let set = scenario();
        assert_eq!(set.find_by_id("3").unwrap().operation_type(), "Receita");
        assert!(set.find_by_id("4").is_none());
    }

    #[test]
    fn test_apply_edit() {
        let mut set = scenario();
        let mut edit = RecordEdit::from(set.find_by_id("2").unwrap());
        edit.set_value_text("75.5");
        set.apply_edit("2", &edit).unwrap();
        assert_eq!(set.records()[1].value(), 75.5);
        assert_eq!(set.records()[0], scenario().records()[0]);
        assert_eq!(set.records()[2], scenario().records()[2]);
    }

    #[test]
    fn test_apply_edit_leaves_other_records_verbatim() {
        let doc = json!([
            {"id": 1, "Mês/Ano": "2024-01", "Conta Contábil": 3102, "Fornecedor": null, "Valor": 5},
            {"id": 2, "Mês/Ano": "2024-01", "Categoria": ["a", "b"], "Valor": "7,5"},
            {"id": 3, "Mês/Ano": "2024-01", "Categoria Financeira": 12, "Valor": 1}
        ]);
        let mut set = RecordSet::parse(doc.to_string().as_bytes()).unwrap();
        let mut edit = RecordEdit::from(set.find_by_id("3").unwrap());
        edit.set_value_text("2");
        set.apply_edit("3", &edit).unwrap();

        let out: serde_json::Value = serde_json::from_slice(&set.to_document().unwrap()).unwrap();
        assert_eq!(out[0], doc[0]);
        assert_eq!(out[1], doc[1]);
        assert_eq!(out[2]["Categoria Financeira"], "12");
        assert_eq!(out[2]["Valor"], 2.0);
    }

    #[test]
    fn test_apply_edit_unknown_id_changes_nothing() {
        let mut set = scenario();
        let before = set.to_document().unwrap();
        let result = set.apply_edit("99", &RecordEdit::default());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("Record not found"), "{message}");
        assert_eq!(set.to_document().unwrap(), before);
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(RecordSet::parse(br#"{"id": 1}"#).is_err());
        assert!(RecordSet::parse(b"not json").is_err());
        assert!(RecordSet::parse(br#"[1, 2]"#).is_err());
    }

    #[test]
    fn test_parse_empty_array() {
        let set = RecordSet::parse(b"[]").unwrap();
        assert!(set.is_empty());
        assert!(set.available_periods().is_empty());
    }

    #[test]
    fn test_document_is_pretty_printed() {
        let doc = String::from_utf8(scenario().to_document().unwrap()).unwrap();
        assert!(doc.starts_with("[\n  {\n    \""));
        let reparsed = RecordSet::parse(doc.as_bytes()).unwrap();
        assert_eq!(reparsed, scenario());
    }
}
