use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// JSON key of the record identifier.
pub const ID: &str = "id";
/// JSON key of the month-period label.
pub const PERIOD: &str = "Mês/Ano";
/// JSON key of the operation type.
pub const OPERATION_TYPE: &str = "TipoOperacao";
/// JSON key of the category.
pub const CATEGORY: &str = "Categoria";
/// JSON key of the supplier.
pub const SUPPLIER: &str = "Fornecedor";
/// JSON key of the free-text description.
pub const DESCRIPTION: &str = "Descrição";
/// JSON key of the financial category.
pub const FINANCIAL_CATEGORY: &str = "Categoria Financeira";
/// JSON key of the accounting account.
pub const ACCOUNT: &str = "Conta Contábil";
/// JSON key of the monetary value.
pub const VALUE: &str = "Valor";

/// The identifier of a record. It is opaque: documents use both numbers and strings, and whichever
/// was found is written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(serde_json::Number),
    Text(String),
    /// Anything else, kept as found. Only booleans can be matched.
    Other(Value),
}

impl RecordId {
    /// Whether this id matches user input, compared by display form. Surrounding whitespace in
    /// the input is ignored.
    pub fn matches(&self, input: &str) -> bool {
        let input = input.trim();
        match self {
            RecordId::Text(s) => s == input,
            RecordId::Number(n) => n.to_string() == input,
            RecordId::Other(Value::Bool(b)) => b.to_string() == input,
            RecordId::Other(_) => false,
        }
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{n}"),
            RecordId::Text(s) => write!(f, "{s}"),
            RecordId::Other(Value::Null) => Ok(()),
            RecordId::Other(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Number(value.into())
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::Text(value.to_string())
    }
}

/// A text field as it was found in the document, along with the text it reads as. Numbers and
/// booleans read as their JSON form and `null` reads as `""`. The raw value is what gets written
/// back.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawText {
    raw: Value,
    text: String,
}

impl RawText {
    fn new(raw: Value) -> Self {
        let text = match &raw {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self { raw, text }
    }

    fn as_str(&self) -> &str {
        &self.text
    }
}

impl From<&str> for RawText {
    fn from(s: &str) -> Self {
        Self::new(Value::String(s.to_string()))
    }
}

impl Serialize for RawText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RawText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::new)
    }
}

/// One financial transaction entry ("lançamento") of the document.
///
/// Every field is optional. Absent text fields read as `""` and an absent or non-numeric value
/// reads as `0.0`. Keys that are not recognized are kept in `other_fields` and written back as they
/// were found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(
        rename = "id",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_id"
    )]
    pub(crate) id: Option<RecordId>,

    #[serde(rename = "Mês/Ano", default, skip_serializing_if = "Option::is_none")]
    #[serde(deserialize_with = "present")]
    pub(crate) period: Option<RawText>,

    #[serde(rename = "TipoOperacao", default, skip_serializing_if = "Option::is_none")]
    #[serde(deserialize_with = "present")]
    pub(crate) operation_type: Option<RawText>,

    #[serde(rename = "Categoria", default, skip_serializing_if = "Option::is_none")]
    #[serde(deserialize_with = "present")]
    pub(crate) category: Option<RawText>,

    #[serde(rename = "Fornecedor", default, skip_serializing_if = "Option::is_none")]
    #[serde(deserialize_with = "present")]
    pub(crate) supplier: Option<RawText>,

    #[serde(rename = "Descrição", default, skip_serializing_if = "Option::is_none")]
    #[serde(deserialize_with = "present")]
    pub(crate) description: Option<RawText>,

    #[serde(
        rename = "Categoria Financeira",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    #[serde(deserialize_with = "present")]
    pub(crate) financial_category: Option<RawText>,

    #[serde(rename = "Conta Contábil", default, skip_serializing_if = "Option::is_none")]
    #[serde(deserialize_with = "present")]
    pub(crate) account: Option<RawText>,

    /// Kept raw so that records which are never edited are written back unchanged.
    #[serde(
        rename = "Valor",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub(crate) value: Option<Value>,

    #[serde(flatten)]
    pub(crate) other_fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    pub fn period(&self) -> &str {
        text(&self.period)
    }

    pub fn operation_type(&self) -> &str {
        text(&self.operation_type)
    }

    pub fn category(&self) -> &str {
        text(&self.category)
    }

    pub fn supplier(&self) -> &str {
        text(&self.supplier)
    }

    pub fn description(&self) -> &str {
        text(&self.description)
    }

    pub fn financial_category(&self) -> &str {
        text(&self.financial_category)
    }

    pub fn account(&self) -> &str {
        text(&self.account)
    }

    /// The monetary value coerced to a number. Missing, non-numeric and non-finite values are `0.0`.
    pub fn value(&self) -> f64 {
        self.value.as_ref().map(coerce_value).unwrap_or_default()
    }

    /// Fields that are not part of the known schema.
    pub fn other_fields(&self) -> &BTreeMap<String, Value> {
        &self.other_fields
    }

    /// Whether this record has the identifier `id`.
    pub fn has_id(&self, id: &str) -> bool {
        self.id.as_ref().is_some_and(|rid| rid.matches(id))
    }

    /// Overwrites the editable fields with `edit`.
    pub(crate) fn apply(&mut self, edit: &RecordEdit) {
        self.operation_type = Some(edit.operation_type.as_str().into());
        self.category = Some(edit.category.as_str().into());
        self.supplier = Some(edit.supplier.as_str().into());
        self.description = Some(edit.description.as_str().into());
        self.financial_category = Some(edit.financial_category.as_str().into());
        self.account = Some(edit.account.as_str().into());
        self.value = Some(number(edit.value));
    }
}

/// The editable fields of a record, as presented in the edit form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RecordEdit {
    pub operation_type: String,
    pub category: String,
    pub supplier: String,
    pub description: String,
    pub financial_category: String,
    pub account: String,
    pub value: f64,
}

impl RecordEdit {
    /// Sets the value from form text. Text that does not parse as a number becomes `0.0`.
    pub fn set_value_text(&mut self, text: &str) {
        self.value = parse_number(text).unwrap_or_default();
    }
}

impl From<&Record> for RecordEdit {
    fn from(record: &Record) -> Self {
        Self {
            operation_type: record.operation_type().to_string(),
            category: record.category().to_string(),
            supplier: record.supplier().to_string(),
            description: record.description().to_string(),
            financial_category: record.financial_category().to_string(),
            account: record.account().to_string(),
            value: record.value(),
        }
    }
}

/// Converts a JSON value into a number the way the value column is read.
fn coerce_value(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    };
    n.filter(|f| f.is_finite()).unwrap_or_default()
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Writes an `f64` as a JSON number.
fn number(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or_else(|| Value::Number(0.into()))
}

fn text(field: &Option<RawText>) -> &str {
    field.as_ref().map(RawText::as_str).unwrap_or_default()
}

/// Keeps a key that is present with a `null` value, so that it is written back.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<RecordId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => Some(RecordId::Number(n)),
        Value::String(s) => Some(RecordId::Text(s)),
        other => Some(RecordId::Other(other)),
    })
}
