//! Extraction record module - the structured result for one work item

use std::fmt;

/// A single extracted field value
///
/// Mirrors the shapes a structured-output schema can ask for: free text,
/// an integer (e.g. publication year), or an ordered list of enumerated
/// strings. `Empty` stands for a JSON `null` or an empty table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Free text
    Text(String),

    /// Whole number
    Integer(i64),

    /// Ordered list of strings (multi-select answers)
    List(Vec<String>),

    /// No value
    Empty,
}

impl FieldValue {
    /// Whether this value carries no content
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::List(_) | FieldValue::Integer(_) => false,
        }
    }

    /// Borrow the text content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    /// Human-readable rendering used in prompt context; lists are comma-joined
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::List(items) => f.write_str(&items.join(", ")),
            FieldValue::Empty => Ok(()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

/// Structured result of processing one work item
///
/// An ordered mapping from field name to value. Field order is preserved
/// because it determines column order in the checkpoint table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionRecord {
    fields: Vec<(String, FieldValue)>,
}

impl ExtractionRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record whose first field identifies the item
    pub fn identified(id_field: &str, name: &str) -> Self {
        let mut record = Self::new();
        record.insert(id_field, FieldValue::Text(name.to_string()));
        record
    }

    /// Create a failure placeholder for an item
    ///
    /// Holds only the identifying field and the error marker, never a
    /// partial extraction.
    pub fn failure(id_field: &str, name: &str, error_field: &str, marker: &str) -> Self {
        let mut record = Self::identified(id_field, name);
        record.insert(error_field, FieldValue::Text(marker.to_string()));
        record
    }

    /// Set a field, keeping its original position if it already exists
    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((field, value)),
        }
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Whether the record has the given field
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Text of the identifying field
    pub fn name(&self, id_field: &str) -> Option<&str> {
        self.get(id_field).and_then(FieldValue::as_text)
    }

    /// Whether the record is a failure placeholder (non-empty error field)
    pub fn is_failure(&self, error_field: &str) -> bool {
        self.get(error_field).is_some_and(|value| !value.is_empty())
    }

    /// Iterate fields in order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Field names in order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
