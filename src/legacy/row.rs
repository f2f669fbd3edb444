//! Typed rows decoded from raw dump tokens.

use chrono::NaiveDateTime;
use convert_case::{Case, Casing};
use std::fmt;

use super::schema::{ColumnKind, TableSchema};
use super::DecodeError;
use crate::coerce;

/// A decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Int(i32),
    Float(f64),
    DateTime(NaiveDateTime),
    Null,
}

impl FieldValue {
    fn coerce(token: &str, kind: ColumnKind) -> Self {
        let value = match kind {
            ColumnKind::Str => coerce::to_str(token).map(FieldValue::String),
            ColumnKind::Int => coerce::to_int(token).map(FieldValue::Int),
            ColumnKind::Float => coerce::to_float(token).map(FieldValue::Float),
            ColumnKind::Date => coerce::to_date(token).map(FieldValue::DateTime),
        };
        value.unwrap_or(FieldValue::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::DateTime(dt) => write!(f, "{}", dt),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

/// One legacy row with every column coerced to its declared kind.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRow {
    schema: &'static TableSchema,
    values: Vec<FieldValue>,
}

static NULL: FieldValue = FieldValue::Null;

impl DecodedRow {
    /// Value of `column`; unknown columns read as null.
    pub fn get(&self, column: &str) -> &FieldValue {
        debug_assert!(
            self.schema.position(column).is_some(),
            "column {column} not in {} schema",
            self.schema.name
        );
        self.schema
            .position(column)
            .and_then(|i| self.values.get(i))
            .unwrap_or(&NULL)
    }

    pub fn str(&self, column: &str) -> Option<String> {
        match self.get(column) {
            FieldValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn int(&self, column: &str) -> Option<i32> {
        match self.get(column) {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn float(&self, column: &str) -> Option<f64> {
        match self.get(column) {
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn date(&self, column: &str) -> Option<NaiveDateTime> {
        match self.get(column) {
            FieldValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// String value of a column the target schema cannot store as null.
    pub fn required_str(&self, column: &'static str) -> Result<String, DecodeError> {
        self.str(column).ok_or(DecodeError::RequiredFieldMissing {
            table: self.schema.name,
            field: column,
        })
    }
}

/// Decode a raw row positionally against `schema`.
///
/// The token count must equal the schema's column count; a short or long row
/// is rejected rather than padded or truncated.
pub fn decode_row(schema: &'static TableSchema, raw: &[String]) -> Result<DecodedRow, DecodeError> {
    if raw.len() != schema.arity() {
        return Err(DecodeError::ArityMismatch {
            table: schema.name,
            expected: schema.arity(),
            found: raw.len(),
        });
    }

    let values = schema
        .columns
        .iter()
        .zip(raw)
        .map(|(col, token)| FieldValue::coerce(token, col.kind))
        .collect();

    Ok(DecodedRow { schema, values })
}

/// Decode a raw row whose INSERT statement named its columns.
///
/// Header names are matched to schema columns after snake_case
/// normalisation (`hospitalType` matches `hospital_type`). Schema columns the
/// header does not mention decode to null; header columns the schema does not
/// know are ignored. The token count must equal the header length.
pub fn decode_row_with_header(
    schema: &'static TableSchema,
    header: &[String],
    raw: &[String],
) -> Result<DecodedRow, DecodeError> {
    if raw.len() != header.len() {
        return Err(DecodeError::ArityMismatch {
            table: schema.name,
            expected: header.len(),
            found: raw.len(),
        });
    }

    let normalized: Vec<String> = header.iter().map(|h| h.to_case(Case::Snake)).collect();
    let values = schema
        .columns
        .iter()
        .map(|col| {
            normalized
                .iter()
                .position(|h| h == col.name)
                .map(|i| FieldValue::coerce(&raw[i], col.kind))
                .unwrap_or(FieldValue::Null)
        })
        .collect();

    Ok(DecodedRow { schema, values })
}
