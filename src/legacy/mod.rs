//! Legacy table layouts and row decoding.
//!
//! Raw rows from [`crate::dump`] become [`DecodedRow`]s via an explicit
//! [`TableSchema`], and decoded rows become target-store models through
//! [`LegacyEntity`].

pub mod entities;
pub mod row;
pub mod schema;

use thiserror::Error;

pub use entities::LegacyEntity;
pub use row::{decode_row, decode_row_with_header, DecodedRow, FieldValue};
pub use schema::{ColumnDef, ColumnKind, TableSchema, ATTENDEE, FINANCE, HOSPITAL, MEMBER};

/// Why a raw row could not become a model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{table}: expected {expected} values, found {found}")]
    ArityMismatch {
        table: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{table}: required field '{field}' is missing or empty")]
    RequiredFieldMissing {
        table: &'static str,
        field: &'static str,
    },
}
