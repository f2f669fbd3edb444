//! Target store abstraction.
//!
//! The migration engine talks to the new database only through [`Store`].
//! [`MemoryStore`] backs dry runs and tests; [`DieselStore`] writes to
//! PostgreSQL or MySQL through a Diesel r2d2 pool.

pub mod memory;
pub mod models;
pub mod schema;

#[cfg(any(feature = "postgres", feature = "mysql"))]
pub mod database;
#[cfg(any(feature = "postgres", feature = "mysql"))]
pub mod diesel_store;

use std::collections::HashSet;

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub use memory::MemoryStore;
pub use models::{Attendee, Finance, Hospital, Member, Zone};

#[cfg(any(feature = "postgres", feature = "mysql"))]
pub use database::{Database, DatabaseConfig};
#[cfg(any(feature = "postgres", feature = "mysql"))]
pub use diesel_store::DieselStore;

/// Errors reported by a [`Store`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unique constraint failed on {table}: {detail}")]
    UniqueViolation { table: String, detail: String },

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Database error on {table}: {source}")]
    Database {
        table: String,
        #[source]
        source: DieselError,
    },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("No id left to assign on {0}")]
    IdsExhausted(String),
}

impl StoreError {
    /// Expected noise when legacy primary keys collide.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }

    /// Map a Diesel error raised while touching `table`.
    pub fn diesel(table: &str) -> impl FnOnce(DieselError) -> StoreError + '_ {
        move |err| match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::UniqueViolation {
                    table: table.to_string(),
                    detail: info.message().to_string(),
                }
            }
            other => StoreError::Database {
                table: table.to_string(),
                source: other,
            },
        }
    }
}

/// Result of an insert-or-update on a natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Persistence operations the migration needs, one call per row.
pub trait Store {
    /// Insert or update a zone by `code`.
    fn upsert_zone(&mut self, zone: &Zone) -> Result<UpsertOutcome, StoreError>;

    /// Insert or update a hospital by `code`.
    fn upsert_hospital(&mut self, hospital: &Hospital) -> Result<UpsertOutcome, StoreError>;

    /// Delete every member; returns the number of rows removed.
    fn clear_members(&mut self) -> Result<usize, StoreError>;

    fn clear_attendees(&mut self) -> Result<usize, StoreError>;

    fn clear_finances(&mut self) -> Result<usize, StoreError>;

    /// Id of the member registered with `email`, if any.
    fn find_member_by_email(&mut self, email: &str) -> Result<Option<i32>, StoreError>;

    /// Insert a member, keeping `member.id` when set.
    fn insert_member(&mut self, member: &Member) -> Result<(), StoreError>;

    /// Ids of every member currently stored.
    fn member_ids(&mut self) -> Result<HashSet<i32>, StoreError>;

    fn insert_attendee(&mut self, attendee: &Attendee) -> Result<(), StoreError>;

    fn insert_finance(&mut self, finance: &Finance) -> Result<(), StoreError>;

    /// Row count of an arbitrary table, for the end-of-run summary.
    fn count_rows(&mut self, table: &str) -> Result<i64, StoreError>;
}

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static identifier regex"));

/// True when `name` can be spliced into SQL as a table name.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("hospital"));
        assert!(is_valid_identifier("food_type2"));
        assert!(!is_valid_identifier("2hotel"));
        assert!(!is_valid_identifier("hotel; DROP TABLE member"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_unique_violation_message() {
        let err = StoreError::UniqueViolation {
            table: "attendee".to_string(),
            detail: "id".to_string(),
        };
        assert!(err.is_unique_violation());
        assert!(err.to_string().contains("Unique constraint"));
        assert!(!StoreError::UnknownTable("x".to_string()).is_unique_violation());
    }

    #[test]
    fn test_diesel_unique_violation_maps_to_unique_violation() {
        let err = StoreError::diesel("attendee")(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new(String::from("duplicate key value violates unique constraint \"attendee_pkey\"")),
        ));
        assert!(err.is_unique_violation());
        assert!(err.to_string().contains("Unique constraint"));
        assert!(err.to_string().contains("attendee_pkey"));
    }

    #[test]
    fn test_diesel_other_database_error_is_not_unique() {
        let err = StoreError::diesel("finance")(DieselError::DatabaseError(
            DatabaseErrorKind::ForeignKeyViolation,
            Box::new(String::from("violates foreign key constraint")),
        ));
        assert!(!err.is_unique_violation());
        assert!(matches!(err, StoreError::Database { ref table, .. } if table == "finance"));
    }

    #[test]
    fn test_diesel_not_found_maps_to_database() {
        let err = StoreError::diesel("member")(DieselError::NotFound);
        assert!(matches!(err, StoreError::Database { ref table, .. } if table == "member"));
    }
}
