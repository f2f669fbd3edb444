//! # confreg-migrate: legacy registration dump migrator
//!
//! Reads a `mysqldump` export of the old conference-registration database and
//! loads it into the new schema.
//!
//! ## Pipeline
//!
//! - **Tokenizer** ([`dump`]): splits the dump into statements structurally and
//!   turns every `INSERT ... VALUES (...), (...)` group into a [`RawRow`].
//! - **Coercion** ([`coerce`]): null-token aware string/int/float/date parsing,
//!   with the legacy `1976-*` and `0000-*` placeholder dates read as null.
//! - **Decoding** ([`legacy`]): explicit per-table column layouts map raw rows
//!   to target models.
//! - **Load engine** ([`migrate`]): zone → hospital → member → attendee →
//!   finance, with email dedup for members and dangling member references
//!   nulled on attendees and finances.
//! - **Store** ([`store`]): a trait with an in-memory implementation for dry
//!   runs and a Diesel implementation for PostgreSQL (default) or MySQL.
//!
//! ## Example
//!
//! ```ignore
//! use confreg_migrate::{migrate_file, LoadOptions, MemoryStore};
//!
//! let mut store = MemoryStore::new();
//! let report = migrate_file("legacy.sql".as_ref(), &mut store, LoadOptions::default())?;
//! report.log_summary();
//! ```

pub mod coerce;
pub mod config;
pub mod dump;
pub mod error;
pub mod legacy;
pub mod migrate;
pub mod store;

pub use config::{ConfigError, MigrateConfig, ZoneSeed};
pub use dump::{parse_insert_values, parse_row_values, read_dump, Dump, RawRow};
pub use error::{DumpError, MigrateError};
pub use legacy::{decode_row, DecodeError, DecodedRow, FieldValue, LegacyEntity, TableSchema};
pub use migrate::{
    migrate_file, LegacyTable, LoadOptions, LoadPlan, MigrationReport, Migrator, PlanError,
    TableReport,
};
pub use store::{MemoryStore, Store, StoreError, UpsertOutcome};

#[cfg(any(feature = "postgres", feature = "mysql"))]
pub use store::{Database, DatabaseConfig, DieselStore};
