//! Per-run counters and the end-of-run summary.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::plan::LegacyTable;

/// Counters for one loaded table.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    /// Raw rows found in the dump.
    pub discovered: usize,
    pub created: usize,
    pub updated: usize,
    /// Rows dropped because their natural key was already loaded.
    pub skipped_duplicates: usize,
    /// Rows whose member reference was nulled because the member is absent.
    pub fk_repaired: usize,
    /// Rows the store rejected with an unexpected error.
    pub failed: usize,
    /// Rows the store rejected with a unique violation, kept out of the log.
    pub suppressed: usize,
    /// Rows with the wrong number of values or a missing required field.
    pub malformed: usize,
    /// Row groups or statements the tokenizer could not read.
    pub unparsed: usize,
}

/// A member row left out because its email was already taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedMember {
    pub legacy_id: Option<i32>,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub dump_path: Option<String>,
    pub dump_bytes: usize,
    pub tables: IndexMap<LegacyTable, TableReport>,
    pub skipped_members: Vec<SkippedMember>,
    /// Row count per table after the load; `None` when counting failed.
    pub final_counts: IndexMap<String, Option<i64>>,
}

impl MigrationReport {
    pub fn new(dump_bytes: usize) -> Self {
        MigrationReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            duration_ms: 0,
            dump_path: None,
            dump_bytes,
            tables: IndexMap::new(),
            skipped_members: Vec::new(),
            final_counts: IndexMap::new(),
        }
    }

    pub fn table(&self, table: LegacyTable) -> TableReport {
        self.tables.get(&table).cloned().unwrap_or_default()
    }

    pub fn table_mut(&mut self, table: LegacyTable) -> &mut TableReport {
        self.tables.entry(table).or_default()
    }

    pub(crate) fn finish(&mut self) {
        self.duration_ms = (Utc::now() - self.started_at).num_milliseconds();
    }

    pub fn log_summary(&self) {
        info!(run_id = %self.run_id, duration_ms = self.duration_ms, "Migration summary");

        for (table, r) in &self.tables {
            info!(
                table = %table,
                discovered = r.discovered,
                created = r.created,
                updated = r.updated,
                skipped_duplicates = r.skipped_duplicates,
                fk_repaired = r.fk_repaired,
                failed = r.failed,
                suppressed = r.suppressed,
                malformed = r.malformed,
                unparsed = r.unparsed,
                "Table loaded"
            );
        }

        if !self.skipped_members.is_empty() {
            info!(count = self.skipped_members.len(), "Members skipped as duplicate email");
            for skipped in &self.skipped_members {
                info!(legacy_id = ?skipped.legacy_id, email = %skipped.email, "  skipped member");
            }
        }

        for (table, count) in &self.final_counts {
            match count {
                Some(count) => info!(table = %table, rows = count, "Final row count"),
                None => warn!(table = %table, "Final row count unavailable"),
            }
        }
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

/// Shorten an error message for a log line without splitting a character.
pub fn truncate_message(message: &str, limit: usize) -> String {
    match message.char_indices().nth(limit) {
        Some((end, _)) => format!("{}...", &message[..end]),
        None => message.to_string(),
    }
}
