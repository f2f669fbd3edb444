//! Reconciliation and load engine
//!
//! Loads decoded legacy rows into a [`Store`] table by table, in the order
//! given by [`LoadPlan`]:
//!
//! - zones are seeded from configuration and upserted by code;
//! - hospitals are upserted by code, so re-running updates them in place;
//! - members, attendees and finances are emptied and reloaded on every run.
//!   Members are deduplicated by email (first row wins). Attendee and finance
//!   rows that point at a member who did not survive get that reference nulled.
//!
//! Per-row failures are counted and logged; only store failures outside a row
//! loop abort the run.

pub mod plan;
pub mod report;

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::MigrateConfig;
use crate::dump::{self, Dump};
use crate::error::MigrateError;
use crate::legacy::{DecodeError, LegacyEntity};
use crate::store::{Attendee, Finance, Hospital, Member, Store, StoreError, UpsertOutcome, Zone};

pub use plan::{LegacyTable, LoadPlan, PlanError};
pub use report::{truncate_message, MigrationReport, SkippedMember, TableReport};

/// Knobs for one migration run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Zones upserted before hospitals are loaded.
    pub zones: Vec<Zone>,
    /// Rows between progress lines.
    pub batch_size: usize,
    /// Characters of a row error message kept in the log.
    pub error_message_limit: usize,
    /// Tables counted at the end of the run.
    pub summary_tables: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        MigrateConfig::default().load_options()
    }
}

/// A row model that may reference a member by legacy id.
trait MemberReference {
    fn member_ref(&mut self) -> &mut Option<i32>;
}

impl MemberReference for Attendee {
    fn member_ref(&mut self) -> &mut Option<i32> {
        &mut self.created_by
    }
}

impl MemberReference for Finance {
    fn member_ref(&mut self) -> &mut Option<i32> {
        &mut self.member_id
    }
}

pub struct Migrator<'s, S: Store + ?Sized> {
    store: &'s mut S,
    options: LoadOptions,
    plan: LoadPlan,
}

impl<'s, S: Store + ?Sized> Migrator<'s, S> {
    pub fn new(store: &'s mut S, options: LoadOptions) -> Result<Self, MigrateError> {
        Ok(Migrator {
            store,
            options,
            plan: LoadPlan::build()?,
        })
    }

    /// Load every table of `dump` and count the final state.
    pub fn run(&mut self, dump: &Dump) -> Result<MigrationReport, MigrateError> {
        let mut report = MigrationReport::new(0);
        let mut surviving_members: Option<HashSet<i32>> = None;

        let order = self.plan.load_order().to_vec();
        info!(order = ?order, "Starting migration");

        for table in order {
            match table {
                LegacyTable::Zone => self.seed_zones(&mut report)?,
                LegacyTable::Hospital => self.load_hospitals(dump, &mut report),
                LegacyTable::Member => {
                    self.clear_reloaded_tables()?;
                    self.load_members(dump, &mut report);
                }
                LegacyTable::Attendee | LegacyTable::Finance => {
                    // Read once, after the member load has settled.
                    let surviving = match surviving_members.take() {
                        Some(ids) => ids,
                        None => {
                            let ids = self
                                .store
                                .member_ids()
                                .map_err(MigrateError::store("reading surviving member ids"))?;
                            debug!(members = ids.len(), "Surviving member ids loaded");
                            ids
                        }
                    };
                    if table == LegacyTable::Attendee {
                        self.load_member_dependents(
                            table,
                            dump,
                            &surviving,
                            true,
                            &mut report,
                            |store: &mut S, row: &Attendee| store.insert_attendee(row),
                        );
                    } else {
                        self.load_member_dependents(
                            table,
                            dump,
                            &surviving,
                            false,
                            &mut report,
                            |store: &mut S, row: &Finance| store.insert_finance(row),
                        );
                    }
                    surviving_members = Some(surviving);
                }
            }
        }

        self.count_final_rows(&mut report);
        report.finish();
        Ok(report)
    }

    fn seed_zones(&mut self, report: &mut MigrationReport) -> Result<(), MigrateError> {
        let counters = report.table_mut(LegacyTable::Zone);

        for zone in &self.options.zones {
            if zone.code.trim().is_empty() {
                return Err(DecodeError::RequiredFieldMissing {
                    table: "zone",
                    field: "code",
                }
                .into());
            }
            counters.discovered += 1;

            match self.store.upsert_zone(zone) {
                Ok(UpsertOutcome::Created) => {
                    counters.created += 1;
                    info!(code = %zone.code, "Zone created");
                }
                Ok(UpsertOutcome::Updated) => {
                    counters.updated += 1;
                    info!(code = %zone.code, "Zone already exists");
                }
                Err(err) if err.is_unique_violation() => {
                    counters.updated += 1;
                    info!(code = %zone.code, "Zone already exists");
                }
                Err(err) => return Err(MigrateError::store("seeding zones")(err)),
            }
        }
        Ok(())
    }

    fn load_hospitals(&mut self, dump: &Dump, report: &mut MigrationReport) {
        let limit = self.options.error_message_limit;
        let counters = report.table_mut(LegacyTable::Hospital);
        let hospitals: Vec<Hospital> = decode_table(dump, LegacyTable::Hospital, counters);

        for hospital in &hospitals {
            match self.store.upsert_hospital(hospital) {
                Ok(UpsertOutcome::Created) => counters.created += 1,
                Ok(UpsertOutcome::Updated) => counters.updated += 1,
                Err(err) => record_failure(counters, LegacyTable::Hospital, &hospital.code, &err, limit, false),
            }
        }

        info!(
            table = "hospital",
            created = counters.created,
            updated = counters.updated,
            failed = counters.failed,
            "Hospitals loaded"
        );
    }

    /// Empty the reloaded tables, dependents first.
    fn clear_reloaded_tables(&mut self) -> Result<(), MigrateError> {
        for table in self.plan.clear_order() {
            let removed = match table {
                LegacyTable::Finance => self.store.clear_finances(),
                LegacyTable::Attendee => self.store.clear_attendees(),
                LegacyTable::Member => self.store.clear_members(),
                LegacyTable::Zone | LegacyTable::Hospital => continue,
            }
            .map_err(MigrateError::store("clearing tables"))?;
            info!(table = %table, removed, "Table cleared");
        }
        Ok(())
    }

    fn load_members(&mut self, dump: &Dump, report: &mut MigrationReport) {
        let limit = self.options.error_message_limit;
        let mut skipped = Vec::new();
        let counters = report.table_mut(LegacyTable::Member);
        let members: Vec<Member> = decode_table(dump, LegacyTable::Member, counters);

        for member in &members {
            let label = row_label(member.id);

            if let Some(email) = member.email.as_deref() {
                match self.store.find_member_by_email(email) {
                    Ok(Some(kept)) => {
                        counters.skipped_duplicates += 1;
                        debug!(legacy_id = ?member.id, kept_id = kept, email, "Duplicate member email skipped");
                        skipped.push(SkippedMember {
                            legacy_id: member.id,
                            email: email.to_string(),
                        });
                        continue;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        record_failure(counters, LegacyTable::Member, &label, &err, limit, false);
                        continue;
                    }
                }
            }

            match self.store.insert_member(member) {
                Ok(()) => counters.created += 1,
                Err(err) => record_failure(counters, LegacyTable::Member, &label, &err, limit, false),
            }
        }

        info!(
            table = "member",
            created = counters.created,
            skipped_duplicates = counters.skipped_duplicates,
            failed = counters.failed,
            "Members loaded"
        );
        report.skipped_members.extend(skipped);
    }

    /// Load attendees or finances, nulling member references that did not
    /// survive the member load.
    fn load_member_dependents<E, F>(
        &mut self,
        table: LegacyTable,
        dump: &Dump,
        surviving: &HashSet<i32>,
        suppress_unique: bool,
        report: &mut MigrationReport,
        insert: F,
    ) where
        E: LegacyEntity + MemberReference,
        F: Fn(&mut S, &E) -> Result<(), StoreError>,
    {
        let limit = self.options.error_message_limit;
        let batch_size = self.options.batch_size.max(1);
        let counters = report.table_mut(table);
        let rows: Vec<E> = decode_table(dump, table, counters);
        let total = rows.len();

        for (index, mut row) in rows.into_iter().enumerate() {
            let reference = row.member_ref();
            if let Some(member_id) = *reference {
                if !surviving.contains(&member_id) {
                    debug!(table = %table, row = index + 1, member_id, "Dangling member reference nulled");
                    *reference = None;
                    counters.fk_repaired += 1;
                }
            }

            match insert(&mut *self.store, &row) {
                Ok(()) => counters.created += 1,
                Err(err) => {
                    let label = (index + 1).to_string();
                    record_failure(counters, table, &label, &err, limit, suppress_unique);
                }
            }

            let processed = index + 1;
            if processed % batch_size == 0 || processed == total {
                info!(table = %table, processed, total, "Progress");
            }
        }

        info!(
            table = %table,
            created = counters.created,
            fk_repaired = counters.fk_repaired,
            failed = counters.failed,
            suppressed = counters.suppressed,
            "Rows loaded"
        );
    }

    fn count_final_rows(&mut self, report: &mut MigrationReport) {
        for table in &self.options.summary_tables {
            let count = match self.store.count_rows(table) {
                Ok(count) => Some(count),
                Err(err) => {
                    warn!(
                        table = %table,
                        error = %truncate_message(&err.to_string(), self.options.error_message_limit),
                        "Could not count rows"
                    );
                    None
                }
            };
            report.final_counts.insert(table.clone(), count);
        }
    }
}

/// Decode every dump row of `table`, counting what is found and dropped.
fn decode_table<E: LegacyEntity>(dump: &Dump, table: LegacyTable, counters: &mut TableReport) -> Vec<E> {
    let Some(rows) = dump.table(table.name()) else {
        info!(table = %table, "No INSERT statements in dump");
        return Vec::new();
    };

    let unparsed = rows.unsupported + rows.unterminated_groups();
    if unparsed > 0 {
        warn!(table = %table, unparsed, "Statements or row groups could not be parsed");
    }
    counters.unparsed += unparsed;

    let mut decoded = Vec::with_capacity(rows.row_count());
    for (index, (header, raw)) in rows.rows().enumerate() {
        counters.discovered += 1;
        match E::from_raw(header, raw) {
            Ok(entity) => decoded.push(entity),
            Err(err) => {
                counters.malformed += 1;
                warn!(table = %table, row = index + 1, error = %err, "Dropping malformed row");
            }
        }
    }

    info!(table = %table, discovered = counters.discovered, "Rows found in dump");
    decoded
}

fn record_failure(
    counters: &mut TableReport,
    table: LegacyTable,
    row: &str,
    err: &StoreError,
    limit: usize,
    suppress_unique: bool,
) {
    if suppress_unique && err.is_unique_violation() {
        counters.suppressed += 1;
        debug!(table = %table, row, "Unique violation suppressed");
        return;
    }
    counters.failed += 1;
    warn!(
        table = %table,
        row,
        error = %truncate_message(&err.to_string(), limit),
        "Row failed"
    );
}

fn row_label(id: Option<i32>) -> String {
    id.map_or_else(|| "-".to_string(), |id| id.to_string())
}

/// Read, parse and load a dump file.
pub fn migrate_file<S: Store + ?Sized>(
    path: &Path,
    store: &mut S,
    options: LoadOptions,
) -> Result<MigrationReport, MigrateError> {
    let text = dump::read_dump(path)?;
    let wanted = LegacyTable::ALL.map(LegacyTable::name);
    let parsed = Dump::parse_tables(&text, &wanted);
    info!(
        statements = parsed.statements_seen(),
        skipped_inserts = parsed.statements_skipped(),
        tables = ?parsed.table_names(),
        "Dump parsed"
    );

    let mut report = Migrator::new(store, options)?.run(&parsed)?;
    report.dump_path = Some(path.display().to_string());
    report.dump_bytes = text.len();
    Ok(report)
}
