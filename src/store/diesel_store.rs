//! [`Store`] backed by a pooled Diesel connection.

use std::collections::HashSet;

use diesel::prelude::*;
use diesel::sql_types::BigInt;
use tracing::debug;

use super::database::{Database, PooledConnection};
use super::models::{Attendee, Finance, Hospital, Member, Zone};
use super::schema::{attendee, finance, hospital, member, zone};
use super::{is_valid_identifier, Store, StoreError, UpsertOutcome};

#[derive(QueryableByName)]
struct RowCount {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

/// Writes through one connection checked out for the whole run.
///
/// The connection goes back to the pool when the store is dropped.
pub struct DieselStore {
    conn: PooledConnection,
}

impl DieselStore {
    pub fn connect(db: &Database) -> Result<Self, StoreError> {
        Ok(DieselStore {
            conn: db.get_connection()?,
        })
    }
}

#[cfg(feature = "postgres")]
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name)
}

#[cfg(all(feature = "mysql", not(feature = "postgres")))]
fn quote_identifier(name: &str) -> String {
    format!("`{}`", name)
}

/// Point the `id` sequence of `table` just past the largest stored id.
///
/// Explicit legacy ids never advance a `SERIAL` sequence, so without this the
/// first database-assigned id would collide with legacy id 1.
#[cfg(feature = "postgres")]
fn sequence_sync_sql(table: &str) -> String {
    format!(
        "SELECT setval(pg_get_serial_sequence('{table}', 'id'), COALESCE(MAX(id), 0) + 1, false) FROM {}",
        quote_identifier(table)
    )
}

impl DieselStore {
    #[cfg(feature = "postgres")]
    fn sync_id_sequence(&mut self, table: &'static str) -> Result<(), StoreError> {
        let sql = sequence_sync_sql(table);
        debug!(%sql, "Syncing id sequence");
        diesel::sql_query(sql)
            .execute(&mut self.conn)
            .map_err(StoreError::diesel(table))?;
        Ok(())
    }

    // AUTO_INCREMENT already moves past explicitly inserted ids.
    #[cfg(all(feature = "mysql", not(feature = "postgres")))]
    fn sync_id_sequence(&mut self, _table: &'static str) -> Result<(), StoreError> {
        Ok(())
    }
}

impl Store for DieselStore {
    fn upsert_zone(&mut self, record: &Zone) -> Result<UpsertOutcome, StoreError> {
        let existing = zone::table
            .filter(zone::code.eq(&record.code))
            .select(zone::code)
            .first::<String>(&mut self.conn)
            .optional()
            .map_err(StoreError::diesel("zone"))?;

        match existing {
            Some(_) => {
                diesel::update(zone::table.filter(zone::code.eq(&record.code)))
                    .set(record)
                    .execute(&mut self.conn)
                    .map_err(StoreError::diesel("zone"))?;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                diesel::insert_into(zone::table)
                    .values(record)
                    .execute(&mut self.conn)
                    .map_err(StoreError::diesel("zone"))?;
                Ok(UpsertOutcome::Created)
            }
        }
    }

    fn upsert_hospital(&mut self, record: &Hospital) -> Result<UpsertOutcome, StoreError> {
        let existing = hospital::table
            .filter(hospital::code.eq(&record.code))
            .select(hospital::code)
            .first::<String>(&mut self.conn)
            .optional()
            .map_err(StoreError::diesel("hospital"))?;

        match existing {
            Some(_) => {
                diesel::update(hospital::table.filter(hospital::code.eq(&record.code)))
                    .set(record)
                    .execute(&mut self.conn)
                    .map_err(StoreError::diesel("hospital"))?;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                diesel::insert_into(hospital::table)
                    .values(record)
                    .execute(&mut self.conn)
                    .map_err(StoreError::diesel("hospital"))?;
                Ok(UpsertOutcome::Created)
            }
        }
    }

    fn clear_members(&mut self) -> Result<usize, StoreError> {
        diesel::delete(member::table)
            .execute(&mut self.conn)
            .map_err(StoreError::diesel("member"))
    }

    fn clear_attendees(&mut self) -> Result<usize, StoreError> {
        diesel::delete(attendee::table)
            .execute(&mut self.conn)
            .map_err(StoreError::diesel("attendee"))
    }

    fn clear_finances(&mut self) -> Result<usize, StoreError> {
        diesel::delete(finance::table)
            .execute(&mut self.conn)
            .map_err(StoreError::diesel("finance"))
    }

    fn find_member_by_email(&mut self, email: &str) -> Result<Option<i32>, StoreError> {
        member::table
            .filter(member::email.eq(email))
            .select(member::id)
            .first::<i32>(&mut self.conn)
            .optional()
            .map_err(StoreError::diesel("member"))
    }

    fn insert_member(&mut self, record: &Member) -> Result<(), StoreError> {
        if record.id.is_none() {
            self.sync_id_sequence("member")?;
        }
        diesel::insert_into(member::table)
            .values(record)
            .execute(&mut self.conn)
            .map_err(StoreError::diesel("member"))?;
        Ok(())
    }

    fn member_ids(&mut self) -> Result<HashSet<i32>, StoreError> {
        let ids = member::table
            .select(member::id)
            .load::<i32>(&mut self.conn)
            .map_err(StoreError::diesel("member"))?;
        Ok(ids.into_iter().collect())
    }

    fn insert_attendee(&mut self, record: &Attendee) -> Result<(), StoreError> {
        if record.id.is_none() {
            self.sync_id_sequence("attendee")?;
        }
        diesel::insert_into(attendee::table)
            .values(record)
            .execute(&mut self.conn)
            .map_err(StoreError::diesel("attendee"))?;
        Ok(())
    }

    fn insert_finance(&mut self, record: &Finance) -> Result<(), StoreError> {
        if record.id.is_none() {
            self.sync_id_sequence("finance")?;
        }
        diesel::insert_into(finance::table)
            .values(record)
            .execute(&mut self.conn)
            .map_err(StoreError::diesel("finance"))?;
        Ok(())
    }

    fn count_rows(&mut self, table: &str) -> Result<i64, StoreError> {
        if !is_valid_identifier(table) {
            return Err(StoreError::UnknownTable(table.to_string()));
        }
        let sql = format!("SELECT COUNT(*) AS count FROM {}", quote_identifier(table));
        debug!(%sql, "Counting rows");
        let row = diesel::sql_query(sql)
            .get_result::<RowCount>(&mut self.conn)
            .map_err(StoreError::diesel(table))?;
        Ok(row.count)
    }
}
