//! In-process store.
//!
//! Enforces the same keys as the real schema (zone/hospital `code`, member
//! `email`, primary `id`s) so dry runs report the collisions a database load
//! would hit.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use super::models::{Attendee, Finance, Hospital, Member, Zone};
use super::{Store, StoreError, UpsertOutcome};

/// Primary keys handed out for one table.
#[derive(Debug)]
struct IdColumn {
    table: &'static str,
    used: HashSet<i32>,
    max: Option<i32>,
}

impl IdColumn {
    fn new(table: &'static str) -> Self {
        IdColumn {
            table,
            used: HashSet::new(),
            max: None,
        }
    }

    /// Id for the next row: the requested one, or the next value a serial
    /// column would hand out after explicit inserts.
    fn next(&self, requested: Option<i32>) -> Result<i32, StoreError> {
        match requested {
            Some(id) if self.used.contains(&id) => {
                Err(unique_violation(self.table, format!("duplicate key id={}", id)))
            }
            Some(id) => Ok(id),
            None => match self.max {
                None => Ok(1),
                Some(max) => max
                    .checked_add(1)
                    .ok_or_else(|| StoreError::IdsExhausted(self.table.to_string())),
            },
        }
    }

    fn record(&mut self, id: i32) {
        self.used.insert(id);
        self.max = Some(self.max.map_or(id, |max| max.max(id)));
    }

    fn clear(&mut self) {
        self.used.clear();
        self.max = None;
    }
}

#[derive(Debug)]
pub struct MemoryStore {
    zones: IndexMap<String, Zone>,
    hospitals: IndexMap<String, Hospital>,
    members: Vec<Member>,
    member_ids: IdColumn,
    member_emails: HashMap<String, i32>,
    attendees: Vec<Attendee>,
    attendee_ids: IdColumn,
    finances: Vec<Finance>,
    finance_ids: IdColumn,
    /// Row counts of master-data tables the migration does not load.
    other_tables: IndexMap<String, i64>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore {
            zones: IndexMap::new(),
            hospitals: IndexMap::new(),
            members: Vec::new(),
            member_ids: IdColumn::new("member"),
            member_emails: HashMap::new(),
            attendees: Vec::new(),
            attendee_ids: IdColumn::new("attendee"),
            finances: Vec::new(),
            finance_ids: IdColumn::new("finance"),
            other_tables: IndexMap::new(),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a master-data table so `count_rows` can report it.
    pub fn with_table(mut self, name: impl Into<String>, rows: i64) -> Self {
        self.other_tables.insert(name.into().to_lowercase(), rows);
        self
    }

    pub fn zones(&self) -> Vec<&Zone> {
        self.zones.values().collect()
    }

    pub fn hospitals(&self) -> Vec<&Hospital> {
        self.hospitals.values().collect()
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn attendees(&self) -> &[Attendee] {
        &self.attendees
    }

    pub fn finances(&self) -> &[Finance] {
        &self.finances
    }
}

fn unique_violation(table: &str, detail: String) -> StoreError {
    StoreError::UniqueViolation {
        table: table.to_string(),
        detail,
    }
}

impl Store for MemoryStore {
    fn upsert_zone(&mut self, zone: &Zone) -> Result<UpsertOutcome, StoreError> {
        match self.zones.insert(zone.code.clone(), zone.clone()) {
            Some(_) => Ok(UpsertOutcome::Updated),
            None => Ok(UpsertOutcome::Created),
        }
    }

    fn upsert_hospital(&mut self, hospital: &Hospital) -> Result<UpsertOutcome, StoreError> {
        match self.hospitals.insert(hospital.code.clone(), hospital.clone()) {
            Some(_) => Ok(UpsertOutcome::Updated),
            None => Ok(UpsertOutcome::Created),
        }
    }

    fn clear_members(&mut self) -> Result<usize, StoreError> {
        self.member_ids.clear();
        self.member_emails.clear();
        Ok(std::mem::take(&mut self.members).len())
    }

    fn clear_attendees(&mut self) -> Result<usize, StoreError> {
        self.attendee_ids.clear();
        Ok(std::mem::take(&mut self.attendees).len())
    }

    fn clear_finances(&mut self) -> Result<usize, StoreError> {
        self.finance_ids.clear();
        Ok(std::mem::take(&mut self.finances).len())
    }

    fn find_member_by_email(&mut self, email: &str) -> Result<Option<i32>, StoreError> {
        Ok(self.member_emails.get(email).copied())
    }

    fn insert_member(&mut self, member: &Member) -> Result<(), StoreError> {
        if let Some(email) = member.email.as_deref() {
            if self.member_emails.contains_key(email) {
                return Err(unique_violation("member", format!("duplicate key email={}", email)));
            }
        }
        let id = self.member_ids.next(member.id)?;
        self.member_ids.record(id);
        if let Some(email) = &member.email {
            self.member_emails.insert(email.clone(), id);
        }
        self.members.push(Member {
            id: Some(id),
            ..member.clone()
        });
        Ok(())
    }

    fn member_ids(&mut self) -> Result<HashSet<i32>, StoreError> {
        Ok(self.member_ids.used.clone())
    }

    fn insert_attendee(&mut self, attendee: &Attendee) -> Result<(), StoreError> {
        let id = self.attendee_ids.next(attendee.id)?;
        self.attendee_ids.record(id);
        self.attendees.push(Attendee {
            id: Some(id),
            ..attendee.clone()
        });
        Ok(())
    }

    fn insert_finance(&mut self, finance: &Finance) -> Result<(), StoreError> {
        let id = self.finance_ids.next(finance.id)?;
        self.finance_ids.record(id);
        self.finances.push(Finance {
            id: Some(id),
            ..finance.clone()
        });
        Ok(())
    }

    fn count_rows(&mut self, table: &str) -> Result<i64, StoreError> {
        let count = match table.to_lowercase().as_str() {
            "zone" => self.zones.len(),
            "hospital" => self.hospitals.len(),
            "member" => self.members.len(),
            "attendee" => self.attendees.len(),
            "finance" => self.finances.len(),
            other => {
                return self
                    .other_tables
                    .get(other)
                    .copied()
                    .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
            }
        };
        Ok(count as i64)
    }
}
