//! End-to-end migration tests against the in-memory store

use std::collections::HashSet;
use std::io::Write;

use confreg_migrate::migrate::SkippedMember;
use confreg_migrate::store::{Attendee, Finance, Hospital, Member, Zone};
use confreg_migrate::{
    migrate_file, parse_insert_values, Dump, LegacyTable, LoadOptions, MemoryStore, MigrateError,
    Migrator, Store, StoreError, UpsertOutcome,
};
use pretty_assertions::assert_eq;

const HOSPITAL_DUMP: &str = "\
-- MySQL dump 10.13  Distrib 5.7.44
/*!40101 SET NAMES utf8 */;
DROP TABLE IF EXISTS `hospital`;
LOCK TABLES `hospital` WRITE;
INSERT INTO `hospital` (`code`, `hospital_type`, `name`, `zone_code`, `province`) VALUES ('H001','A','Test Hospital','Z01','Bangkok');
UNLOCK TABLES;
";

fn run(store: &mut MemoryStore, sql: &str) -> confreg_migrate::MigrationReport {
    Migrator::new(store, LoadOptions::default())
        .unwrap()
        .run(&Dump::parse(sql))
        .unwrap()
}

#[test]
fn test_hospital_load_is_idempotent() {
    let mut store = MemoryStore::new();

    let first = run(&mut store, HOSPITAL_DUMP);
    assert_eq!(first.table(LegacyTable::Hospital).created, 1);

    let second = run(&mut store, HOSPITAL_DUMP);
    assert_eq!(second.table(LegacyTable::Hospital).created, 0);
    assert_eq!(second.table(LegacyTable::Hospital).updated, 1);

    assert_eq!(
        store.hospitals(),
        vec![&Hospital {
            code: "H001".to_string(),
            hospital_type: Some("A".to_string()),
            name: Some("Test Hospital".to_string()),
            zone_code: Some("Z01".to_string()),
            province: Some("Bangkok".to_string()),
        }]
    );
    assert_eq!(second.final_counts["hospital"], Some(1));
}

#[test]
fn test_zone_seeding_twice_keeps_one_row() {
    let mut store = MemoryStore::new();
    let first = run(&mut store, "");
    let second = run(&mut store, "");

    assert_eq!(first.table(LegacyTable::Zone).created, 1);
    assert_eq!(second.table(LegacyTable::Zone).created, 0);
    assert_eq!(second.table(LegacyTable::Zone).updated, 1);
    assert_eq!(store.zones().len(), 1);
    assert_eq!(store.zones()[0].code, "C01");
}

const MEMBERS: &str = "\
INSERT INTO `member` VALUES \
(1,'H001','dup@x.org','pw','Dr.','Ann','Lee','Nurse','081',1,'2024-06-08 12:25:07'),\
(2,'H001','dup@x.org','pw','Mr.','Bob','Tan','Doctor','082',1,'2024-06-08 12:30:00'),\
(3,'H002','c@x.org','pw','Ms.','Cat','Ng','Admin','083',1,'1976-01-01 00:00:00');
";

#[test]
fn test_member_dedup_first_write_wins() {
    let mut store = MemoryStore::new();
    let report = run(&mut store, MEMBERS);

    let members = report.table(LegacyTable::Member);
    assert_eq!(members.discovered, 3);
    assert_eq!(members.created, 2);
    assert_eq!(members.skipped_duplicates, 1);
    assert_eq!(
        report.skipped_members,
        vec![SkippedMember {
            legacy_id: Some(2),
            email: "dup@x.org".to_string()
        }]
    );

    let kept: Vec<&Member> = store.members().iter().filter(|m| m.email.as_deref() == Some("dup@x.org")).collect();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].id, Some(1));
    assert_eq!(kept[0].first_name.as_deref(), Some("Ann"));

    // Sentinel dates never reach the store.
    let cat = store.members().iter().find(|m| m.id == Some(3)).unwrap();
    assert_eq!(cat.created_at, None);
}

#[test]
fn test_members_are_reloaded_from_scratch() {
    let mut store = MemoryStore::new();
    run(&mut store, MEMBERS);
    let report = run(&mut store, MEMBERS);

    assert_eq!(report.table(LegacyTable::Member).created, 2);
    assert_eq!(store.members().len(), 2);
}

#[test]
fn test_member_after_largest_legacy_id_fails_without_panicking() {
    let sql = "\
INSERT INTO `member` VALUES \
(2147483647,'H001','max@x.org','pw','Dr.','Ann','Lee','Nurse','081',1,'2024-06-08 12:25:07'),\
('n/a','H001','next@x.org','pw','Mr.','Bob','Tan','Doctor','082',1,'2024-06-08 12:30:00');
";
    let mut store = MemoryStore::new();
    let report = run(&mut store, sql);

    let members = report.table(LegacyTable::Member);
    assert_eq!(members.created, 1);
    assert_eq!(members.failed, 1);
    assert_eq!(store.members().len(), 1);
    assert_eq!(store.members()[0].id, Some(i32::MAX));
}

#[test]
fn test_dangling_member_references_are_nulled() {
    let sql = format!(
        "{MEMBERS}\
INSERT INTO `attendee` VALUES \
(10,'H001','Dr.','Ann','Lee','Nurse','081','dup@x.org','normal','Grand','2024-06-07','2024-06-09',1,1,'2024-05-01 08:00:00'),\
(11,'H001','Mr.','Bob','Tan','Doctor','082','b@x.org','halal','Grand','2024-06-07','2024-06-09',1,2,'2024-05-01 08:00:00'),\
(12,'H002','Ms.','Cat','Ng','Admin','083','c@x.org','vegan',NULL,NULL,NULL,1,NULL,'2024-05-01 08:00:00');
INSERT INTO `finance` VALUES \
(5,'H001','3500.00','2024-05-02 10:00:00','slip-5.jpg',1,'first payment',3,'2024-05-02 10:00:00'),\
(6,'H001','1200.50','2024-05-03 10:00:00','slip-6.jpg',1,NULL,99,'2024-05-03 10:00:00');
"
    );
    let mut store = MemoryStore::new();
    let report = run(&mut store, &sql);

    let attendees = report.table(LegacyTable::Attendee);
    assert_eq!(attendees.created, 3);
    assert_eq!(attendees.fk_repaired, 1);

    let created_by: Vec<Option<i32>> = store.attendees().iter().map(|a| a.created_by).collect();
    assert_eq!(created_by, vec![Some(1), None, None]);

    let finances = report.table(LegacyTable::Finance);
    assert_eq!(finances.created, 2);
    assert_eq!(finances.fk_repaired, 1);
    assert_eq!(
        store.finances().iter().map(|f| f.member_id).collect::<Vec<_>>(),
        vec![Some(3), None]
    );
    assert_eq!(store.finances()[1].amount, Some(1200.5));
    assert_eq!(store.finances()[1].note, None);
}

#[test]
fn test_attendee_unique_violations_are_suppressed() {
    let sql = "\
INSERT INTO `attendee` VALUES \
(10,'H001','Dr.','Ann','Lee','Nurse','081','a@x.org','normal','Grand','2024-06-07','2024-06-09',1,NULL,'2024-05-01 08:00:00'),\
(10,'H001','Dr.','Ann','Lee','Nurse','081','a@x.org','normal','Grand','2024-06-07','2024-06-09',1,NULL,'2024-05-01 08:00:00');
INSERT INTO `finance` VALUES \
(5,'H001','10','2024-05-02',NULL,1,NULL,NULL,NULL),\
(5,'H001','10','2024-05-02',NULL,1,NULL,NULL,NULL);
";
    let mut store = MemoryStore::new();
    let report = run(&mut store, sql);

    let attendees = report.table(LegacyTable::Attendee);
    assert_eq!(attendees.created, 1);
    assert_eq!(attendees.suppressed, 1);
    assert_eq!(attendees.failed, 0);

    // Finance collisions are logged as failures, not hidden.
    let finances = report.table(LegacyTable::Finance);
    assert_eq!(finances.created, 1);
    assert_eq!(finances.failed, 1);
    assert_eq!(finances.suppressed, 0);
}

#[test]
fn test_malformed_rows_are_counted_and_dropped() {
    let sql = "\
INSERT INTO `hospital` VALUES ('H001','A','One','Z01','Bangkok'),('H002','B'),(NULL,'C','Three','Z01','Phuket');
INSERT INTO `hospital` VALUES ('H004','A','Four','Z01','Krabi'),('H005','A';
";
    let mut store = MemoryStore::new();
    let report = run(&mut store, sql);

    let hospitals = report.table(LegacyTable::Hospital);
    assert_eq!(hospitals.discovered, 4);
    assert_eq!(hospitals.created, 2);
    assert_eq!(hospitals.malformed, 2);
    assert_eq!(hospitals.unparsed, 1);
}

#[test]
fn test_tokenizer_round_trip() {
    let rows = [
        ["1", "plain", "2024-06-08 12:25:07"],
        ["2", "comma, inside", "NULL"],
        ["3", "paren (inside) text", ""],
        ["4", "O'Brien", "x"],
        ["5", "semi; colon", "y"],
    ];
    let sql = "INSERT INTO `sample` VALUES \
               (1,'plain','2024-06-08 12:25:07'),\
               (2,'comma, inside',NULL),\
               (3,'paren (inside) text',''),\
               (4,'O\\'Brien','x'),\
               (5,'semi; colon','y');";

    let parsed = parse_insert_values(sql, "sample");
    assert_eq!(parsed.len(), rows.len());
    for (got, want) in parsed.iter().zip(rows.iter()) {
        assert_eq!(got, &want.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    }

    let doubled = parse_insert_values("INSERT INTO `sample` VALUES (4,'O''Brien','x');", "sample");
    assert_eq!(doubled[0], parsed[3]);
}

#[test]
fn test_migrate_file_reads_dump_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(HOSPITAL_DUMP.as_bytes()).unwrap();

    let mut store = MemoryStore::new();
    let report = migrate_file(file.path(), &mut store, LoadOptions::default()).unwrap();

    assert_eq!(report.dump_bytes, HOSPITAL_DUMP.len());
    assert_eq!(report.dump_path.as_deref(), Some(file.path().display().to_string().as_str()));
    assert_eq!(store.hospitals().len(), 1);
}

#[test]
fn test_missing_dump_file_is_fatal() {
    let mut store = MemoryStore::new();
    let err = migrate_file("/nonexistent/registration.sql".as_ref(), &mut store, LoadOptions::default())
        .unwrap_err();
    assert!(matches!(err, MigrateError::Dump(_)));
}

/// Store whose zone table is unreachable.
#[derive(Default)]
struct BrokenZoneStore {
    inner: MemoryStore,
}

impl Store for BrokenZoneStore {
    fn upsert_zone(&mut self, _zone: &Zone) -> Result<UpsertOutcome, StoreError> {
        Err(StoreError::Connection("connection reset".to_string()))
    }
    fn upsert_hospital(&mut self, hospital: &Hospital) -> Result<UpsertOutcome, StoreError> {
        self.inner.upsert_hospital(hospital)
    }
    fn clear_members(&mut self) -> Result<usize, StoreError> {
        self.inner.clear_members()
    }
    fn clear_attendees(&mut self) -> Result<usize, StoreError> {
        self.inner.clear_attendees()
    }
    fn clear_finances(&mut self) -> Result<usize, StoreError> {
        self.inner.clear_finances()
    }
    fn find_member_by_email(&mut self, email: &str) -> Result<Option<i32>, StoreError> {
        self.inner.find_member_by_email(email)
    }
    fn insert_member(&mut self, member: &Member) -> Result<(), StoreError> {
        self.inner.insert_member(member)
    }
    fn member_ids(&mut self) -> Result<HashSet<i32>, StoreError> {
        self.inner.member_ids()
    }
    fn insert_attendee(&mut self, attendee: &Attendee) -> Result<(), StoreError> {
        self.inner.insert_attendee(attendee)
    }
    fn insert_finance(&mut self, finance: &Finance) -> Result<(), StoreError> {
        self.inner.insert_finance(finance)
    }
    fn count_rows(&mut self, table: &str) -> Result<i64, StoreError> {
        self.inner.count_rows(table)
    }
}

#[test]
fn test_zone_store_failure_aborts_run() {
    let mut store = BrokenZoneStore::default();
    let err = Migrator::new(&mut store, LoadOptions::default())
        .unwrap()
        .run(&Dump::parse(HOSPITAL_DUMP))
        .unwrap_err();

    assert!(matches!(err, MigrateError::Store { stage: "seeding zones", .. }));
    assert!(store.inner.hospitals().is_empty());
}
