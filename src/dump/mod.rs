//! mysqldump text → raw rows.
//!
//! The dump is split into statements structurally (see [`split_statements`]),
//! INSERT statements are recognised by their header, and each VALUES clause is
//! decomposed into [`RawRow`]s. Nothing here knows what the columns mean; that
//! is the job of [`crate::legacy`].

mod lexer;
mod values;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::DumpError;

pub use lexer::{split_statements, Statements};
pub use values::parse_row_values;

/// Untyped tokens of one VALUES group, in source column order.
pub type RawRow = Vec<String>;

static INSERT_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)^INSERT\s+(?:(?:LOW_PRIORITY|DELAYED|HIGH_PRIORITY|IGNORE)\s+)*INTO\s+(?:(?:`[^`]*`|[A-Za-z0-9_$]+)\s*\.\s*)?(?:`([^`]+)`|"([^"]+)"|([A-Za-z0-9_$]+))\s*"#,
    )
    .expect("static INSERT header regex")
});

static VALUES_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*VALUES?\b").expect("static VALUES regex"));

/// One INSERT statement for a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    /// Table name as written in the dump, without quoting.
    pub table: String,
    /// Explicit column list, when the dump was written with complete inserts.
    pub columns: Option<Vec<String>>,
    pub rows: Vec<RawRow>,
    /// Row groups lost to unbalanced parentheses or unterminated strings.
    pub unterminated_groups: usize,
}

/// Every INSERT statement of one table, in file order.
#[derive(Debug, Default, Clone)]
pub struct TableDump {
    pub statements: Vec<InsertStatement>,
    /// INSERT statements for this table that had no VALUES clause
    /// (`INSERT ... SELECT`, `INSERT ... SET`).
    pub unsupported: usize,
}

impl TableDump {
    /// Rows across all statements, each with the column list it was written with.
    pub fn rows(&self) -> impl Iterator<Item = (Option<&[String]>, &RawRow)> {
        self.statements.iter().flat_map(|stmt| {
            let header = stmt.columns.as_deref();
            stmt.rows.iter().map(move |row| (header, row))
        })
    }

    pub fn row_count(&self) -> usize {
        self.statements.iter().map(|s| s.rows.len()).sum()
    }

    pub fn unterminated_groups(&self) -> usize {
        self.statements.iter().map(|s| s.unterminated_groups).sum()
    }
}

/// INSERT statements of a whole dump, indexed by lower-cased table name.
#[derive(Debug, Default, Clone)]
pub struct Dump {
    tables: HashMap<String, TableDump>,
    statements_seen: usize,
    statements_skipped: usize,
}

impl Dump {
    /// Parse a dump in a single pass, keeping every table.
    pub fn parse(text: &str) -> Self {
        Self::parse_filtered(text, |_| true)
    }

    /// Parse a dump in a single pass, keeping only the named tables
    /// (case-insensitive).
    ///
    /// INSERT statements of other tables are recognised and counted but their
    /// rows are never tokenized, so large unrelated tables cost no memory.
    pub fn parse_tables(text: &str, tables: &[&str]) -> Self {
        let wanted: HashSet<String> = tables.iter().map(|t| t.to_lowercase()).collect();
        Self::parse_filtered(text, |key| wanted.contains(key))
    }

    fn parse_filtered(text: &str, keep: impl Fn(&str) -> bool) -> Self {
        let mut dump = Dump::default();

        for statement in split_statements(text) {
            dump.statements_seen += 1;
            let Some(header) = INSERT_HEADER.captures(statement) else {
                continue;
            };
            let table = header
                .get(1)
                .or_else(|| header.get(2))
                .or_else(|| header.get(3))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let key = table.to_lowercase();
            if !keep(&key) {
                dump.statements_skipped += 1;
                continue;
            }
            let rest = &statement[header.get(0).map_or(0, |m| m.end())..];

            match parse_insert_body(table, rest) {
                Some(insert) => {
                    if insert.unterminated_groups > 0 {
                        tracing::warn!(
                            table = %insert.table,
                            groups = insert.unterminated_groups,
                            "INSERT statement ended inside an open row group"
                        );
                    }
                    dump.tables.entry(key).or_default().statements.push(insert);
                }
                None => {
                    tracing::debug!(table = %key, "INSERT without VALUES clause skipped");
                    dump.tables.entry(key).or_default().unsupported += 1;
                }
            }
        }

        dump
    }

    /// Statements and rows recorded for `table` (case-insensitive).
    pub fn table(&self, table: &str) -> Option<&TableDump> {
        self.tables.get(&table.to_lowercase())
    }

    /// Names (lower-cased) of every table that had at least one INSERT.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of top-level statements in the dump, of any kind.
    pub fn statements_seen(&self) -> usize {
        self.statements_seen
    }

    /// INSERT statements left unparsed because their table was filtered out.
    pub fn statements_skipped(&self) -> usize {
        self.statements_skipped
    }

    /// Take the raw rows of `table`, dropping per-statement column lists.
    pub fn into_rows(mut self, table: &str) -> Vec<RawRow> {
        self.tables
            .remove(&table.to_lowercase())
            .map(|t| t.statements.into_iter().flat_map(|s| s.rows).collect())
            .unwrap_or_default()
    }
}

/// Parse everything after `INSERT INTO <table>`: optional column list, the
/// VALUES keyword, and the row groups.
fn parse_insert_body(table: String, rest: &str) -> Option<InsertStatement> {
    let mut rest = rest.trim_start();
    let mut columns = None;

    if let Some(list) = rest.strip_prefix('(') {
        let close = list.find(')')?;
        columns = Some(parse_column_list(&list[..close]));
        rest = &list[close + 1..];
    }

    let keyword = VALUES_KEYWORD.find(rest)?;
    let groups = values::scan_groups(&rest[keyword.end()..]);

    let rows = groups
        .inner
        .into_iter()
        .map(parse_row_values)
        .filter(|row| !row.is_empty())
        .collect();

    Some(InsertStatement {
        table,
        columns,
        rows,
        unterminated_groups: groups.unterminated,
    })
}

fn parse_column_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|name| {
            name.trim()
                .trim_matches(|c| lexer::is_quote(c))
                .trim()
                .to_string()
        })
        .collect()
}

/// Extract the raw rows of every `INSERT INTO <table>` statement in `text`.
///
/// Matching on the table name is case-insensitive; statements for other tables
/// and non-INSERT statements are ignored.
pub fn parse_insert_values(text: &str, table: &str) -> Vec<RawRow> {
    Dump::parse_tables(text, &[table]).into_rows(table)
}

/// Read a dump file fully into memory.
///
/// Invalid UTF-8 is replaced rather than rejected; legacy dumps are not always
/// clean.
pub fn read_dump(path: &Path) -> Result<String, DumpError> {
    let bytes = std::fs::read(path).map_err(|source| DumpError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(
        path = %path.display(),
        size_mb = %format!("{:.2}", bytes.len() as f64 / (1024.0 * 1024.0)),
        "Loaded dump file"
    );

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            tracing::warn!(
                valid_up_to = err.utf8_error().valid_up_to(),
                "Dump is not valid UTF-8, replacing invalid sequences"
            );
            Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HOSPITAL_DUMP: &str = "\
-- MySQL dump 10.13
DROP TABLE IF EXISTS `hospital`;
CREATE TABLE `hospital` (
  `code` varchar(10) NOT NULL,
  `name` varchar(255) DEFAULT NULL
) ENGINE=InnoDB;
LOCK TABLES `hospital` WRITE;
INSERT INTO `hospital` VALUES ('H001','A','Test Hospital','Z01','Bangkok'),('H002','B','St. Mary''s (North), Annex','Z02','Chiang Mai');
INSERT INTO `member` VALUES (1,'H001','a@x.org');
UNLOCK TABLES;
";

    #[test]
    fn test_parse_insert_values_for_one_table() {
        let rows = parse_insert_values(HOSPITAL_DUMP, "hospital");
        assert_eq!(
            rows,
            vec![
                vec!["H001", "A", "Test Hospital", "Z01", "Bangkok"],
                vec!["H002", "B", "St. Mary's (North), Annex", "Z02", "Chiang Mai"],
            ]
        );
    }

    #[test]
    fn test_table_match_is_case_insensitive() {
        let sql = "insert into `Hospital` values ('H9','A','X','Z','P');";
        assert_eq!(parse_insert_values(sql, "HOSPITAL").len(), 1);
    }

    #[test]
    fn test_other_tables_are_ignored() {
        let rows = parse_insert_values(HOSPITAL_DUMP, "member");
        assert_eq!(rows, vec![vec!["1", "H001", "a@x.org"]]);
        assert!(parse_insert_values(HOSPITAL_DUMP, "finance").is_empty());
    }

    #[test]
    fn test_semicolon_inside_value_does_not_end_statement() {
        let sql = "INSERT INTO `note` VALUES (1,'a; b'),(2,'c');INSERT INTO `note` VALUES (3,'d');";
        let rows = parse_insert_values(sql, "note");
        assert_eq!(rows, vec![vec!["1", "a; b"], vec!["2", "c"], vec!["3", "d"]]);
    }

    #[test]
    fn test_column_list_is_captured() {
        let sql = "INSERT INTO `hospital` (`code`, `name`) VALUES ('H1','One');";
        let dump = Dump::parse(sql);
        let table = dump.table("hospital").unwrap();
        assert_eq!(
            table.statements[0].columns,
            Some(vec!["code".to_string(), "name".to_string()])
        );
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, &vec!["H1".to_string(), "One".to_string()]);
    }

    #[test]
    fn test_bare_and_qualified_table_names() {
        let sql = "INSERT IGNORE INTO hospital VALUES ('H1');\
                   INSERT INTO `legacy`.`hospital` VALUES ('H2');";
        let rows = parse_insert_values(sql, "hospital");
        assert_eq!(rows, vec![vec!["H1"], vec!["H2"]]);
    }

    #[test]
    fn test_insert_without_values_is_counted() {
        let sql = "INSERT INTO `hospital` SELECT * FROM `old_hospital`;";
        let dump = Dump::parse(sql);
        let table = dump.table("hospital").unwrap();
        assert_eq!(table.unsupported, 1);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_unbalanced_group_is_reported() {
        let sql = "INSERT INTO `t` VALUES (1,'a'),(2,'b';\nINSERT INTO `t` VALUES (3,'c');";
        let dump = Dump::parse(sql);
        let table = dump.table("t").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.unterminated_groups(), 1);
    }

    #[test]
    fn test_table_names_and_statement_count() {
        let dump = Dump::parse(HOSPITAL_DUMP);
        assert_eq!(dump.table_names(), vec!["hospital", "member"]);
        assert_eq!(dump.statements_seen(), 6);
    }

    #[test]
    fn test_parse_tables_keeps_only_named_tables() {
        let dump = Dump::parse_tables(HOSPITAL_DUMP, &["HOSPITAL", "finance"]);
        assert_eq!(dump.table_names(), vec!["hospital"]);
        assert!(dump.table("member").is_none());
        assert_eq!(dump.statements_skipped(), 1);
        assert_eq!(dump.statements_seen(), 6);
        assert_eq!(dump.table("hospital").unwrap().row_count(), 2);
    }

    #[test]
    fn test_read_dump_missing_file() {
        let err = read_dump(Path::new("/nonexistent/legacy.sql")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/legacy.sql"));
    }

    #[test]
    fn test_read_dump_replaces_invalid_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"INSERT INTO `t` VALUES ('a\xffb');").unwrap();
        let text = read_dump(file.path()).unwrap();
        assert_eq!(parse_insert_values(&text, "t"), vec![vec!["a\u{fffd}b"]]);
    }
}
