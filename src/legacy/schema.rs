//! Column layouts of the legacy MySQL tables.
//!
//! mysqldump writes `INSERT INTO t VALUES (...)` without column names, so
//! token position is the only thing that ties a value to its column. These
//! layouts make that mapping explicit.

use std::fmt;

/// How a column's raw token is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Str,
    Int,
    Float,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl ColumnDef {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// Ordered column layout of one legacy table.
#[derive(Debug, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableSchema {
    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == column)
    }
}

impl fmt::Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

use ColumnKind::{Date, Float, Int, Str};

pub static HOSPITAL: TableSchema = TableSchema {
    name: "hospital",
    columns: &[
        ColumnDef::new("code", Str),
        ColumnDef::new("hospital_type", Str),
        ColumnDef::new("name", Str),
        ColumnDef::new("zone_code", Str),
        ColumnDef::new("province", Str),
    ],
};

pub static MEMBER: TableSchema = TableSchema {
    name: "member",
    columns: &[
        ColumnDef::new("id", Int),
        ColumnDef::new("hospital_code", Str),
        ColumnDef::new("email", Str),
        ColumnDef::new("password", Str),
        ColumnDef::new("prefix", Str),
        ColumnDef::new("first_name", Str),
        ColumnDef::new("last_name", Str),
        ColumnDef::new("position", Str),
        ColumnDef::new("phone", Str),
        ColumnDef::new("status", Int),
        ColumnDef::new("created_at", Date),
    ],
};

pub static ATTENDEE: TableSchema = TableSchema {
    name: "attendee",
    columns: &[
        ColumnDef::new("id", Int),
        ColumnDef::new("hospital_code", Str),
        ColumnDef::new("prefix", Str),
        ColumnDef::new("first_name", Str),
        ColumnDef::new("last_name", Str),
        ColumnDef::new("position", Str),
        ColumnDef::new("phone", Str),
        ColumnDef::new("email", Str),
        ColumnDef::new("food_type", Str),
        ColumnDef::new("hotel_name", Str),
        ColumnDef::new("check_in", Date),
        ColumnDef::new("check_out", Date),
        ColumnDef::new("status", Int),
        ColumnDef::new("who", Int),
        ColumnDef::new("created_at", Date),
    ],
};

pub static FINANCE: TableSchema = TableSchema {
    name: "finance",
    columns: &[
        ColumnDef::new("id", Int),
        ColumnDef::new("hospital_code", Str),
        ColumnDef::new("amount", Float),
        ColumnDef::new("paid_at", Date),
        ColumnDef::new("slip_file", Str),
        ColumnDef::new("status", Int),
        ColumnDef::new("note", Str),
        ColumnDef::new("who", Int),
        ColumnDef::new("created_at", Date),
    ],
};
