//! Diesel models for the target schema.
//!
//! Loaded tables keep their legacy numeric ids, so `id` is optional on insert:
//! `None` lets the database assign one. Every other `None` is written as
//! `NULL`, never as the column default, so a placeholder legacy date stays
//! null in the target.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use super::schema::{attendee, finance, hospital, member, zone};

#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = zone, primary_key(code))]
pub struct Zone {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = hospital, primary_key(code), treat_none_as_null = true, treat_none_as_default_value = false)]
pub struct Hospital {
    pub code: String,
    pub hospital_type: Option<String>,
    pub name: Option<String>,
    pub zone_code: Option<String>,
    pub province: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = member, treat_none_as_default_value = false)]
pub struct Member {
    #[diesel(treat_none_as_default_value = true)]
    pub id: Option<i32>,
    pub hospital_code: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub prefix: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub status: Option<i32>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = attendee, treat_none_as_default_value = false)]
pub struct Attendee {
    #[diesel(treat_none_as_default_value = true)]
    pub id: Option<i32>,
    pub hospital_code: Option<String>,
    pub prefix: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub food_type: Option<String>,
    pub hotel_name: Option<String>,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub status: Option<i32>,
    /// Member who registered this attendee; null when that member did not survive.
    pub created_by: Option<i32>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = finance, treat_none_as_default_value = false)]
pub struct Finance {
    #[diesel(treat_none_as_default_value = true)]
    pub id: Option<i32>,
    pub hospital_code: Option<String>,
    pub amount: Option<f64>,
    pub paid_at: Option<NaiveDateTime>,
    pub slip_file: Option<String>,
    pub status: Option<i32>,
    pub note: Option<String>,
    pub member_id: Option<i32>,
    pub created_at: Option<NaiveDateTime>,
}
