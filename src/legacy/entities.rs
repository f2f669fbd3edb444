//! Legacy row → target model conversion.

use super::row::{decode_row, decode_row_with_header, DecodedRow};
use super::schema::{TableSchema, ATTENDEE, FINANCE, HOSPITAL, MEMBER};
use super::DecodeError;
use crate::store::{Attendee, Finance, Hospital, Member};

/// A target model that is loaded from one legacy table.
pub trait LegacyEntity: Sized {
    /// Layout of the legacy table this model is read from.
    fn schema() -> &'static TableSchema;

    fn from_row(row: &DecodedRow) -> Result<Self, DecodeError>;

    /// Decode a raw row, honouring the statement's column list when present.
    fn from_raw(header: Option<&[String]>, raw: &[String]) -> Result<Self, DecodeError> {
        let row = match header {
            Some(header) => decode_row_with_header(Self::schema(), header, raw)?,
            None => decode_row(Self::schema(), raw)?,
        };
        Self::from_row(&row)
    }
}

impl LegacyEntity for Hospital {
    fn schema() -> &'static TableSchema {
        &HOSPITAL
    }

    fn from_row(row: &DecodedRow) -> Result<Self, DecodeError> {
        Ok(Hospital {
            code: row.required_str("code")?,
            hospital_type: row.str("hospital_type"),
            name: row.str("name"),
            zone_code: row.str("zone_code"),
            province: row.str("province"),
        })
    }
}

impl LegacyEntity for Member {
    fn schema() -> &'static TableSchema {
        &MEMBER
    }

    fn from_row(row: &DecodedRow) -> Result<Self, DecodeError> {
        Ok(Member {
            id: row.int("id"),
            hospital_code: row.str("hospital_code"),
            email: row.str("email"),
            password: row.str("password"),
            prefix: row.str("prefix"),
            first_name: row.str("first_name"),
            last_name: row.str("last_name"),
            position: row.str("position"),
            phone: row.str("phone"),
            status: row.int("status"),
            created_at: row.date("created_at"),
        })
    }
}

impl LegacyEntity for Attendee {
    fn schema() -> &'static TableSchema {
        &ATTENDEE
    }

    fn from_row(row: &DecodedRow) -> Result<Self, DecodeError> {
        Ok(Attendee {
            id: row.int("id"),
            hospital_code: row.str("hospital_code"),
            prefix: row.str("prefix"),
            first_name: row.str("first_name"),
            last_name: row.str("last_name"),
            position: row.str("position"),
            phone: row.str("phone"),
            email: row.str("email"),
            food_type: row.str("food_type"),
            hotel_name: row.str("hotel_name"),
            check_in: row.date("check_in"),
            check_out: row.date("check_out"),
            status: row.int("status"),
            created_by: row.int("who"),
            created_at: row.date("created_at"),
        })
    }
}

impl LegacyEntity for Finance {
    fn schema() -> &'static TableSchema {
        &FINANCE
    }

    fn from_row(row: &DecodedRow) -> Result<Self, DecodeError> {
        Ok(Finance {
            id: row.int("id"),
            hospital_code: row.str("hospital_code"),
            amount: row.float("amount"),
            paid_at: row.date("paid_at"),
            slip_file: row.str("slip_file"),
            status: row.int("status"),
            note: row.str("note"),
            member_id: row.int("who"),
            created_at: row.date("created_at"),
        })
    }
}
