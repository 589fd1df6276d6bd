//! Manual `sqlx::FromRow<'_, sqlx::any::AnyRow>` implementations for the
//! Voyage model types.
//!
//! `sqlx::AnyPool` only decodes primitive types natively (i64, f64, bool,
//! String, bytes). UUID, date and timestamp columns are stored as TEXT and
//! parsed here; the image list is a JSON array stored as TEXT.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{any::AnyRow, FromRow, Row};
use uuid::Uuid;

use crate::models::{DestinationStat, Follow, Vacation, VacationListing};

// ── Column helpers ────────────────────────────────────────────────────────────

fn decode_err<E>(e: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(e))
}

pub fn get_uuid(row: &AnyRow, col: &str) -> Result<Uuid, sqlx::Error> {
    let s: String = row.try_get(col)?;
    Uuid::parse_str(&s).map_err(decode_err)
}

pub fn get_date(row: &AnyRow, col: &str) -> Result<NaiveDate, sqlx::Error> {
    let s: String = row.try_get(col)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(decode_err)
}

pub fn get_datetime(row: &AnyRow, col: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let s: String = row.try_get(col)?;
    parse_datetime(&s).map_err(sqlx::Error::Decode)
}

fn parse_datetime(
    s: &str,
) -> Result<DateTime<Utc>, Box<dyn std::error::Error + Send + Sync + 'static>> {
    // Written by us as RFC 3339
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Rows inserted by hand with CURRENT_TIMESTAMP: "2024-01-15 10:30:00"
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(dt.and_utc());
    }
    Err(format!("cannot parse timestamp: {s}").into())
}

/// Decode a JSON-array-of-strings column → Vec<String>
pub fn get_string_vec(row: &AnyRow, col: &str) -> Result<Vec<String>, sqlx::Error> {
    let s: String = row.try_get(col)?;
    decode_string_vec(&s)
}

pub fn decode_string_vec(s: &str) -> Result<Vec<String>, sqlx::Error> {
    if s.is_empty() || s == "[]" {
        return Ok(vec![]);
    }
    serde_json::from_str(s).map_err(decode_err)
}

/// Encode a list of strings for a JSON-array TEXT column.
pub fn encode_string_vec(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

// ── Model impls ───────────────────────────────────────────────────────────────

impl<'r> FromRow<'r, AnyRow> for Vacation {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: get_uuid(row, "id")?,
            destination: row.try_get("destination")?,
            description: row.try_get("description")?,
            start_date: get_date(row, "start_date")?,
            end_date: get_date(row, "end_date")?,
            price: row.try_get("price")?,
            image_refs: get_string_vec(row, "image_refs")?,
            followers_count: row.try_get("followers_count")?,
            created_at: get_datetime(row, "created_at")?,
            updated_at: get_datetime(row, "updated_at")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for VacationListing {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        let follow_rows: i64 = row.try_get("follow_rows")?;
        Ok(Self {
            vacation: Vacation::from_row(row)?,
            is_following: follow_rows > 0,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for Follow {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: get_uuid(row, "id")?,
            user_id: get_uuid(row, "user_id")?,
            vacation_id: get_uuid(row, "vacation_id")?,
            created_at: get_datetime(row, "created_at")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for DestinationStat {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            destination: row.try_get("destination")?,
            followers_count: row.try_get("followers_count")?,
        })
    }
}
