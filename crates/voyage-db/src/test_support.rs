//! Fixtures shared by the unit tests of this crate.

use chrono::{NaiveDate, Utc};
use tempfile::TempDir;
use uuid::Uuid;
use voyage_common::config::DatabaseConfig;
use voyage_common::models::Vacation;

use crate::repository::vacations;
use crate::Database;

pub fn date(s: &str) -> NaiveDate {
    s.parse().expect("valid date literal")
}

pub fn vacation(destination: &str, start: &str, end: &str) -> Vacation {
    let now = Utc::now();
    Vacation {
        id: Uuid::now_v7(),
        destination: destination.to_string(),
        description: format!("A week in {destination}"),
        start_date: date(start),
        end_date: date(end),
        price: 499.0,
        image_refs: vec![],
        followers_count: 0,
        created_at: now,
        updated_at: now,
    }
}

/// Insert a vacation row directly, bypassing the catalog.
pub async fn seed(db: &Database, destination: &str, start: &str, end: &str) -> Vacation {
    let v = vacation(destination, start, end);
    vacations::insert_vacation(&db.pool, &v).await.expect("seed vacation");
    v
}

/// A SQLite file in `dir` behind a pool of several connections, so that
/// concurrent tasks really run their transactions side by side.
pub async fn file_backed(dir: &TempDir) -> Database {
    let config = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", dir.path().join("voyage.db").display()),
        max_connections: 8,
        min_connections: 1,
        busy_timeout_ms: 5000,
    };
    let db = Database::connect(&config).await.expect("open file database");
    db.migrate().await.expect("migrate file database");
    db
}
