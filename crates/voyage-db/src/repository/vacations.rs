//! Vacation repository: row-level queries on the `vacations` table.
//!
//! Every function is generic over the executor so it can run on the pool or
//! inside a transaction owned by the catalog / coordinator.

use chrono::NaiveDate;
use sqlx::{Any, Executor};
use uuid::Uuid;
use voyage_common::any_row::{decode_string_vec, encode_string_vec};
use voyage_common::models::{DestinationStat, ListFilters, Vacation, VacationListing};

const VACATION_COLUMNS: &str = "v.id, v.destination, v.description, v.start_date, v.end_date, \
     v.price, v.image_refs, v.followers_count, v.created_at, v.updated_at";

#[derive(sqlx::FromRow)]
struct CountRow {
    count: i64,
}

// ============================================================
// Create
// ============================================================

/// Insert a fully-formed vacation row.
pub async fn insert_vacation<'e, E>(executor: E, vacation: &Vacation) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query(
        r#"
        INSERT INTO vacations (
            id, destination, description, start_date, end_date,
            price, image_refs, followers_count, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(vacation.id.to_string())
    .bind(vacation.destination.as_str())
    .bind(vacation.description.as_str())
    .bind(vacation.start_date.to_string())
    .bind(vacation.end_date.to_string())
    .bind(vacation.price)
    .bind(encode_string_vec(&vacation.image_refs))
    .bind(vacation.followers_count)
    .bind(vacation.created_at.to_rfc3339())
    .bind(vacation.updated_at.to_rfc3339())
    .execute(executor)
    .await?;
    Ok(())
}

// ============================================================
// Read
// ============================================================

/// Find a vacation by ID.
pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Vacation>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, Vacation>(&format!(
        "SELECT {VACATION_COLUMNS} FROM vacations v WHERE v.id = $1"
    ))
    .bind(id.to_string())
    .fetch_optional(executor)
    .await
}

/// Current follower count of a vacation, `None` if it does not exist.
pub async fn followers_count<'e, E>(executor: E, id: Uuid) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT followers_count FROM vacations WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(executor)
            .await?;
    Ok(row.map(|r| r.0))
}

/// Whether a vacation other than `except` lists `image_ref`.
pub async fn image_ref_in_use<'e, E>(executor: E, image_ref: &str, except: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    // `image_refs` is a JSON array of strings; refs are checked to contain no
    // LIKE wildcards before they are stored.
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vacations WHERE id <> $1 AND image_refs LIKE $2")
        .bind(except.to_string())
        .bind(format!("%\"{image_ref}\"%"))
        .fetch_one(executor)
        .await?;
    Ok(row.0 > 0)
}

// ============================================================
// Update
// ============================================================

/// Overwrite the editable columns of a vacation, provided its image list is
/// still `expected_image_refs`. The follower count is not touched here.
/// Returns false if no row matched (deleted, or images changed concurrently).
pub async fn update_vacation<'e, E>(
    executor: E,
    vacation: &Vacation,
    expected_image_refs: &[String],
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let result = sqlx::query(
        r#"
        UPDATE vacations SET
            destination = $2,
            description = $3,
            start_date = $4,
            end_date = $5,
            price = $6,
            image_refs = $7,
            updated_at = $8
        WHERE id = $1 AND image_refs = $9
        "#,
    )
    .bind(vacation.id.to_string())
    .bind(vacation.destination.as_str())
    .bind(vacation.description.as_str())
    .bind(vacation.start_date.to_string())
    .bind(vacation.end_date.to_string())
    .bind(vacation.price)
    .bind(encode_string_vec(&vacation.image_refs))
    .bind(vacation.updated_at.to_rfc3339())
    .bind(encode_string_vec(expected_image_refs))
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Increment the follower count. Returns the new count, `None` if the row is gone.
pub async fn increment_followers<'e, E>(executor: E, id: Uuid) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        UPDATE vacations
        SET followers_count = followers_count + 1
        WHERE id = $1
        RETURNING followers_count
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(executor)
    .await?;
    Ok(row.map(|r| r.0))
}

/// Decrement the follower count, floored at zero. Returns the new count.
pub async fn decrement_followers<'e, E>(executor: E, id: Uuid) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        UPDATE vacations
        SET followers_count = CASE WHEN followers_count > 0 THEN followers_count - 1 ELSE 0 END
        WHERE id = $1
        RETURNING followers_count
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(executor)
    .await?;
    Ok(row.map(|r| r.0))
}

// ============================================================
// Delete
// ============================================================

/// Delete a vacation row, returning the image refs it held at deletion time.
/// `None` if it did not exist.
pub async fn delete_vacation<'e, E>(executor: E, id: Uuid) -> Result<Option<Vec<String>>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let row: Option<(String,)> = sqlx::query_as("DELETE FROM vacations WHERE id = $1 RETURNING image_refs")
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;
    row.map(|(refs,)| decode_string_vec(&refs)).transpose()
}

// ============================================================
// Listing
// ============================================================

/// Positional parameters for a filtered query. Each distinct value is bound
/// once and referenced by every clause that needs it.
#[derive(Default)]
struct Params {
    values: Vec<String>,
    user: Option<String>,
    today: Option<String>,
}

impl Params {
    fn push(&mut self, value: String) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }

    fn user(&mut self, user_id: Uuid) -> String {
        if let Some(p) = &self.user {
            return p.clone();
        }
        let p = self.push(user_id.to_string());
        self.user = Some(p.clone());
        p
    }

    fn today(&mut self, today: NaiveDate) -> String {
        if let Some(p) = &self.today {
            return p.clone();
        }
        let p = self.push(today.to_string());
        self.today = Some(p.clone());
        p
    }
}

fn where_clause(filters: ListFilters, user_id: Uuid, today: NaiveDate, params: &mut Params) -> String {
    let mut clauses = Vec::new();
    if filters.followed_only {
        let user = params.user(user_id);
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM vacation_follows f WHERE f.vacation_id = v.id AND f.user_id = {user})"
        ));
    }
    if filters.active_only {
        let today = params.today(today);
        clauses.push(format!("v.start_date <= {today} AND v.end_date >= {today}"));
    }
    if filters.upcoming_only {
        let today = params.today(today);
        clauses.push(format!("v.start_date > {today}"));
    }

    if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    }
}

/// Count the vacations matching the filters.
pub async fn count_filtered<'e, E>(
    executor: E,
    user_id: Uuid,
    filters: ListFilters,
    today: NaiveDate,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let mut params = Params::default();
    let filter = where_clause(filters, user_id, today, &mut params);
    let sql = format!("SELECT COUNT(*) AS count FROM vacations v {filter}");

    let mut query = sqlx::query_as::<_, CountRow>(&sql);
    for value in params.values {
        query = query.bind(value);
    }
    Ok(query.fetch_one(executor).await?.count)
}

/// One page of vacations matching the filters, ordered by start date then id.
pub async fn list_filtered<'e, E>(
    executor: E,
    user_id: Uuid,
    filters: ListFilters,
    today: NaiveDate,
    limit: i64,
    offset: i64,
) -> Result<Vec<VacationListing>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let mut params = Params::default();
    let user = params.user(user_id);
    let filter = where_clause(filters, user_id, today, &mut params);
    let limit_param = format!("${}", params.values.len() + 1);
    let offset_param = format!("${}", params.values.len() + 2);

    let sql = format!(
        r#"
        SELECT {VACATION_COLUMNS},
            (SELECT COUNT(*) FROM vacation_follows f
             WHERE f.vacation_id = v.id AND f.user_id = {user}) AS follow_rows
        FROM vacations v
        {filter}
        ORDER BY v.start_date ASC, v.id ASC
        LIMIT {limit_param} OFFSET {offset_param}
        "#
    );

    let mut query = sqlx::query_as::<_, VacationListing>(&sql);
    for value in params.values {
        query = query.bind(value);
    }
    query.bind(limit).bind(offset).fetch_all(executor).await
}

/// Follower count per vacation, for the admin chart and export.
pub async fn destination_stats<'e, E>(executor: E) -> Result<Vec<DestinationStat>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, DestinationStat>(
        r#"
        SELECT destination, followers_count
        FROM vacations
        ORDER BY destination ASC, id ASC
        "#,
    )
    .fetch_all(executor)
    .await
}
