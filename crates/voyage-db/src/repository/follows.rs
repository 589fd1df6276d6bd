//! Follow registry: the `vacation_follows` table.
//!
//! Single source of truth for "is user X following vacation Y". Uniqueness of
//! the (user, vacation) pair is enforced by the table constraint, so two racing
//! inserts cannot both succeed. These functions never touch the denormalized
//! count; the coordinator pairs them with the counter update in one transaction.

use chrono::Utc;
use sqlx::{Any, Executor};
use uuid::Uuid;
use voyage_common::any_row::get_uuid;
use voyage_common::error::{VoyageError, VoyageResult};
use voyage_common::models::Follow;

/// Whether a follow row exists for the pair.
pub async fn exists<'e, E>(executor: E, user_id: Uuid, vacation_id: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM vacation_follows WHERE user_id = $1 AND vacation_id = $2",
    )
    .bind(user_id.to_string())
    .bind(vacation_id.to_string())
    .fetch_one(executor)
    .await?;
    Ok(row.0 > 0)
}

/// Create a follow row. Fails with `DuplicateFollow` if the pair already exists.
pub async fn create<'e, E>(executor: E, user_id: Uuid, vacation_id: Uuid) -> VoyageResult<Follow>
where
    E: Executor<'e, Database = Any>,
{
    let follow = Follow {
        id: Uuid::now_v7(),
        user_id,
        vacation_id,
        created_at: Utc::now(),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO vacation_follows (id, user_id, vacation_id, created_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, vacation_id) DO NOTHING
        "#,
    )
    .bind(follow.id.to_string())
    .bind(user_id.to_string())
    .bind(vacation_id.to_string())
    .bind(follow.created_at.to_rfc3339())
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(VoyageError::DuplicateFollow);
    }
    Ok(follow)
}

/// Delete the follow row for the pair. Fails with `NotFollowing` if there is none.
pub async fn delete<'e, E>(executor: E, user_id: Uuid, vacation_id: Uuid) -> VoyageResult<()>
where
    E: Executor<'e, Database = Any>,
{
    let result = sqlx::query("DELETE FROM vacation_follows WHERE user_id = $1 AND vacation_id = $2")
        .bind(user_id.to_string())
        .bind(vacation_id.to_string())
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(VoyageError::NotFollowing);
    }
    Ok(())
}

/// Remove every follow of a vacation (vacation deletion cascade).
pub async fn delete_all_for_vacation<'e, E>(executor: E, vacation_id: Uuid) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let result = sqlx::query("DELETE FROM vacation_follows WHERE vacation_id = $1")
        .bind(vacation_id.to_string())
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Remove every follow of a user (user deletion cascade). Returns the ids of
/// the vacations whose follow rows this statement deleted.
pub async fn delete_all_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let rows = sqlx::query("DELETE FROM vacation_follows WHERE user_id = $1 RETURNING vacation_id")
        .bind(user_id.to_string())
        .fetch_all(executor)
        .await?;
    rows.iter().map(|row| get_uuid(row, "vacation_id")).collect()
}

/// Number of follow rows for a vacation.
pub async fn count_for_vacation<'e, E>(executor: E, vacation_id: Uuid) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vacation_follows WHERE vacation_id = $1")
        .bind(vacation_id.to_string())
        .fetch_one(executor)
        .await?;
    Ok(row.0)
}

/// Follows of a user, oldest first.
pub async fn list_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Follow>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, Follow>(
        r#"
        SELECT id, user_id, vacation_id, created_at
        FROM vacation_follows
        WHERE user_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(executor)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::seed;
    use crate::Database;

    #[tokio::test]
    async fn create_then_exists() {
        let db = Database::connect_in_memory().await.unwrap();
        let v = seed(&db, "Lisbon", "2030-05-01", "2030-05-08").await;
        let user = Uuid::now_v7();

        assert!(!exists(&db.pool, user, v.id).await.unwrap());
        let follow = create(&db.pool, user, v.id).await.unwrap();
        assert_eq!(follow.vacation_id, v.id);
        assert!(exists(&db.pool, user, v.id).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_pair_is_rejected_by_constraint() {
        let db = Database::connect_in_memory().await.unwrap();
        let v = seed(&db, "Lisbon", "2030-05-01", "2030-05-08").await;
        let user = Uuid::now_v7();

        create(&db.pool, user, v.id).await.unwrap();
        let err = create(&db.pool, user, v.id).await.unwrap_err();
        assert!(matches!(err, VoyageError::DuplicateFollow));
        assert_eq!(count_for_vacation(&db.pool, v.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn deleting_missing_follow_reports_not_following() {
        let db = Database::connect_in_memory().await.unwrap();
        let v = seed(&db, "Lisbon", "2030-05-01", "2030-05-08").await;

        let err = delete(&db.pool, Uuid::now_v7(), v.id).await.unwrap_err();
        assert!(matches!(err, VoyageError::NotFollowing));
    }

    #[tokio::test]
    async fn bulk_deletes_are_scoped() {
        let db = Database::connect_in_memory().await.unwrap();
        let a = seed(&db, "Lisbon", "2030-05-01", "2030-05-08").await;
        let b = seed(&db, "Porto", "2030-06-01", "2030-06-08").await;
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();

        for (user, vacation) in [(alice, a.id), (alice, b.id), (bob, a.id)] {
            create(&db.pool, user, vacation).await.unwrap();
        }

        let mut removed = delete_all_for_user(&db.pool, alice).await.unwrap();
        removed.sort_unstable();
        let mut expected = vec![a.id, b.id];
        expected.sort_unstable();
        assert_eq!(removed, expected);
        assert_eq!(count_for_vacation(&db.pool, a.id).await.unwrap(), 1);

        assert_eq!(delete_all_for_vacation(&db.pool, a.id).await.unwrap(), 1);
        assert!(list_for_user(&db.pool, bob).await.unwrap().is_empty());
    }
}
