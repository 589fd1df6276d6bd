//! Follow and unfollow with a consistent follower count.
//!
//! Each transition writes the follow row and the vacation's counter inside one
//! transaction. The `UNIQUE(user_id, vacation_id)` constraint decides races:
//! of two concurrent follows for the same pair, the second insert affects no
//! row, its transaction rolls back, and the caller sees `AlreadyFollowing`.
//!
//! Invariant after every commit:
//! `vacations.followers_count == COUNT(vacation_follows WHERE vacation_id = id)`.

use uuid::Uuid;
use voyage_common::error::{VoyageError, VoyageResult};
use voyage_common::models::FollowState;

use crate::repository::{follows, vacations};
use crate::Database;

#[derive(Debug, Clone)]
pub struct FollowCountCoordinator {
    db: Database,
}

impl FollowCountCoordinator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// `NotFollowing → Following`. Creates the follow row and increments the
    /// count as one unit.
    pub async fn follow(&self, user_id: Uuid, vacation_id: Uuid) -> VoyageResult<FollowState> {
        let mut tx = self.db.pool.begin().await?;

        // Write first: the row lock (or the SQLite write lock) queues a racing
        // follow behind this one instead of letting both read and then collide.
        let Some(followers_count) = vacations::increment_followers(&mut *tx, vacation_id).await?
        else {
            tx.rollback().await?;
            return Err(VoyageError::not_found("Vacation"));
        };

        match follows::create(&mut *tx, user_id, vacation_id).await {
            Ok(_) => {}
            Err(VoyageError::DuplicateFollow) => {
                tx.rollback().await?;
                tracing::debug!(%user_id, %vacation_id, "Follow rejected: already following");
                return Err(VoyageError::AlreadyFollowing);
            }
            Err(e) => return Err(e),
        }

        tx.commit().await?;

        tracing::debug!(%user_id, %vacation_id, followers_count, "Followed vacation");
        Ok(FollowState {
            is_following: true,
            followers_count,
        })
    }

    /// `Following → NotFollowing`. Deletes the follow row and decrements the
    /// count (floored at zero) as one unit.
    pub async fn unfollow(&self, user_id: Uuid, vacation_id: Uuid) -> VoyageResult<FollowState> {
        let mut tx = self.db.pool.begin().await?;

        if let Err(e) = follows::delete(&mut *tx, user_id, vacation_id).await {
            let e = match e {
                VoyageError::NotFollowing => {
                    if vacations::followers_count(&mut *tx, vacation_id).await?.is_none() {
                        VoyageError::not_found("Vacation")
                    } else {
                        tracing::debug!(%user_id, %vacation_id, "Unfollow rejected: not following");
                        VoyageError::NotFollowing
                    }
                }
                other => other,
            };
            tx.rollback().await?;
            return Err(e);
        }

        let followers_count = vacations::decrement_followers(&mut *tx, vacation_id)
            .await?
            .ok_or_else(|| VoyageError::not_found("Vacation"))?;

        tx.commit().await?;

        tracing::debug!(%user_id, %vacation_id, followers_count, "Unfollowed vacation");
        Ok(FollowState {
            is_following: false,
            followers_count,
        })
    }

    /// Current state of the pair, read in one snapshot.
    pub async fn status(&self, user_id: Uuid, vacation_id: Uuid) -> VoyageResult<FollowState> {
        let mut tx = self.db.pool.begin().await?;

        let followers_count = vacations::followers_count(&mut *tx, vacation_id)
            .await?
            .ok_or_else(|| VoyageError::not_found("Vacation"))?;
        let is_following = follows::exists(&mut *tx, user_id, vacation_id).await?;

        tx.commit().await?;
        Ok(FollowState {
            is_following,
            followers_count,
        })
    }

    /// Remove every follow of a user, decrementing each affected vacation.
    /// Returns the number of follows removed.
    pub async fn purge_user(&self, user_id: Uuid) -> VoyageResult<u64> {
        let mut tx = self.db.pool.begin().await?;

        // Decrement exactly the rows this statement deleted, so a follow or
        // unfollow committing alongside is neither lost nor counted twice.
        let mut vacation_ids = follows::delete_all_for_user(&mut *tx, user_id).await?;
        vacation_ids.sort_unstable();
        for &vacation_id in &vacation_ids {
            vacations::decrement_followers(&mut *tx, vacation_id).await?;
        }

        tx.commit().await?;
        let removed = vacation_ids.len() as u64;

        tracing::info!(%user_id, removed, "Removed all follows of user");
        Ok(removed)
    }
}
