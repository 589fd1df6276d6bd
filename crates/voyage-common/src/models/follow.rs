//! Follow model: a user tracking a vacation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One (user, vacation) follow relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Follow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vacation_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Follow state of a (user, vacation) pair plus the vacation's current count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowState {
    pub is_following: bool,
    pub followers_count: i64,
}
