//! Vacation model: a catalog entry users can follow.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A vacation package as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vacation {
    pub id: Uuid,

    /// Destination name (1-100 chars)
    pub destination: String,

    /// Free-form description (up to 2000 chars)
    pub description: String,

    pub start_date: NaiveDate,

    /// Always after `start_date`
    pub end_date: NaiveDate,

    /// Package price, never negative
    pub price: f64,

    /// Ordered storage references of the vacation's images
    pub image_refs: Vec<String>,

    /// Follower count (denormalized from `vacation_follows`)
    pub followers_count: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a vacation.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewVacation {
    #[validate(length(min = 1, max = 100, message = "Destination must be 1-100 characters"))]
    pub destination: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    #[serde(default)]
    pub description: String,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub price: f64,

    #[serde(default)]
    pub image_refs: Vec<String>,
}

/// Partial update of a vacation. `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct VacationChanges {
    #[validate(length(min = 1, max = 100, message = "Destination must be 1-100 characters"))]
    pub destination: Option<String>,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub price: Option<f64>,

    /// Full replacement of the image list, in order.
    pub image_refs: Option<Vec<String>>,
}

impl VacationChanges {
    /// Apply the changes on top of a stored vacation.
    pub fn apply_to(&self, current: &Vacation) -> Vacation {
        Vacation {
            destination: self
                .destination
                .clone()
                .unwrap_or_else(|| current.destination.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| current.description.clone()),
            start_date: self.start_date.unwrap_or(current.start_date),
            end_date: self.end_date.unwrap_or(current.end_date),
            price: self.price.unwrap_or(current.price),
            image_refs: self
                .image_refs
                .clone()
                .unwrap_or_else(|| current.image_refs.clone()),
            ..current.clone()
        }
    }
}

/// Refs present in `old` but absent from `new`, in their original order.
pub fn removed_image_refs(old: &[String], new: &[String]) -> Vec<String> {
    old.iter()
        .filter(|r| !new.contains(r))
        .cloned()
        .collect()
}

/// One row of the admin follower chart / export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationStat {
    pub destination: String,
    pub followers_count: i64,
}
