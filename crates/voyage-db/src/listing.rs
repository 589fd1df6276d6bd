//! Filtered, paginated vacation listings and follower statistics.
//!
//! Reads go through the same store as every write; the follower count shown is
//! the denormalized column, never a recomputation.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;
use voyage_common::error::{VoyageError, VoyageResult};
use voyage_common::models::{DestinationStat, ListFilters, Page, PageRequest, VacationListing};

use crate::repository::vacations;
use crate::Database;

/// `AnyConnection::backend_name` of a PostgreSQL connection.
const POSTGRES_BACKEND: &str = "PostgreSQL";

#[derive(Debug, Clone)]
pub struct ListingQueryEngine {
    db: Database,
    default_page_size: u32,
    max_page_size: u32,
}

impl ListingQueryEngine {
    pub fn new(db: Database, default_page_size: u32, max_page_size: u32) -> Self {
        Self {
            db,
            default_page_size,
            max_page_size,
        }
    }

    /// Resolve optional query parameters into a checked page request.
    pub fn page_request(&self, page: Option<u32>, limit: Option<u32>) -> VoyageResult<PageRequest> {
        let request = PageRequest {
            page: page.unwrap_or(1),
            limit: limit.unwrap_or(self.default_page_size),
        };
        if request.page < 1 {
            return Err(VoyageError::Validation {
                message: "page must be at least 1".into(),
            });
        }
        if request.limit < 1 || request.limit > self.max_page_size {
            return Err(VoyageError::Validation {
                message: format!("limit must be between 1 and {}", self.max_page_size),
            });
        }
        Ok(request)
    }

    /// One page of vacations as seen by `user_id`, filtered relative to today (UTC).
    pub async fn list(
        &self,
        user_id: Uuid,
        request: PageRequest,
        filters: ListFilters,
    ) -> VoyageResult<Page<VacationListing>> {
        self.list_at(user_id, request, filters, Utc::now().date_naive())
            .await
    }

    /// Same as [`list`](Self::list) with an explicit notion of "today".
    pub async fn list_at(
        &self,
        user_id: Uuid,
        request: PageRequest,
        filters: ListFilters,
        today: NaiveDate,
    ) -> VoyageResult<Page<VacationListing>> {
        let request = self.page_request(Some(request.page), Some(request.limit))?;

        // Count and page come from one snapshot so `total` agrees with `items`.
        // A SQLite read transaction already is one; PostgreSQL needs asking.
        let mut tx = self.db.pool.begin().await?;
        if tx.backend_name() == POSTGRES_BACKEND {
            sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
                .execute(&mut *tx)
                .await?;
        }
        let total = vacations::count_filtered(&mut *tx, user_id, filters, today).await?;
        let items = if request.offset() < total {
            vacations::list_filtered(
                &mut *tx,
                user_id,
                filters,
                today,
                i64::from(request.limit),
                request.offset(),
            )
            .await?
        } else {
            Vec::new()
        };
        tx.commit().await?;

        tracing::debug!(
            %user_id,
            ?filters,
            page = request.page,
            limit = request.limit,
            total,
            "Listed vacations"
        );
        Ok(Page::new(items, request, total))
    }

    /// `(destination, followers_count)` for every vacation.
    pub async fn stats_by_destination(&self) -> VoyageResult<Vec<DestinationStat>> {
        Ok(vacations::destination_stats(&self.db.pool).await?)
    }

    /// The destination statistics rendered as CSV with a header row.
    pub async fn stats_csv(&self) -> VoyageResult<String> {
        let stats = self.stats_by_destination().await?;
        render_csv(&stats)
    }
}

fn render_csv(stats: &[DestinationStat]) -> VoyageResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["destination", "followers_count"])
        .map_err(anyhow::Error::from)?;
    for stat in stats {
        let count = stat.followers_count.to_string();
        writer
            .write_record([stat.destination.as_str(), count.as_str()])
            .map_err(anyhow::Error::from)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {e}"))?;
    Ok(String::from_utf8(bytes).map_err(anyhow::Error::from)?)
}
