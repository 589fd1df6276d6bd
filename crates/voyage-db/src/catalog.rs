//! Vacation catalog: create, update, delete and fetch vacation records.
//!
//! Image files follow the record: files dropped from a vacation's image list
//! are removed only after the change has committed, and a deleted vacation
//! takes its follows (same transaction) and its images (after commit) with it.

use chrono::Utc;
use uuid::Uuid;
use voyage_common::error::{VoyageError, VoyageResult};
use voyage_common::models::{removed_image_refs, NewVacation, Vacation, VacationChanges};
use voyage_common::validation::{validate_request, validate_vacation_terms};

use crate::images::{is_image_ref, ImageAssetManager};
use crate::repository::{follows, vacations};
use crate::Database;

/// How many times an update re-reads the record when its image list changed
/// underneath it.
const UPDATE_ATTEMPTS: usize = 3;

/// An uploaded image waiting to be stored.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Clone)]
pub struct VacationCatalog {
    db: Database,
    images: ImageAssetManager,
}

impl VacationCatalog {
    pub fn new(db: Database, images: ImageAssetManager) -> Self {
        Self { db, images }
    }

    pub fn images(&self) -> &ImageAssetManager {
        &self.images
    }

    fn check_new(fields: &NewVacation) -> VoyageResult<()> {
        validate_request(fields)?;
        validate_vacation_terms(fields.start_date, fields.end_date, fields.price)
    }

    /// Refs a write may attach: issued by the image manager, listed once, and
    /// not held by another vacation. `held` are the refs `owner` already has.
    async fn check_image_refs(&self, owner: Uuid, refs: &[String], held: &[String]) -> VoyageResult<()> {
        for (i, image_ref) in refs.iter().enumerate() {
            if !is_image_ref(image_ref) {
                return Err(VoyageError::invalid_vacation(format!(
                    "unknown image reference {image_ref:?}"
                )));
            }
            if refs[..i].contains(image_ref) {
                return Err(VoyageError::invalid_vacation(format!(
                    "image {image_ref} is listed twice"
                )));
            }
            if !held.contains(image_ref)
                && vacations::image_ref_in_use(&self.db.pool, image_ref, owner).await?
            {
                return Err(VoyageError::invalid_vacation(format!(
                    "image {image_ref} belongs to another vacation"
                )));
            }
        }
        Ok(())
    }

    /// Delete images `owner` no longer lists. A ref some other vacation still
    /// lists is kept.
    async fn release_images(&self, owner: Uuid, refs: &[String]) {
        for image_ref in refs {
            if !is_image_ref(image_ref) {
                tracing::warn!(vacation_id = %owner, image_ref = %image_ref, "Skipping foreign image reference");
                continue;
            }
            match vacations::image_ref_in_use(&self.db.pool, image_ref, owner).await {
                Ok(false) => self.images.delete(image_ref).await,
                Ok(true) => {
                    tracing::warn!(vacation_id = %owner, image_ref = %image_ref, "Image still listed by another vacation, keeping it")
                }
                Err(e) => {
                    tracing::warn!(vacation_id = %owner, image_ref = %image_ref, error = %e, "Could not check image usage, keeping it")
                }
            }
        }
    }

    /// Create a vacation with zero followers.
    pub async fn create(&self, fields: NewVacation) -> VoyageResult<Vacation> {
        Self::check_new(&fields)?;
        let id = Uuid::now_v7();
        self.check_image_refs(id, &fields.image_refs, &[]).await?;

        let now = Utc::now();
        let vacation = Vacation {
            id,
            destination: fields.destination,
            description: fields.description,
            start_date: fields.start_date,
            end_date: fields.end_date,
            price: fields.price,
            image_refs: fields.image_refs,
            followers_count: 0,
            created_at: now,
            updated_at: now,
        };
        vacations::insert_vacation(&self.db.pool, &vacation).await?;

        tracing::info!(vacation_id = %vacation.id, destination = %vacation.destination, "Vacation created");
        Ok(vacation)
    }

    /// Store the uploads, then create the vacation with them appended to its
    /// image list. Stored files are removed again if the insert fails.
    pub async fn create_with_uploads(
        &self,
        mut fields: NewVacation,
        uploads: Vec<ImageUpload>,
    ) -> VoyageResult<Vacation> {
        Self::check_new(&fields)?;

        let stored = self.store_uploads(uploads).await?;
        fields.image_refs.extend(stored.iter().cloned());

        match self.create(fields).await {
            Ok(vacation) => Ok(vacation),
            Err(e) => {
                self.images.delete_all(&stored).await;
                Err(e)
            }
        }
    }

    /// Apply a partial update. Images dropped from the list are deleted once
    /// the new list is committed.
    pub async fn update(&self, id: Uuid, changes: VacationChanges) -> VoyageResult<Vacation> {
        validate_request(&changes)?;

        for _ in 0..UPDATE_ATTEMPTS {
            let current = self.get(id).await?;

            let mut next = changes.apply_to(&current);
            validate_vacation_terms(next.start_date, next.end_date, next.price)?;
            self.check_image_refs(id, &next.image_refs, &current.image_refs)
                .await?;
            next.updated_at = Utc::now();

            // The guarded write opens the transaction, so a concurrent writer
            // waits for the lock instead of failing on an upgrade.
            let mut tx = self.db.pool.begin().await?;
            if !vacations::update_vacation(&mut *tx, &next, &current.image_refs).await? {
                // Deleted, or another update swapped the images since we read them.
                tx.rollback().await?;
                continue;
            }

            let updated = vacations::find_by_id(&mut *tx, id)
                .await?
                .ok_or_else(|| VoyageError::not_found("Vacation"))?;
            tx.commit().await?;

            let removed = removed_image_refs(&current.image_refs, &updated.image_refs);
            if !removed.is_empty() {
                tracing::debug!(vacation_id = %id, count = removed.len(), "Removing replaced images");
                self.release_images(id, &removed).await;
            }

            tracing::info!(vacation_id = %id, "Vacation updated");
            return Ok(updated);
        }

        // Out of attempts: either the vacation is gone or it keeps changing.
        if vacations::find_by_id(&self.db.pool, id).await?.is_none() {
            return Err(VoyageError::not_found("Vacation"));
        }
        Err(VoyageError::Internal(anyhow::anyhow!(
            "vacation {id} was modified concurrently, update not applied"
        )))
    }

    /// Store the uploads and apply the update. `append` keeps the resulting
    /// image list (from `changes` or the stored record) and adds the uploads
    /// after it; otherwise the uploads replace the list. Stored files are
    /// removed again if the update fails.
    pub async fn update_with_uploads(
        &self,
        id: Uuid,
        mut changes: VacationChanges,
        uploads: Vec<ImageUpload>,
        append: bool,
    ) -> VoyageResult<Vacation> {
        if uploads.is_empty() {
            return self.update(id, changes).await;
        }
        validate_request(&changes)?;

        let current = self.get(id).await?;
        let stored = self.store_uploads(uploads).await?;

        let mut refs = if append {
            changes
                .image_refs
                .take()
                .unwrap_or_else(|| current.image_refs.clone())
        } else {
            Vec::new()
        };
        refs.extend(stored.iter().cloned());
        changes.image_refs = Some(refs);

        match self.update(id, changes).await {
            Ok(vacation) => Ok(vacation),
            Err(e) => {
                self.images.delete_all(&stored).await;
                Err(e)
            }
        }
    }

    /// Delete a vacation, its follows, and its images.
    pub async fn delete(&self, id: Uuid) -> VoyageResult<()> {
        let mut tx = self.db.pool.begin().await?;

        let removed_follows = follows::delete_all_for_vacation(&mut *tx, id).await?;
        let image_refs = vacations::delete_vacation(&mut *tx, id)
            .await?
            .ok_or_else(|| VoyageError::not_found("Vacation"))?;

        tx.commit().await?;

        self.release_images(id, &image_refs).await;

        tracing::info!(vacation_id = %id, removed_follows, images = image_refs.len(), "Vacation deleted");
        Ok(())
    }

    /// Fetch a vacation by id.
    pub async fn get(&self, id: Uuid) -> VoyageResult<Vacation> {
        vacations::find_by_id(&self.db.pool, id)
            .await?
            .ok_or_else(|| VoyageError::not_found("Vacation"))
    }

    /// Store every upload or none: a failure removes the ones already stored.
    async fn store_uploads(&self, uploads: Vec<ImageUpload>) -> VoyageResult<Vec<String>> {
        let mut stored = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self.images.store(upload.bytes, &upload.content_type).await {
                Ok(image_ref) => stored.push(image_ref),
                Err(e) => {
                    self.images.delete_all(&stored).await;
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{LocalStore, ObjectStore};
    use crate::test_support::date;
    use tempfile::TempDir;

    async fn setup() -> (VacationCatalog, Database, TempDir) {
        let db = Database::connect_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let images = ImageAssetManager::new(
            ObjectStore::Local(LocalStore::new(dir.path())),
            1024,
            "/images",
        );
        (VacationCatalog::new(db.clone(), images), db, dir)
    }

    fn fields(destination: &str) -> NewVacation {
        NewVacation {
            destination: destination.to_string(),
            description: "Sun and sea".to_string(),
            start_date: date("2030-06-01"),
            end_date: date("2030-06-08"),
            price: 1200.0,
            image_refs: vec![],
        }
    }

    fn png() -> ImageUpload {
        ImageUpload {
            bytes: vec![0x89, b'P', b'N', b'G'],
            content_type: "image/png".to_string(),
        }
    }

    #[tokio::test]
    async fn create_starts_with_zero_followers() {
        let (catalog, _db, _dir) = setup().await;
        let created = catalog.create(fields("Crete")).await.unwrap();
        assert_eq!(created.followers_count, 0);

        let fetched = catalog.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn create_rejects_negative_price() {
        let (catalog, _db, _dir) = setup().await;
        let mut bad = fields("Crete");
        bad.price = -10.0;
        let err = catalog.create(bad).await.unwrap_err();
        assert!(matches!(err, VoyageError::InvalidVacation { .. }));
    }

    #[tokio::test]
    async fn create_rejects_reversed_dates() {
        let (catalog, _db, _dir) = setup().await;
        let mut bad = fields("Crete");
        bad.start_date = date("2024-06-10");
        bad.end_date = date("2024-06-05");
        let err = catalog.create(bad).await.unwrap_err();
        assert!(matches!(err, VoyageError::InvalidVacation { .. }));
    }

    #[tokio::test]
    async fn rejected_create_leaves_no_uploaded_files() {
        let (catalog, _db, dir) = setup().await;
        let mut bad = fields("Crete");
        bad.price = -1.0;
        assert!(catalog.create_with_uploads(bad, vec![png()]).await.is_err());
        assert!(!dir.path().join("vacations").exists());
    }

    #[tokio::test]
    async fn failed_upload_in_batch_removes_earlier_ones() {
        let (catalog, _db, dir) = setup().await;
        let bad = ImageUpload {
            bytes: vec![0; 4],
            content_type: "application/pdf".into(),
        };
        let err = catalog
            .create_with_uploads(fields("Crete"), vec![png(), bad])
            .await
            .unwrap_err();
        assert!(matches!(err, VoyageError::UnsupportedMediaType { .. }));
        let leftover = std::fs::read_dir(dir.path().join("vacations")).unwrap().count();
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (catalog, _db, _dir) = setup().await;
        let err = catalog.get(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, VoyageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let (catalog, _db, _dir) = setup().await;
        let err = catalog
            .update(Uuid::now_v7(), VacationChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VoyageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_revalidates_merged_record() {
        let (catalog, _db, _dir) = setup().await;
        let created = catalog.create(fields("Crete")).await.unwrap();
        let changes = VacationChanges {
            end_date: Some(date("2030-05-01")),
            ..Default::default()
        };
        let err = catalog.update(created.id, changes).await.unwrap_err();
        assert!(matches!(err, VoyageError::InvalidVacation { .. }));
        assert_eq!(catalog.get(created.id).await.unwrap().end_date, date("2030-06-08"));
    }

    #[tokio::test]
    async fn replacing_images_deletes_only_dropped_files() {
        let (catalog, _db, dir) = setup().await;
        let images = catalog.images().clone();
        let a = images.store(png().bytes, "image/png").await.unwrap();
        let b = images.store(png().bytes, "image/png").await.unwrap();
        let c = images.store(png().bytes, "image/png").await.unwrap();

        let mut initial = fields("Crete");
        initial.image_refs = vec![a.clone(), b.clone()];
        let created = catalog.create(initial).await.unwrap();

        let changes = VacationChanges {
            image_refs: Some(vec![b.clone(), c.clone()]),
            ..Default::default()
        };
        let updated = catalog.update(created.id, changes).await.unwrap();

        assert_eq!(updated.image_refs, vec![b.clone(), c.clone()]);
        assert!(!dir.path().join(&a).exists());
        assert!(dir.path().join(&b).exists());
        assert!(dir.path().join(&c).exists());
    }

    #[tokio::test]
    async fn upload_on_update_replaces_unless_appending() {
        let (catalog, _db, dir) = setup().await;
        let created = catalog.create_with_uploads(fields("Crete"), vec![png()]).await.unwrap();
        let first = created.image_refs[0].clone();

        let appended = catalog
            .update_with_uploads(created.id, VacationChanges::default(), vec![png()], true)
            .await
            .unwrap();
        assert_eq!(appended.image_refs.len(), 2);
        assert_eq!(appended.image_refs[0], first);

        let replaced = catalog
            .update_with_uploads(created.id, VacationChanges::default(), vec![png()], false)
            .await
            .unwrap();
        assert_eq!(replaced.image_refs.len(), 1);
        for old in &appended.image_refs {
            assert!(!dir.path().join(old).exists());
        }
        assert!(dir.path().join(&replaced.image_refs[0]).exists());
    }

    #[tokio::test]
    async fn update_keeps_follower_count() {
        let (catalog, db, _dir) = setup().await;
        let created = catalog.create(fields("Crete")).await.unwrap();
        follows::create(&db.pool, Uuid::now_v7(), created.id).await.unwrap();
        vacations::increment_followers(&db.pool, created.id).await.unwrap();

        let changes = VacationChanges {
            destination: Some("Rhodes".into()),
            ..Default::default()
        };
        let updated = catalog.update(created.id, changes).await.unwrap();
        assert_eq!(updated.destination, "Rhodes");
        assert_eq!(updated.followers_count, 1);
    }

    #[tokio::test]
    async fn delete_cascades_follows_and_images() {
        let (catalog, db, dir) = setup().await;
        let created = catalog
            .create_with_uploads(fields("Crete"), vec![png(), png()])
            .await
            .unwrap();
        for _ in 0..3 {
            follows::create(&db.pool, Uuid::now_v7(), created.id).await.unwrap();
        }

        catalog.delete(created.id).await.unwrap();

        assert_eq!(follows::count_for_vacation(&db.pool, created.id).await.unwrap(), 0);
        for image_ref in &created.image_refs {
            assert!(!dir.path().join(image_ref).exists());
        }
        let err = catalog.get(created.id).await.unwrap_err();
        assert!(matches!(err, VoyageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let (catalog, _db, _dir) = setup().await;
        let err = catalog.delete(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, VoyageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_survives_already_missing_image_files() {
        let (catalog, _db, _dir) = setup().await;
        let mut f = fields("Crete");
        f.image_refs = vec![format!("vacations/{}.png", Uuid::now_v7())];
        let created = catalog.create(f).await.unwrap();
        catalog.delete(created.id).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_refs_the_image_manager_did_not_issue() {
        let (catalog, _db, _dir) = setup().await;
        for bad in ["unrelated.txt", "vacations/../secret.png", "vacations/abc.png"] {
            let mut f = fields("Crete");
            f.image_refs = vec![bad.to_string()];
            let err = catalog.create(f).await.unwrap_err();
            assert!(matches!(err, VoyageError::InvalidVacation { .. }), "{bad}");
        }
    }

    #[tokio::test]
    async fn rejects_image_owned_by_another_vacation() {
        let (catalog, _db, dir) = setup().await;
        let a = catalog.create_with_uploads(fields("Crete"), vec![png()]).await.unwrap();
        let shared = a.image_refs[0].clone();

        let mut claim = fields("Rhodes");
        claim.image_refs = vec![shared.clone()];
        let err = catalog.create(claim).await.unwrap_err();
        assert!(matches!(err, VoyageError::InvalidVacation { .. }));

        let b = catalog.create(fields("Rhodes")).await.unwrap();
        let changes = VacationChanges {
            image_refs: Some(vec![shared.clone()]),
            ..Default::default()
        };
        let err = catalog.update(b.id, changes).await.unwrap_err();
        assert!(matches!(err, VoyageError::InvalidVacation { .. }));

        catalog.delete(b.id).await.unwrap();
        assert!(dir.path().join(&shared).exists());
    }

    #[tokio::test]
    async fn delete_keeps_files_other_rows_still_list() {
        let (catalog, db, dir) = setup().await;
        let a = catalog.create_with_uploads(fields("Crete"), vec![png()]).await.unwrap();
        let shared = a.image_refs[0].clone();

        std::fs::write(dir.path().join("unrelated.txt"), b"keep me").unwrap();
        let mut legacy = crate::test_support::vacation("Rhodes", "2030-06-01", "2030-06-08");
        legacy.image_refs = vec![shared.clone(), "unrelated.txt".into()];
        vacations::insert_vacation(&db.pool, &legacy).await.unwrap();

        catalog.delete(legacy.id).await.unwrap();

        assert!(dir.path().join(&shared).exists());
        assert!(dir.path().join("unrelated.txt").exists());
        assert_eq!(catalog.get(a.id).await.unwrap().image_refs, vec![shared]);
    }
}
