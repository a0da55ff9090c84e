use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::record::year_prefix;
use crate::models::{CheckOutcome, NewApplicant, StatusRecord};
use crate::store::RecordSignals;

const RECORD_COLUMNS: &str = "user_id, lastname, confirmation_number, birth_year, captcha_image, \
                              captcha_result, check_result, last_update, screenshot";

/// Durable per-applicant records
///
/// Every partial update is one `UPDATE` statement, so a concurrent reader
/// sees all or none of it.
#[derive(Clone)]
pub struct StatusStore {
    pool: SqlitePool,
    signals: Arc<RecordSignals>,
}

impl StatusStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            signals: Arc::new(RecordSignals::new()),
        }
    }

    pub fn signals(&self) -> &Arc<RecordSignals> {
        &self.signals
    }

    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Insert a new applicant
    pub async fn create(&self, applicant: &NewApplicant) -> AppResult<StatusRecord> {
        let result = sqlx::query(
            "INSERT INTO users (lastname, confirmation_number, birth_year) VALUES (?, ?, ?)",
        )
        .bind(&applicant.lastname)
        .bind(&applicant.confirmation_number)
        .bind(&applicant.birth_year)
        .execute(&self.pool)
        .await?;

        let user_id = result.last_insert_rowid();
        debug!("created record {}", user_id);
        self.require(user_id).await
    }

    pub async fn get(&self, user_id: i64) -> AppResult<Option<StatusRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE user_id = ?", RECORD_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(map_row).transpose()?)
    }

    /// Like `get`, but a missing record is an error
    pub async fn require(&self, user_id: i64) -> AppResult<StatusRecord> {
        self.get(user_id).await?.ok_or(AppError::NotFound { user_id })
    }

    pub async fn list_all(&self) -> AppResult<Vec<StatusRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users ORDER BY lastname, user_id",
            RECORD_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_row).collect::<Result<_, _>>()?)
    }

    /// Distinct 4-digit year prefixes of all confirmation numbers
    pub async fn list_years(&self) -> AppResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT substr(confirmation_number, 1, 4) AS year FROM users ORDER BY year",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut years = Vec::with_capacity(rows.len());
        for row in rows {
            let year: String = row.try_get("year")?;
            if year_prefix(&year).is_some() {
                years.push(year);
            }
        }
        Ok(years)
    }

    /// Records whose confirmation number starts with `year`, by last name
    pub async fn list_by_year(&self, year: &str) -> AppResult<Vec<StatusRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users WHERE substr(confirmation_number, 1, 4) = ? \
             ORDER BY lastname, user_id",
            RECORD_COLUMNS
        ))
        .bind(year)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_row).collect::<Result<_, _>>()?)
    }

    // ========== Cycle field updates ==========

    /// Clear the exchange fields and the outcome flag before a new cycle
    pub async fn reset_cycle(&self, user_id: i64) -> AppResult<()> {
        self.update(
            user_id,
            sqlx::query(
                "UPDATE users SET captcha_image = NULL, captcha_result = NULL, check_result = NULL \
                 WHERE user_id = ?",
            )
            .bind(user_id),
        )
        .await
    }

    pub async fn set_captcha_image(&self, user_id: i64, image: &[u8]) -> AppResult<()> {
        self.update(
            user_id,
            sqlx::query("UPDATE users SET captcha_image = ? WHERE user_id = ?")
                .bind(image)
                .bind(user_id),
        )
        .await
    }

    pub async fn set_captcha_result(&self, user_id: i64, answer: &str) -> AppResult<()> {
        self.update(
            user_id,
            sqlx::query("UPDATE users SET captcha_result = ? WHERE user_id = ?")
                .bind(answer)
                .bind(user_id),
        )
        .await
    }

    /// Write all three outcome fields at once
    pub async fn record_outcome(
        &self,
        user_id: i64,
        outcome: CheckOutcome,
        screenshot: &[u8],
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.update(
            user_id,
            sqlx::query(
                "UPDATE users SET check_result = ?, screenshot = ?, last_update = ? WHERE user_id = ?",
            )
            .bind(outcome.as_db())
            .bind(screenshot)
            .bind(at)
            .bind(user_id),
        )
        .await
    }

    /// Clear both exchange fields together
    pub async fn clear_exchange(&self, user_id: i64) -> AppResult<()> {
        self.update(
            user_id,
            sqlx::query(
                "UPDATE users SET captcha_image = NULL, captcha_result = NULL WHERE user_id = ?",
            )
            .bind(user_id),
        )
        .await
    }

    async fn update<'q>(
        &self,
        user_id: i64,
        query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    ) -> AppResult<()> {
        let result = query.execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound { user_id });
        }
        self.signals.notify(user_id);
        Ok(())
    }
}

fn map_row(row: &SqliteRow) -> Result<StatusRecord, sqlx::Error> {
    let check_result: Option<String> = row.try_get("check_result")?;
    Ok(StatusRecord {
        user_id: row.try_get("user_id")?,
        lastname: row.try_get("lastname")?,
        confirmation_number: row.try_get("confirmation_number")?,
        birth_year: row.try_get("birth_year")?,
        captcha_image: row.try_get("captcha_image")?,
        captcha_result: row.try_get("captcha_result")?,
        check_result: CheckOutcome::from_db(check_result.as_deref()),
        screenshot: row.try_get("screenshot")?,
        last_update: row.try_get("last_update")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordField;
    use crate::store::{init_memory_pool, run_migrations};

    async fn store() -> StatusStore {
        let pool = init_memory_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        StatusStore::new(pool)
    }

    fn applicant(lastname: &str, confirmation: &str) -> NewApplicant {
        NewApplicant {
            lastname: lastname.into(),
            confirmation_number: confirmation.into(),
            birth_year: "1990".into(),
        }
    }

    #[tokio::test]
    async fn create_and_read_back() {
        let store = store().await;
        let created = store.create(&applicant("Doe", "2024012345678")).await.unwrap();

        let fetched = store.require(created.user_id).await.unwrap();
        assert_eq!(fetched.lastname, "Doe");
        assert_eq!(fetched.confirmation_number, "2024012345678");
        assert_eq!(fetched.check_result, CheckOutcome::Unknown);
        assert!(fetched.captcha_image.is_none());
        assert!(fetched.last_update.is_none());
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let store = store().await;
        assert!(store.get(99).await.unwrap().is_none());
        assert!(matches!(
            store.set_captcha_result(99, "x").await,
            Err(AppError::NotFound { user_id: 99 })
        ));
    }

    #[tokio::test]
    async fn outcome_and_images_round_trip() {
        let store = store().await;
        let id = store.create(&applicant("Doe", "2024012345678")).await.unwrap().user_id;
        let png = vec![0x89, b'P', b'N', b'G', 0, 1, 2, 255];
        let at = Utc::now();

        store.set_captcha_image(id, &png).await.unwrap();
        store.record_outcome(id, CheckOutcome::Selected, &png, at).await.unwrap();

        let record = store.require(id).await.unwrap();
        assert_eq!(record.captcha_image.as_deref(), Some(png.as_slice()));
        assert_eq!(record.screenshot.as_deref(), Some(png.as_slice()));
        assert_eq!(record.check_result, CheckOutcome::Selected);
        assert_eq!(record.last_update.map(|t| t.timestamp_millis()), Some(at.timestamp_millis()));
    }

    #[tokio::test]
    async fn reset_and_clear_touch_only_their_fields() {
        let store = store().await;
        let id = store.create(&applicant("Doe", "2024012345678")).await.unwrap().user_id;
        store.set_captcha_image(id, b"img").await.unwrap();
        store.set_captcha_result(id, "AB3D9").await.unwrap();
        store
            .record_outcome(id, CheckOutcome::Denied, b"shot", Utc::now())
            .await
            .unwrap();

        store.clear_exchange(id).await.unwrap();
        let record = store.require(id).await.unwrap();
        assert!(!record.is_set(RecordField::CaptchaImage));
        assert!(!record.is_set(RecordField::CaptchaResult));
        assert_eq!(record.check_result, CheckOutcome::Denied);

        store.set_captcha_result(id, "AB3D9").await.unwrap();
        store.reset_cycle(id).await.unwrap();
        let record = store.require(id).await.unwrap();
        assert!(!record.is_set(RecordField::CaptchaResult));
        assert_eq!(record.check_result, CheckOutcome::Unknown);
        assert!(record.screenshot.is_some());
    }

    #[tokio::test]
    async fn years_and_year_filter() {
        let store = store().await;
        store.create(&applicant("Smith", "2025000000001")).await.unwrap();
        store.create(&applicant("Doe", "2024012345678")).await.unwrap();
        store.create(&applicant("Adams", "2024999999999")).await.unwrap();

        assert_eq!(store.list_years().await.unwrap(), vec!["2024", "2025"]);

        let names: Vec<_> = store
            .list_by_year("2024")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.lastname)
            .collect();
        assert_eq!(names, vec!["Adams", "Doe"]);

        assert!(store.list_by_year("2023").await.unwrap().is_empty());
        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }
}
