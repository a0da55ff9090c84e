//! Polling coordinator - capability layer
//!
//! Bounded spin-wait on record fields. This is the rendezvous between the
//! background worker and the request handlers; the record is the only data
//! channel, the store's notifications merely cut the sleep short.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::AppResult;
use crate::models::RecordField;
use crate::store::StatusStore;

#[derive(Clone)]
pub struct Poller {
    store: StatusStore,
    period: Duration,
}

impl Poller {
    pub fn new(store: StatusStore, period: Duration) -> Self {
        Self { store, period }
    }

    /// Wait until any of `fields` is set on the record
    ///
    /// `Ok(true)` as soon as one is set, `Ok(false)` once `timeout` has
    /// elapsed (never earlier). A missing record or a storage failure is
    /// returned as an error immediately.
    pub async fn wait_for_any(
        &self,
        user_id: i64,
        fields: &[RecordField],
        timeout: Duration,
    ) -> AppResult<bool> {
        let deadline = Instant::now() + timeout;
        let notify = self.store.signals().subscribe(user_id);

        loop {
            // registered before the read so a write in between still wakes us
            let notified = notify.notified();

            let record = self.store.require(user_id).await?;
            if let Some(field) = fields.iter().find(|f| record.is_set(**f)) {
                debug!("[user #{}] {} is set", user_id, field);
                return Ok(true);
            }

            let now = Instant::now();
            if now >= deadline {
                debug!("[user #{}] gave up waiting for {:?} after {:?}", user_id, fields, timeout);
                return Ok(false);
            }

            tokio::select! {
                _ = notified => {}
                _ = sleep(self.period.min(deadline - now)) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::NewApplicant;
    use crate::store::{init_memory_pool, run_migrations};

    const PERIOD: Duration = Duration::from_millis(50);

    async fn setup() -> (StatusStore, i64) {
        let pool = init_memory_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let store = StatusStore::new(pool);
        let record = store
            .create(&NewApplicant {
                lastname: "Doe".into(),
                confirmation_number: "2024012345678".into(),
                birth_year: "1990".into(),
            })
            .await
            .unwrap();
        (store, record.user_id)
    }

    #[tokio::test]
    async fn returns_immediately_when_already_set() {
        let (store, id) = setup().await;
        store.set_captcha_result(id, "AB3D9").await.unwrap();
        let poller = Poller::new(store, PERIOD);

        let start = std::time::Instant::now();
        let ready = poller
            .wait_for_any(id, &[RecordField::CaptchaResult], Duration::from_secs(5))
            .await
            .unwrap();
        assert!(ready);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn wakes_up_on_concurrent_write() {
        let (store, id) = setup().await;
        let poller = Poller::new(store.clone(), Duration::from_secs(10));

        let writer = tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            store.set_captcha_image(id, b"png").await.unwrap();
        });

        let start = std::time::Instant::now();
        let ready = poller
            .wait_for_any(
                id,
                &[RecordField::CaptchaImage, RecordField::CaptchaResult],
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        writer.await.unwrap();

        assert!(ready);
        // the notification beats the 10s poll period
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn times_out_no_earlier_than_the_bound() {
        let (store, id) = setup().await;
        let poller = Poller::new(store, PERIOD);
        let timeout = Duration::from_millis(300);

        let start = std::time::Instant::now();
        let ready = poller
            .wait_for_any(id, &[RecordField::CheckResult], timeout)
            .await
            .unwrap();
        let elapsed = start.elapsed();

        assert!(!ready);
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_secs(1));
    }

    #[tokio::test]
    async fn missing_record_is_an_error() {
        let (store, _) = setup().await;
        let poller = Poller::new(store, PERIOD);
        let result = poller
            .wait_for_any(404, &[RecordField::CheckResult], Duration::from_millis(100))
            .await;
        assert!(matches!(result, Err(AppError::NotFound { user_id: 404 })));
    }
}
