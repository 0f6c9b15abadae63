use chrono::{DateTime, NaiveDate, Utc};

use sqlx::{SqliteExecutor, SqlitePool};

use thiserror::Error;

use crate::domain::{CourseTitle, GiftCertificateNumber};

use super::{is_unique_violation, MAX_NUMBER_ATTEMPTS};

/// New gift certificate request
#[derive(Debug)]
pub struct NewGiftCertificate {
    pub course: CourseTitle,
    pub expires_on: NaiveDate,
}

/// Outcome of saving a new gift certificate
#[derive(Debug)]
pub struct StoredGiftCertificate {
    pub id: i64,
    pub number: GiftCertificateNumber,
    pub file_path: String,
}

/// Stored gift certificate record
#[derive(Debug, sqlx::FromRow)]
pub struct GiftCertificate {
    pub id: i64,
    pub number: String,
    pub course: String,
    pub expires_on: NaiveDate,
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SaveGiftCertificateError {
    #[error("Ran out of fresh gift certificate numbers after {0} attempts")]
    NumberSpaceExhausted(u32),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Repository for interfacing with the gift certificate table
pub struct GiftCertificateRepo;

impl GiftCertificateRepo {
    /// Insert a new gift certificate under a freshly drawn unique number
    #[tracing::instrument(name = "Insert gift certificate", skip(pool, file_path))]
    pub async fn insert(
        pool: &SqlitePool,
        new_gift: &NewGiftCertificate,
        file_path: impl Fn(&GiftCertificateNumber) -> String,
    ) -> Result<StoredGiftCertificate, SaveGiftCertificateError> {
        Self::insert_with(pool, new_gift, file_path, GiftCertificateNumber::generate).await
    }

    async fn insert_with(
        pool: &SqlitePool,
        new_gift: &NewGiftCertificate,
        file_path: impl Fn(&GiftCertificateNumber) -> String,
        mut candidates: impl FnMut() -> GiftCertificateNumber,
    ) -> Result<StoredGiftCertificate, SaveGiftCertificateError> {
        for _ in 0..MAX_NUMBER_ATTEMPTS {
            let number = candidates();
            if Self::exists_by_number(pool, number.as_ref()).await? {
                continue;
            }

            let relative_path = file_path(&number);
            let created_at = Utc::now();
            let result = sqlx::query(
                "insert into gift_certificates (number, course, expires_on, file_path, created_at) \
                 values (?, ?, ?, ?, ?)",
            )
            .bind(number.as_ref())
            .bind(new_gift.course.as_ref())
            .bind(new_gift.expires_on)
            .bind(&relative_path)
            .bind(created_at)
            .execute(pool)
            .await;

            match result {
                Ok(done) => {
                    return Ok(StoredGiftCertificate {
                        id: done.last_insert_rowid(),
                        number,
                        file_path: relative_path,
                    })
                }
                Err(error) if is_unique_violation(&error) => continue,
                Err(error) => return Err(error.into()),
            }
        }

        Err(SaveGiftCertificateError::NumberSpaceExhausted(
            MAX_NUMBER_ATTEMPTS,
        ))
    }

    #[tracing::instrument(name = "Check gift certificate number", skip(executor))]
    pub async fn exists_by_number<'con>(
        executor: impl SqliteExecutor<'con>,
        number: &str,
    ) -> sqlx::Result<bool> {
        sqlx::query_scalar("select exists(select 1 from gift_certificates where number = ?)")
            .bind(number)
            .fetch_one(executor)
            .await
    }

    #[tracing::instrument(name = "Fetch gift certificate by id", skip(executor))]
    pub async fn fetch_by_id<'con>(
        executor: impl SqliteExecutor<'con>,
        id: i64,
    ) -> sqlx::Result<Option<GiftCertificate>> {
        sqlx::query_as(
            "select id, number, course, expires_on, file_path, created_at \
             from gift_certificates where id = ?",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Expiry date for a gift certificate number, if the number exists
    #[tracing::instrument(name = "Fetch gift certificate expiry", skip(executor))]
    pub async fn fetch_expiry_by_number<'con>(
        executor: impl SqliteExecutor<'con>,
        number: &str,
    ) -> sqlx::Result<Option<NaiveDate>> {
        sqlx::query_scalar("select expires_on from gift_certificates where number = ?")
            .bind(number)
            .fetch_optional(executor)
            .await
    }

    /// Delete every gift certificate row that has a rendered file on record
    #[tracing::instrument(name = "Clear gift certificate history", skip(executor))]
    pub async fn clear_history<'con>(executor: impl SqliteExecutor<'con>) -> sqlx::Result<u64> {
        let done = sqlx::query("delete from gift_certificates where file_path is not null")
            .execute(executor)
            .await?;

        Ok(done.rows_affected())
    }
}
