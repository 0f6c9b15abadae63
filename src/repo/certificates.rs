use chrono::{DateTime, NaiveDate, Utc};

use sqlx::{SqliteExecutor, SqlitePool};

use thiserror::Error;

use crate::domain::{CertificateNumber, CourseTitle, RecipientName};

use super::{is_unique_violation, MAX_NUMBER_ATTEMPTS};

/// New course certificate request
#[derive(Debug)]
pub struct NewCertificate {
    pub recipient: RecipientName,
    pub course: CourseTitle,
    pub issued_on: NaiveDate,
}

/// Outcome of saving a new certificate
#[derive(Debug)]
pub struct StoredCertificate {
    pub id: i64,
    pub number: CertificateNumber,
    pub file_path: String,
}

/// Stored course certificate record
#[derive(Debug, sqlx::FromRow)]
pub struct Certificate {
    pub id: i64,
    pub number: String,
    pub recipient: String,
    pub course: String,
    pub issued_on: NaiveDate,
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SaveCertificateError {
    #[error("Ran out of fresh certificate numbers after {0} attempts")]
    NumberSpaceExhausted(u32),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Repository for interfacing with the course certificate table
pub struct CertificateRepo;

impl CertificateRepo {
    /// Insert a new certificate under a freshly drawn unique number
    ///
    /// `file_path` derives the stored file path from the number the row
    /// ends up saved under.
    #[tracing::instrument(name = "Insert certificate", skip(pool, file_path))]
    pub async fn insert(
        pool: &SqlitePool,
        new_certificate: &NewCertificate,
        file_path: impl Fn(&CertificateNumber) -> String,
    ) -> Result<StoredCertificate, SaveCertificateError> {
        Self::insert_with(pool, new_certificate, file_path, CertificateNumber::generate).await
    }

    /// Insert loop with an injectable number source
    ///
    /// Each attempt checks for an existing row first; the unique
    /// constraint on `number` backstops the race between check and
    /// insert. Gives up after a fixed attempt budget rather than
    /// spinning on a saturated number space.
    async fn insert_with(
        pool: &SqlitePool,
        new_certificate: &NewCertificate,
        file_path: impl Fn(&CertificateNumber) -> String,
        mut candidates: impl FnMut() -> CertificateNumber,
    ) -> Result<StoredCertificate, SaveCertificateError> {
        for _ in 0..MAX_NUMBER_ATTEMPTS {
            let number = candidates();
            if Self::exists_by_number(pool, number.as_ref()).await? {
                continue;
            }

            let relative_path = file_path(&number);
            let created_at = Utc::now();
            let result = sqlx::query(
                "insert into certificates (number, recipient, course, issued_on, file_path, created_at) \
                 values (?, ?, ?, ?, ?, ?)",
            )
            .bind(number.as_ref())
            .bind(new_certificate.recipient.as_ref())
            .bind(new_certificate.course.as_ref())
            .bind(new_certificate.issued_on)
            .bind(&relative_path)
            .bind(created_at)
            .execute(pool)
            .await;

            match result {
                Ok(done) => {
                    return Ok(StoredCertificate {
                        id: done.last_insert_rowid(),
                        number,
                        file_path: relative_path,
                    })
                }
                Err(error) if is_unique_violation(&error) => continue,
                Err(error) => return Err(error.into()),
            }
        }

        Err(SaveCertificateError::NumberSpaceExhausted(
            MAX_NUMBER_ATTEMPTS,
        ))
    }

    #[tracing::instrument(name = "Check certificate number", skip(executor))]
    pub async fn exists_by_number<'con>(
        executor: impl SqliteExecutor<'con>,
        number: &str,
    ) -> sqlx::Result<bool> {
        sqlx::query_scalar("select exists(select 1 from certificates where number = ?)")
            .bind(number)
            .fetch_one(executor)
            .await
    }

    #[tracing::instrument(name = "Fetch certificate by id", skip(executor))]
    pub async fn fetch_by_id<'con>(
        executor: impl SqliteExecutor<'con>,
        id: i64,
    ) -> sqlx::Result<Option<Certificate>> {
        sqlx::query_as(
            "select id, number, recipient, course, issued_on, file_path, created_at \
             from certificates where id = ?",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    #[tracing::instrument(name = "Fetch certificates created since", skip(executor))]
    pub async fn fetch_created_since<'con>(
        executor: impl SqliteExecutor<'con>,
        since: DateTime<Utc>,
    ) -> sqlx::Result<Vec<Certificate>> {
        sqlx::query_as(
            "select id, number, recipient, course, issued_on, file_path, created_at \
             from certificates where created_at >= ? order by created_at",
        )
        .bind(since)
        .fetch_all(executor)
        .await
    }

    /// Delete every certificate row that has a rendered file on record
    #[tracing::instrument(name = "Clear certificate history", skip(executor))]
    pub async fn clear_history<'con>(executor: impl SqliteExecutor<'con>) -> sqlx::Result<u64> {
        let done = sqlx::query("delete from certificates where file_path is not null")
            .execute(executor)
            .await?;

        Ok(done.rows_affected())
    }
}
