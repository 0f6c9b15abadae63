use chrono::Utc;

use sqlx::SqlitePool;

use crate::repo::{CertificateRepo, GiftCertificateRepo};

/// What a verification lookup concluded about a number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    ValidCourse,
    ValidGift,
    ExpiredGift,
    NotFound,
}

/// Resolve a user supplied number against both certificate tables
///
/// Input is trimmed and uppercased first. Course certificates are
/// checked before gift certificates and never expire; gift
/// certificates stay valid through their expiry date.
#[tracing::instrument(name = "Verify certificate number", skip(pool))]
pub async fn lookup(pool: &SqlitePool, raw: &str) -> sqlx::Result<LookupOutcome> {
    let number = raw.trim().to_uppercase();

    if CertificateRepo::exists_by_number(pool, &number).await? {
        return Ok(LookupOutcome::ValidCourse);
    }

    match GiftCertificateRepo::fetch_expiry_by_number(pool, &number).await? {
        Some(expires_on) if expires_on >= Utc::now().date_naive() => Ok(LookupOutcome::ValidGift),
        Some(_) => Ok(LookupOutcome::ExpiredGift),
        None => Ok(LookupOutcome::NotFound),
    }
}
