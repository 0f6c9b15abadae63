mod certificates;
mod gift_certificates;
mod mail_settings;

pub use certificates::{
    Certificate, CertificateRepo, NewCertificate, SaveCertificateError, StoredCertificate,
};
pub use gift_certificates::{
    GiftCertificate, GiftCertificateRepo, NewGiftCertificate, SaveGiftCertificateError,
    StoredGiftCertificate,
};
pub use mail_settings::{MailSettingsRecord, MailSettingsRepo, NewMailSettings};

/// Attempt budget for drawing a unique certificate number
pub const MAX_NUMBER_ATTEMPTS: u32 = 32;

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> sqlx::SqlitePool {
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}
