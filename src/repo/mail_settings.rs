use chrono::Utc;

use secrecy::Secret;

use sqlx::SqliteExecutor;

use crate::domain::EmailAddress;

/// New mail configuration to store
///
/// Fields left as `None` are stored as nulls; the dispatch task decides
/// at send time whether the configuration is complete enough to use.
#[derive(Debug)]
pub struct NewMailSettings {
    pub sender: Option<EmailAddress>,
    pub recipient: Option<EmailAddress>,
    pub password: Option<Secret<String>>,
}

/// Stored mail configuration
#[derive(Debug)]
pub struct MailSettingsRecord {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub password: Option<Secret<String>>,
}

/// Repository for the single-row mail settings table
///
/// The table is constrained to `id = 1`, so saving always overwrites
/// the one live configuration.
pub struct MailSettingsRepo;

impl MailSettingsRepo {
    #[tracing::instrument(name = "Save mail settings", skip(executor))]
    pub async fn upsert<'con>(
        executor: impl SqliteExecutor<'con>,
        new_settings: &NewMailSettings,
    ) -> sqlx::Result<()> {
        use secrecy::ExposeSecret;

        let updated_at = Utc::now();
        sqlx::query(
            "insert into mail_settings (id, sender, recipient, password, updated_at) \
             values (1, ?, ?, ?, ?) \
             on conflict (id) do update set \
                 sender = excluded.sender, \
                 recipient = excluded.recipient, \
                 password = excluded.password, \
                 updated_at = excluded.updated_at",
        )
        .bind(new_settings.sender.as_ref().map(|s| s.to_string()))
        .bind(new_settings.recipient.as_ref().map(|r| r.to_string()))
        .bind(
            new_settings
                .password
                .as_ref()
                .map(|p| p.expose_secret().clone()),
        )
        .bind(updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    #[tracing::instrument(name = "Fetch mail settings", skip(executor))]
    pub async fn fetch<'con>(
        executor: impl SqliteExecutor<'con>,
    ) -> sqlx::Result<Option<MailSettingsRecord>> {
        let row: Option<(Option<String>, Option<String>, Option<String>)> =
            sqlx::query_as("select sender, recipient, password from mail_settings where id = 1")
                .fetch_optional(executor)
                .await?;

        Ok(row.map(|(sender, recipient, password)| MailSettingsRecord {
            sender,
            recipient,
            password: password.map(Secret::new),
        }))
    }
}
