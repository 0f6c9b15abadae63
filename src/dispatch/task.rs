use anyhow::Context;

use chrono::{DateTime, NaiveTime, Utc};

use serde::Serialize;

use sqlx::SqlitePool;

use url::Url;

use crate::client::{Email, EmailAttachment, EmailClient, SenderIdentity};
use crate::domain::EmailAddress;
use crate::repo::{CertificateRepo, MailSettingsRepo};
use crate::storage::{CertStorage, ARCHIVE_NAME};

use super::archive::build_archive;

/// Outcome of one dispatch pass
///
/// Also serialized as the body of the manual trigger endpoint.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent { certificates: usize },
    NoNewCertificates,
    MailNotConfigured,
    Failed { reason: String },
}

/// Bundles freshly created certificates into a zip archive and emails
/// it to the configured recipient
pub struct DispatchTask {
    pool: SqlitePool,
    storage: CertStorage,
    email_client: EmailClient,
    tracker_url: Url,
}

impl DispatchTask {
    pub fn new(
        pool: SqlitePool,
        storage: CertStorage,
        email_client: EmailClient,
        tracker_url: Url,
    ) -> Self {
        Self {
            pool,
            storage,
            email_client,
            tracker_url,
        }
    }

    /// Run one dispatch pass
    ///
    /// Never fails: problems come back as `Failed`, so neither the
    /// scheduler loop nor the trigger endpoint has to unwind.
    #[tracing::instrument(name = "Dispatch recent certificates", skip(self))]
    pub async fn run(&self) -> DispatchOutcome {
        match self.try_run().await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!(error = ?error, "Certificate dispatch failed");
                DispatchOutcome::Failed {
                    reason: format!("{:#}", error),
                }
            }
        }
    }

    async fn try_run(&self) -> anyhow::Result<DispatchOutcome> {
        let since = window_start(Utc::now());
        let recent = CertificateRepo::fetch_created_since(&self.pool, since)
            .await
            .context("Failed to query recent certificates")?;
        if recent.is_empty() {
            tracing::info!("No new certificates to dispatch");
            return Ok(DispatchOutcome::NoNewCertificates);
        }
        tracing::info!(count = recent.len(), %since, "Collected certificates for dispatch");

        let archive_path = self.storage.archive_path();
        let archived = build_archive(self.storage.root(), &recent, &archive_path)?;

        let Some((sender, recipient)) = self.load_mail_config().await? else {
            tracing::warn!("Mail settings missing or incomplete; dispatch skipped");
            return Ok(DispatchOutcome::MailNotConfigured);
        };

        let zip_bytes = std::fs::read(&archive_path)
            .with_context(|| format!("Failed to read archive {}", archive_path.display()))?;
        let email = self.build_email(recipient, &zip_bytes);

        match self.email_client.send(&sender, &email).await {
            Ok(()) => {
                tracing::info!(certificates = archived, "Certificate archive sent");
                Ok(DispatchOutcome::Sent {
                    certificates: archived,
                })
            }
            Err(error) => {
                tracing::error!(error = ?error, "Failed to send certificate archive");
                Ok(DispatchOutcome::Failed {
                    reason: format!("Failed to send certificate archive: {}", error),
                })
            }
        }
    }

    /// Sender identity and recipient from the stored mail settings,
    /// provided the configuration is complete enough to send with
    async fn load_mail_config(&self) -> anyhow::Result<Option<(SenderIdentity, EmailAddress)>> {
        let Some(record) = MailSettingsRepo::fetch(&self.pool)
            .await
            .context("Failed to load mail settings")?
        else {
            return Ok(None);
        };

        let (Some(sender), Some(recipient), Some(password)) =
            (record.sender, record.recipient, record.password)
        else {
            return Ok(None);
        };

        let Ok(address) = sender.parse::<EmailAddress>() else {
            tracing::warn!("Stored sender address does not parse");
            return Ok(None);
        };
        let Ok(recipient) = recipient.parse::<EmailAddress>() else {
            tracing::warn!("Stored recipient address does not parse");
            return Ok(None);
        };

        Ok(Some((
            SenderIdentity {
                address,
                credential: password,
            },
            recipient,
        )))
    }

    fn build_email(&self, recipient: EmailAddress, zip_bytes: &[u8]) -> Email {
        let text_body =
            "A zip archive with the newly issued certificates is attached.".to_string();
        let html_body = format!(
            "<html><body><p>A zip archive with the newly issued certificates is attached.</p>\
             <img src=\"{}\" width=\"1\" height=\"1\" style=\"display:none;\" alt=\"tracker\" />\
             </body></html>",
            self.tracker_url
        );

        Email {
            recipient,
            subject: "Certificates".into(),
            html_body,
            text_body,
            attachment: Some(EmailAttachment::from_bytes(
                ARCHIVE_NAME,
                "application/zip",
                zip_bytes,
            )),
        }
    }
}

/// Start of the dispatch window: midnight UTC of the previous day
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let yesterday = now.date_naive() - chrono::Duration::days(1);
    yesterday.and_time(NaiveTime::MIN).and_utc()
}
