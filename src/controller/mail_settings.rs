use actix_web::dev::HttpServiceFactory;
use actix_web::http::StatusCode;
use actix_web::{put, web, HttpResponse, Responder, ResponseError};

use secrecy::Secret;

use serde::Deserialize;

use sqlx::SqlitePool;

use thiserror::Error;

use crate::domain::EmailAddress;
use crate::repo::{MailSettingsRepo, NewMailSettings};

/// Request body for replacing the dispatch mail configuration
#[derive(Debug, Deserialize)]
pub struct MailSettingsRequest {
    sender: Option<String>,
    recipient: Option<String>,
    password: Option<String>,
}

impl TryInto<NewMailSettings> for MailSettingsRequest {
    type Error = String;

    fn try_into(self) -> Result<NewMailSettings, Self::Error> {
        let sender = self
            .sender
            .map(|sender| sender.parse::<EmailAddress>())
            .transpose()?;
        let recipient = self
            .recipient
            .map(|recipient| recipient.parse::<EmailAddress>())
            .transpose()?;
        let password = self.password.map(Secret::new);

        Ok(NewMailSettings {
            sender,
            recipient,
            password,
        })
    }
}

/// Replace the single mail configuration record
#[tracing::instrument(name = "Update mail settings", skip(pool, body))]
#[put("")]
async fn update(
    pool: web::Data<SqlitePool>,
    body: web::Json<MailSettingsRequest>,
) -> Result<impl Responder, UpdateMailSettingsError> {
    // Validate the addresses before they reach the store
    let new_settings: NewMailSettings = body
        .0
        .try_into()
        .map_err(UpdateMailSettingsError::ParseError)?;

    MailSettingsRepo::upsert(pool.get_ref(), &new_settings).await?;

    Ok(HttpResponse::NoContent())
}

#[derive(Debug, Error)]
pub enum UpdateMailSettingsError {
    #[error("Failed to parse {0}")]
    ParseError(String),

    #[error("Internal Server Error")]
    DatabaseError(#[from] sqlx::Error),
}

impl ResponseError for UpdateMailSettingsError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ParseError(_) => StatusCode::BAD_REQUEST,
            Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Mail configuration endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/mail_settings").service(update)
}
