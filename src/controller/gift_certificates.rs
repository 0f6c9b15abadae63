use actix_web::dev::HttpServiceFactory;
use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpResponse, Responder, ResponseError};

use chrono::NaiveDate;

use serde::Deserialize;

use sqlx::SqlitePool;

use thiserror::Error;

use crate::render::{render_gift_certificate, GiftCertificateDoc, RenderContext};
use crate::repo::{GiftCertificateRepo, NewGiftCertificate, SaveGiftCertificateError};
use crate::storage::CertStorage;
use crate::upload::UploadQueue;

use super::pdf_response;

/// Request body for issuing a new gift certificate
#[derive(Debug, Deserialize)]
pub struct NewGiftCertificateRequest {
    course: String,
    expiry_date: NaiveDate,
}

impl TryInto<NewGiftCertificate> for NewGiftCertificateRequest {
    type Error = String;

    fn try_into(self) -> Result<NewGiftCertificate, Self::Error> {
        let course = self.course.parse()?;

        Ok(NewGiftCertificate {
            course,
            expires_on: self.expiry_date,
        })
    }
}

/// Issue endpoint for new gift certificates
#[tracing::instrument(
    name = "Issue a gift certificate",
    skip(pool, storage, render, uploads)
)]
#[post("")]
async fn create(
    pool: web::Data<SqlitePool>,
    storage: web::Data<CertStorage>,
    render: web::Data<RenderContext>,
    uploads: web::Data<UploadQueue>,
    body: web::Json<NewGiftCertificateRequest>,
) -> Result<impl Responder, IssueGiftError> {
    // Validate the request against the domain types
    let new_gift: NewGiftCertificate = body.0.try_into().map_err(IssueGiftError::ParseError)?;

    // Persist under a fresh number; the stored file name carries the
    // number the row is saved with
    let stored = GiftCertificateRepo::insert(&pool, &new_gift, |number| {
        CertStorage::gift_file(number, &new_gift.course)
    })
    .await?;

    // Render the document and keep a copy in storage
    let doc = GiftCertificateDoc {
        course: new_gift.course.as_ref(),
        expires_on: new_gift.expires_on,
        number: stored.number.as_ref(),
    };
    let bytes = render_gift_certificate(&doc, &render.verification_url)
        .map_err(IssueGiftError::RenderError)?;
    let path = storage
        .write(&stored.file_path, &bytes)
        .map_err(IssueGiftError::StorageError)?;

    // Queue the best-effort drive upload
    uploads.enqueue(path);

    Ok(pdf_response(&stored.file_path, bytes))
}

/// Download endpoint for a previously issued gift certificate
#[tracing::instrument(name = "Download a gift certificate", skip(pool, storage))]
#[get("/{id}/download")]
async fn download(
    pool: web::Data<SqlitePool>,
    storage: web::Data<CertStorage>,
    path: web::Path<(i64,)>,
) -> Result<impl Responder, IssueGiftError> {
    let (id,) = path.into_inner();

    // Look up the stored record
    let gift = GiftCertificateRepo::fetch_by_id(pool.get_ref(), id)
        .await?
        .ok_or(IssueGiftError::NotFound)?;
    // A record without a rendered file cannot be downloaded
    let relative_path = gift.file_path.ok_or(IssueGiftError::NotFound)?;

    let bytes = storage
        .read(&relative_path)
        .map_err(IssueGiftError::StorageError)?;

    Ok(pdf_response(&relative_path, bytes))
}

/// Bulk delete of issued gift certificates that have a file on record
#[tracing::instrument(name = "Clear issued gift certificates", skip(pool))]
#[post("/clear_history")]
async fn clear_history(pool: web::Data<SqlitePool>) -> Result<impl Responder, IssueGiftError> {
    let deleted = GiftCertificateRepo::clear_history(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": deleted })))
}

#[derive(Debug, Error)]
pub enum IssueGiftError {
    #[error("Failed to parse {0}")]
    ParseError(String),

    #[error("Gift certificate not found")]
    NotFound,

    #[error("Internal Server Error")]
    SaveError(#[from] SaveGiftCertificateError),

    #[error("Internal Server Error")]
    RenderError(anyhow::Error),

    #[error("Internal Server Error")]
    StorageError(anyhow::Error),

    #[error("Internal Server Error")]
    DatabaseError(#[from] sqlx::Error),
}

impl ResponseError for IssueGiftError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ParseError(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::SaveError(_)
            | Self::RenderError(_)
            | Self::StorageError(_)
            | Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Gift certificate endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/gift_certificates")
        .service(create)
        .service(download)
        .service(clear_history)
}
