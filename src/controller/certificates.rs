use actix_web::dev::HttpServiceFactory;
use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpResponse, Responder, ResponseError};

use chrono::Utc;

use serde::Deserialize;

use sqlx::SqlitePool;

use thiserror::Error;

use crate::render::{
    render_course_certificate, CourseCertificateDoc, RenderContext, Template,
};
use crate::repo::{CertificateRepo, NewCertificate, SaveCertificateError};
use crate::storage::CertStorage;
use crate::upload::UploadQueue;

use super::pdf_response;

/// Request body for issuing a new course certificate
#[derive(Debug, Deserialize)]
pub struct NewCertificateRequest {
    name: String,
    course: String,
    template: Option<String>,
}

impl TryInto<NewCertificate> for NewCertificateRequest {
    type Error = String;

    fn try_into(self) -> Result<NewCertificate, Self::Error> {
        let recipient = self.name.parse()?;
        let course = self.course.parse()?;

        Ok(NewCertificate {
            recipient,
            course,
            issued_on: Utc::now().date_naive(),
        })
    }
}

/// Issue endpoint for new course certificates
#[tracing::instrument(
    name = "Issue a course certificate",
    skip(pool, storage, render, uploads)
)]
#[post("")]
async fn create(
    pool: web::Data<SqlitePool>,
    storage: web::Data<CertStorage>,
    render: web::Data<RenderContext>,
    uploads: web::Data<UploadQueue>,
    body: web::Json<NewCertificateRequest>,
) -> Result<impl Responder, IssueError> {
    // The template choice rides along the validated fields
    let template = Template::from_request(body.template.as_deref());
    // Validate the request against the domain types
    let new_certificate: NewCertificate = body.0.try_into().map_err(IssueError::ParseError)?;

    // Persist under a fresh number; the stored file name carries the
    // number the row is saved with
    let stored = CertificateRepo::insert(&pool, &new_certificate, |number| {
        CertStorage::course_file(&new_certificate.recipient, number, &new_certificate.course)
    })
    .await?;

    // Render the document and keep a copy in storage
    let doc = CourseCertificateDoc {
        recipient: new_certificate.recipient.as_ref(),
        course: new_certificate.course.as_ref(),
        issued_on: new_certificate.issued_on,
        number: stored.number.as_ref(),
    };
    let bytes = render_course_certificate(&doc, &render.verification_url, template)
        .map_err(IssueError::RenderError)?;
    let path = storage
        .write(&stored.file_path, &bytes)
        .map_err(IssueError::StorageError)?;

    // Queue the best-effort drive upload
    uploads.enqueue(path);

    Ok(pdf_response(&stored.file_path, bytes))
}

/// Download endpoint for a previously issued certificate
#[tracing::instrument(name = "Download a course certificate", skip(pool, storage))]
#[get("/{id}/download")]
async fn download(
    pool: web::Data<SqlitePool>,
    storage: web::Data<CertStorage>,
    path: web::Path<(i64,)>,
) -> Result<impl Responder, IssueError> {
    let (id,) = path.into_inner();

    // Look up the stored record
    let certificate = CertificateRepo::fetch_by_id(pool.get_ref(), id)
        .await?
        .ok_or(IssueError::NotFound)?;
    // A record without a rendered file cannot be downloaded
    let relative_path = certificate.file_path.ok_or(IssueError::NotFound)?;

    let bytes = storage
        .read(&relative_path)
        .map_err(IssueError::StorageError)?;

    Ok(pdf_response(&relative_path, bytes))
}

/// Bulk delete of issued certificates that have a file on record
#[tracing::instrument(name = "Clear issued certificates", skip(pool))]
#[post("/clear_history")]
async fn clear_history(pool: web::Data<SqlitePool>) -> Result<impl Responder, IssueError> {
    let deleted = CertificateRepo::clear_history(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": deleted })))
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("Failed to parse {0}")]
    ParseError(String),

    #[error("Certificate not found")]
    NotFound,

    #[error("Internal Server Error")]
    SaveError(#[from] SaveCertificateError),

    #[error("Internal Server Error")]
    RenderError(anyhow::Error),

    #[error("Internal Server Error")]
    StorageError(anyhow::Error),

    #[error("Internal Server Error")]
    DatabaseError(#[from] sqlx::Error),
}

impl ResponseError for IssueError {
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

/// Course certificate endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/certificates")
        .service(create)
        .service(download)
        .service(clear_history)
}
