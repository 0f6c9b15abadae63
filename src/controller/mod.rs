use std::ffi::OsStr;
use std::path::Path;

use actix_web::http::header;
use actix_web::HttpResponse;

pub mod certificates;
pub mod dispatch;
pub mod gift_certificates;
pub mod mail_settings;
pub mod tracker;

/// 200 response carrying a rendered PDF as a file download
fn pdf_response(relative_path: &str, bytes: Vec<u8>) -> HttpResponse {
    let file_name = Path::new(relative_path)
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or("certificate.pdf");

    HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        ))
        .body(bytes)
}
