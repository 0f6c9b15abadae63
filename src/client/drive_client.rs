use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use secrecy::Secret;

use serde::Deserialize;

use url::Url;

const UPLOAD_BOUNDARY: &str = "certmill_upload_boundary";

/// Client for the remote drive file upload API
///
/// Uploads use the single-shot `multipart/related` form: one JSON
/// metadata part naming the file and its parent folder, one media part
/// with the bytes.
#[derive(Debug)]
pub struct DriveClient {
    client: Client,

    api_upload_url: Url,
    api_auth_token: Secret<String>,
}

impl DriveClient {
    pub fn new(
        api_timeout: Duration,
        api_base_url: Url,
        api_auth_token: Secret<String>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(api_timeout).build()?;

        let mut api_upload_url = api_base_url.join("upload/drive/v3/files")?;
        api_upload_url.set_query(Some("uploadType=multipart&fields=id"));

        Ok(Self {
            client,
            api_upload_url,
            api_auth_token,
        })
    }

    /// Upload one local file into the configured folder, returning the
    /// remote file id
    #[tracing::instrument(name = "Upload file to drive", skip(self))]
    pub async fn upload(&self, path: &Path, folder_id: &str) -> anyhow::Result<String> {
        use secrecy::ExposeSecret;

        let file_name = path
            .file_name()
            .and_then(OsStr::to_str)
            .context("Upload path has no usable file name")?;
        let media = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read upload file {}", path.display()))?;

        let metadata = serde_json::json!({
            "name": file_name,
            "parents": [folder_id],
        });
        let body = multipart_related_body(&metadata, content_type_for(file_name), &media);

        let response: UploadedFile = self
            .client
            .post(self.api_upload_url.clone())
            .bearer_auth(self.api_auth_token.expose_secret())
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", UPLOAD_BOUNDARY),
            )
            .body(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.id)
    }
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    id: String,
}

fn content_type_for(file_name: &str) -> &'static str {
    match Path::new(file_name).extension().and_then(OsStr::to_str) {
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

fn multipart_related_body(
    metadata: &serde_json::Value,
    media_type: &str,
    media: &[u8],
) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{}\r\n",
            UPLOAD_BOUNDARY, metadata
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!("--{}\r\nContent-Type: {}\r\n\r\n", UPLOAD_BOUNDARY, media_type).as_bytes(),
    );
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{}--\r\n", UPLOAD_BOUNDARY).as_bytes());
    body
}
