use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::client::DriveClient;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Handle for queueing certificate files for drive upload
///
/// Uploads are best effort: the worker retries with backoff and
/// eventually gives up with an error log, without ever failing the
/// render request that queued the file.
#[derive(Debug, Clone)]
pub struct UploadQueue {
    tx: mpsc::UnboundedSender<UploadJob>,
}

#[derive(Debug)]
struct UploadJob {
    local_path: PathBuf,
}

impl UploadQueue {
    /// Spawn the upload worker, returning the queue handle and the
    /// worker's join handle
    pub fn spawn(
        client: DriveClient,
        folder_id: String,
        mut shutdown: watch::Receiver<bool>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<UploadJob>();

        let worker = tokio::spawn(async move {
            tracing::info!("Upload worker started");
            loop {
                tokio::select! {
                    job = rx.recv() => {
                        let Some(job) = job else { return };
                        upload_with_retry(&client, &folder_id, &job.local_path).await;
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Upload worker shutting down");
                        return;
                    }
                }
            }
        });

        (Self { tx }, worker)
    }

    pub fn enqueue(&self, local_path: PathBuf) {
        if self.tx.send(UploadJob { local_path }).is_err() {
            tracing::warn!("Upload worker is gone; dropping upload job");
        }
    }
}

async fn upload_with_retry(client: &DriveClient, folder_id: &str, path: &Path) {
    let mut delay = INITIAL_RETRY_DELAY;
    for attempt in 1..=MAX_ATTEMPTS {
        match client.upload(path, folder_id).await {
            Ok(file_id) => {
                tracing::info!(%file_id, path = %path.display(), "Certificate uploaded to drive");
                return;
            }
            Err(error) if attempt < MAX_ATTEMPTS => {
                tracing::warn!(
                    error = %error,
                    attempt,
                    path = %path.display(),
                    "Certificate upload failed; retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(error) => {
                tracing::error!(
                    error = %error,
                    path = %path.display(),
                    "Certificate upload failed; giving up"
                );
            }
        }
    }
}
