use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::Context;

use zip::write::FileOptions;
use zip::ZipWriter;

use crate::repo::Certificate;

/// Build the dispatch archive for a batch of certificates
///
/// Entries are stored under their path relative to the storage root.
/// Certificates whose file went missing are skipped with a warning; an
/// archive with nothing left in it is an error.
pub fn build_archive(
    storage_root: &Path,
    certificates: &[Certificate],
    archive_path: &Path,
) -> anyhow::Result<usize> {
    let file = File::create(archive_path)
        .with_context(|| format!("Failed to create archive {}", archive_path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default();

    let mut entries = 0;
    for certificate in certificates {
        let Some(relative) = certificate.file_path.as_deref() else {
            tracing::warn!(number = %certificate.number, "Certificate has no file on record; skipping");
            continue;
        };

        let absolute = storage_root.join(relative);
        let bytes = match std::fs::read(&absolute) {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    path = %absolute.display(),
                    "Certificate file unreadable; skipping"
                );
                continue;
            }
        };

        zip.start_file(relative, options)
            .context("Failed to add archive entry")?;
        zip.write_all(&bytes)
            .context("Failed to write archive entry")?;
        entries += 1;
    }

    zip.finish().context("Failed to finish archive")?;
    anyhow::ensure!(entries > 0, "No certificate files could be archived");

    Ok(entries)
}
