use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::domain::{CertificateNumber, CourseTitle, GiftCertificateNumber, RecipientName};

/// Directory for course certificates, relative to the storage root
pub const COURSE_DIR: &str = "graduation_certificates";
/// Directory for gift certificates, relative to the storage root
pub const GIFT_DIR: &str = "gift_certificates";
/// Name of the dispatch archive, written at the storage root
pub const ARCHIVE_NAME: &str = "certs.zip";

/// On-disk layout for rendered certificate files
///
/// Database rows store paths relative to the storage root, so the root
/// can move without touching the rows.
#[derive(Debug, Clone)]
pub struct CertStorage {
    root: PathBuf,
}

impl CertStorage {
    pub fn new(root: PathBuf) -> anyhow::Result<Self> {
        for dir in [COURSE_DIR, GIFT_DIR] {
            fs::create_dir_all(root.join(dir))
                .with_context(|| format!("Failed to create storage directory {}", dir))?;
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn absolute(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.root.join(ARCHIVE_NAME)
    }

    /// Relative path for a rendered course certificate
    pub fn course_file(
        recipient: &RecipientName,
        number: &CertificateNumber,
        course: &CourseTitle,
    ) -> String {
        format!(
            "{}/{}_{}_{}.pdf",
            COURSE_DIR,
            sanitize(recipient.as_ref()),
            number,
            sanitize(course.as_ref())
        )
    }

    /// Relative path for a rendered gift certificate
    pub fn gift_file(number: &GiftCertificateNumber, course: &CourseTitle) -> String {
        format!("{}/gift_{}_{}.pdf", GIFT_DIR, number, sanitize(course.as_ref()))
    }

    pub fn write(&self, relative: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
        let path = self.absolute(relative);
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to write certificate file {}", path.display()))?;

        Ok(path)
    }

    pub fn read(&self, relative: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.absolute(relative);
        fs::read(&path)
            .with_context(|| format!("Failed to read certificate file {}", path.display()))
    }
}

/// Replace anything unsafe in a file name component with underscores
fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
