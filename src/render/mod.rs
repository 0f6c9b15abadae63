mod pdf;

pub use pdf::{
    render_course_certificate, render_gift_certificate, CourseCertificateDoc, GiftCertificateDoc,
};

use url::Url;

/// Certificate art style, chosen per render request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Template {
    #[default]
    Classic,
    Modern,
}

impl Template {
    /// Map the template name from a render request
    ///
    /// Unknown names fall back to the classic style instead of failing
    /// the request.
    pub fn from_request(value: Option<&str>) -> Self {
        match value {
            Some("template2") | Some("modern") => Self::Modern,
            _ => Self::Classic,
        }
    }
}

/// Shared state for render endpoints
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub verification_url: Url,
}
