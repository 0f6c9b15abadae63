use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Utc};

use rand::Rng;

use regex::Regex;

const SUFFIX_LEN: usize = 9;
const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A course certificate number: `CERT-<year>-<nine random chars>`
///
/// The suffix is drawn from uppercase letters and digits, so the
/// printed number survives being read back over the phone.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CertificateNumber(String);

impl CertificateNumber {
    /// Draw a random candidate number for the current year
    ///
    /// The result is a candidate only: uniqueness is enforced when the
    /// certificate row is saved.
    pub fn generate() -> Self {
        Self::generate_for_year(Utc::now().year())
    }

    pub fn generate_for_year(year: i32) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| {
                let i = rng.gen_range(0..SUFFIX_CHARSET.len());
                SUFFIX_CHARSET[i] as char
            })
            .collect();

        Self(format!("CERT-{:04}-{}", year, suffix))
    }
}

impl FromStr for CertificateNumber {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        lazy_static::lazy_static! {
            static ref NUMBER_REGEX: Regex = Regex::new(r"^CERT-\d{4}-[A-Z0-9]{9}$").unwrap();
        }

        // Numbers are matched case-insensitively everywhere
        let value = value.trim().to_uppercase();

        if value.is_empty() {
            return Err("Certificate number cannot be empty".into());
        }
        if !NUMBER_REGEX.is_match(&value) {
            return Err("Certificate number of incorrect format".into());
        }

        Ok(Self(value))
    }
}

impl AsRef<str> for CertificateNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CertificateNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
