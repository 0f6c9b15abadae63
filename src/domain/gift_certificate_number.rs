use std::fmt;
use std::str::FromStr;

use rand::Rng;

use regex::Regex;

const DIGITS: usize = 11;
const DIGIT_CHARSET: &[u8] = b"0123456789";

/// A gift certificate number: eleven decimal digits
///
/// Leading zeros are allowed, so the number is kept as a string rather
/// than an integer.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct GiftCertificateNumber(String);

impl GiftCertificateNumber {
    /// Draw a random candidate number
    ///
    /// Uniqueness is enforced when the gift certificate row is saved.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let number: String = (0..DIGITS)
            .map(|_| {
                let i = rng.gen_range(0..DIGIT_CHARSET.len());
                DIGIT_CHARSET[i] as char
            })
            .collect();

        Self(number)
    }
}

impl FromStr for GiftCertificateNumber {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        lazy_static::lazy_static! {
            static ref NUMBER_REGEX: Regex = Regex::new(r"^\d{11}$").unwrap();
        }

        let value = value.trim();

        if value.is_empty() {
            return Err("Gift certificate number cannot be empty".into());
        }
        if !NUMBER_REGEX.is_match(value) {
            return Err(format!("Gift certificate number must be {} digits", DIGITS));
        }

        Ok(Self(value.to_string()))
    }
}

impl AsRef<str> for GiftCertificateNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GiftCertificateNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
