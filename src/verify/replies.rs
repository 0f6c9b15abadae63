//! Canned replies for the verification chat bot

pub const START: &str =
    "Hello! I can check whether a certificate number is genuine. Use the buttons below.";

pub const HELP: &str =
    "Press \"Check certificate\" and send the number exactly as printed on the certificate.";

pub const ENTER_NUMBER: &str = "Enter the certificate number:";

pub const COURSE_VALID: &str =
    "This certificate is valid. It was issued for completing one of our courses.";

pub const GIFT_VALID: &str = "This gift certificate is valid.";

pub const GIFT_EXPIRED: &str = "This gift certificate has expired.";

pub const NOT_FOUND: &str =
    "No certificate with this number was found. Check the number and try again.";
