mod certificate_number;
mod course_title;
mod email_address;
mod gift_certificate_number;
mod recipient_name;

pub use certificate_number::CertificateNumber;
pub use course_title::CourseTitle;
pub use email_address::EmailAddress;
pub use gift_certificate_number::GiftCertificateNumber;
pub use recipient_name::RecipientName;
