use std::time::Duration;

use reqwest::Client;

use serde::Serialize;

use secrecy::Secret;

use url::Url;

use crate::domain::EmailAddress;

const POSTMARK_TOKEN_HEADER: &str = "X-Postmark-Server-Token";

/// Sender address and server token for one send
///
/// Unlike the transport parameters these live in the database, so they
/// are passed per call instead of at construction.
#[derive(Debug)]
pub struct SenderIdentity {
    pub address: EmailAddress,
    pub credential: Secret<String>,
}

#[derive(Debug)]
pub struct EmailClient {
    client: Client,

    api_send_email_url: Url,
}

impl EmailClient {
    pub fn new(api_timeout: Duration, api_base_url: Url) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(api_timeout).build()?;

        let api_send_email_url = api_base_url.join("email")?;

        Ok(Self {
            client,
            api_send_email_url,
        })
    }

    #[tracing::instrument(
        name = "Send an email via API",
        skip(email),
        fields(recipient = %email.recipient, subject = %email.subject)
    )]
    pub async fn send(&self, sender: &SenderIdentity, email: &Email) -> reqwest::Result<()> {
        use secrecy::ExposeSecret;

        let body = email.as_request(&sender.address);

        self.client
            .post(self.api_send_email_url.clone())
            .header(POSTMARK_TOKEN_HEADER, sender.credential.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct Email {
    pub recipient: EmailAddress,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    pub attachment: Option<EmailAttachment>,
}

impl Email {
    fn as_request<'e>(&'e self, sender: &'e EmailAddress) -> SendEmailRequest<'e> {
        SendEmailRequest {
            to: self.recipient.as_ref(),
            from: sender.as_ref(),
            subject: &self.subject,
            html_body: &self.html_body,
            text_body: &self.text_body,
            attachments: self
                .attachment
                .iter()
                .map(|attachment| AttachmentRequest {
                    name: &attachment.name,
                    content: &attachment.content,
                    content_type: &attachment.content_type,
                })
                .collect(),
        }
    }
}

/// A file attached to an outgoing email, carried base64-encoded
#[derive(Debug)]
pub struct EmailAttachment {
    name: String,
    content_type: String,
    content: String,
}

impl EmailAttachment {
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: &[u8],
    ) -> Self {
        use base64::Engine;

        let content = base64::engine::general_purpose::STANDARD.encode(bytes);

        Self {
            name: name.into(),
            content_type: content_type.into(),
            content,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    to: &'a str,
    from: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<AttachmentRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AttachmentRequest<'a> {
    name: &'a str,
    content: &'a str,
    content_type: &'a str,
}
