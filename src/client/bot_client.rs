use std::time::Duration;

use anyhow::Context;

use reqwest::Client;

use secrecy::Secret;

use serde::{Deserialize, Serialize};

use url::Url;

/// How long a getUpdates call is allowed to block server-side
const LONG_POLL_SECONDS: u64 = 30;

/// Minimal Bot API client: long-polled updates plus message sending
#[derive(Debug)]
pub struct BotClient {
    client: Client,

    api_base_url: Url,
    token: Secret<String>,
}

/// One incoming update from the long poll
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl BotClient {
    pub fn new(
        api_timeout: Duration,
        api_base_url: Url,
        token: Secret<String>,
    ) -> anyhow::Result<Self> {
        // The request timeout has to outlast the long poll
        anyhow::ensure!(
            api_timeout > Duration::from_secs(LONG_POLL_SECONDS),
            "Bot API timeout must exceed the long poll window"
        );

        let client = Client::builder().timeout(api_timeout).build()?;

        Ok(Self {
            client,
            api_base_url,
            token,
        })
    }

    /// Fetch updates newer than `offset`, blocking up to the long poll
    /// window when there is nothing to deliver
    #[tracing::instrument(name = "Poll bot updates", skip(self))]
    pub async fn get_updates(&self, offset: i64) -> anyhow::Result<Vec<Update>> {
        #[derive(Debug, Serialize)]
        struct GetUpdatesRequest {
            offset: i64,
            timeout: u64,
        }

        let body = GetUpdatesRequest {
            offset,
            timeout: LONG_POLL_SECONDS,
        };

        let response: ApiResponse<Vec<Update>> = self
            .client
            .post(self.method_url("getUpdates")?)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        response.into_result()
    }

    #[tracing::instrument(name = "Send bot message", skip(self, text))]
    pub async fn send_message(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        self.send(SendMessageRequest {
            chat_id,
            text,
            reply_markup: None,
        })
        .await
    }

    /// Send a message along with a persistent reply keyboard
    #[tracing::instrument(name = "Send bot keyboard", skip(self, text, rows))]
    pub async fn send_message_with_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        rows: &[&[&str]],
    ) -> anyhow::Result<()> {
        let keyboard = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|label| KeyboardButton {
                        text: label.to_string(),
                    })
                    .collect()
            })
            .collect();

        self.send(SendMessageRequest {
            chat_id,
            text,
            reply_markup: Some(ReplyKeyboardMarkup {
                keyboard,
                resize_keyboard: true,
            }),
        })
        .await
    }

    async fn send(&self, request: SendMessageRequest<'_>) -> anyhow::Result<()> {
        let response: ApiResponse<serde_json::Value> = self
            .client
            .post(self.method_url("sendMessage")?)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        response.into_result().map(|_| ())
    }

    fn method_url(&self, method: &str) -> Result<Url, url::ParseError> {
        use secrecy::ExposeSecret;

        self.api_base_url
            .join(&format!("bot{}/{}", self.token.expose_secret(), method))
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> anyhow::Result<T> {
        if !self.ok {
            anyhow::bail!(
                "Bot API error: {}",
                self.description.unwrap_or_else(|| "unknown".into())
            );
        }
        self.result.context("Bot API response missing result")
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyKeyboardMarkup>,
}

#[derive(Debug, Serialize)]
struct ReplyKeyboardMarkup {
    keyboard: Vec<Vec<KeyboardButton>>,
    resize_keyboard: bool,
}

#[derive(Debug, Serialize)]
struct KeyboardButton {
    text: String,
}
