use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

use chrono::NaiveTime;

use config::{Config, Environment, File};

use secrecy::Secret;

use serde::Deserialize;
use serde_aux::prelude::*;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};

use url::Url;

/// Runtime environment, either `Dev` for local development, or `Prod` for release
#[derive(Debug)]
pub enum Runtime {
    Dev,
    Prod,
}

impl Runtime {
    pub fn as_str(&self) -> &str {
        match self {
            Runtime::Dev => "dev",
            Runtime::Prod => "prod",
        }
    }
}

impl TryFrom<String> for Runtime {
    type Error = anyhow::Error;

    fn try_from(s: String) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => anyhow::bail!("{} is not a valid runtime environment", other),
        }
    }
}

/// Application settings wrapper
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: ApplicationSettings,
    pub database: DatabaseSettings,
    pub storage: StorageSettings,
    pub email: EmailSettings,
    pub dispatch: DispatchSettings,
    pub bot: BotSettings,
    pub drive: DriveSettings,
}

impl Settings {
    /// Load application settings from the settings directory
    pub fn load() -> anyhow::Result<Self> {
        // Get the path to the settings directory
        let path = env::current_dir()?.join("settings");
        // Get the current environment based on the `APP_ENV` environment variable, default to `Dev`
        let runtime: Runtime = env::var("APP_ENV")
            .unwrap_or_else(|_| "dev".into())
            .try_into()?;

        Self::load_from(runtime, &path)
    }
    /// Load application settings from a specified path and runtime
    pub fn load_from(runtime: Runtime, base_path: &Path) -> anyhow::Result<Self> {
        Config::builder()
            // Include the base settings
            .add_source(File::from(base_path.join("base")).required(true))
            // Include the runtime settings
            .add_source(File::from(base_path.join(runtime.as_str())).required(true))
            // Override/include any settings from environment variables
            // NOTE: Should be used for any prod secrets. Takes the form `APP_<settings category>__<setting name>`.
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
            .context("Failed to load/deserialize settings")
    }
}

#[derive(Debug, Deserialize)]
pub struct ApplicationSettings {
    host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    port: u16,
}

impl ApplicationSettings {
    /// The application address to bind to
    pub fn addr(&self) -> (&str, u16) {
        (&self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    path: String,
}

impl DatabaseSettings {
    /// Connection options for the certificate database file
    pub fn connect_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
    }
}

#[derive(Debug, Deserialize)]
pub struct StorageSettings {
    root: String,
}

impl StorageSettings {
    /// Root directory for rendered certificate files
    pub fn root(&self) -> PathBuf {
        PathBuf::from(&self.root)
    }
}

#[derive(Debug, Deserialize)]
pub struct EmailSettings {
    api_base_url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    api_timeout_milliseconds: u64,
}

impl EmailSettings {
    /// The email REST API timeout duration
    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_milliseconds)
    }
    /// The base URL for the email REST service
    pub fn api_base_url(&self) -> Url {
        Url::parse(&self.api_base_url).expect("Failed to parse email base URL")
    }
}

#[derive(Debug, Deserialize)]
pub struct DispatchSettings {
    send_time: String,
    tracker_url: String,
}

impl DispatchSettings {
    /// Wall-clock time of day the dispatch task fires at
    pub fn send_time(&self) -> NaiveTime {
        NaiveTime::parse_from_str(&self.send_time, "%H:%M")
            .expect("Failed to parse dispatch send time")
    }
    /// Absolute URL of the mail open tracking endpoint
    pub fn tracker_url(&self) -> Url {
        Url::parse(&self.tracker_url).expect("Failed to parse tracker URL")
    }
}

#[derive(Debug, Deserialize)]
pub struct BotSettings {
    api_base_url: String,
    token: Secret<String>,
    public_url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    api_timeout_milliseconds: u64,
}

impl BotSettings {
    /// The base URL for the Bot API
    pub fn api_base_url(&self) -> Url {
        Url::parse(&self.api_base_url).expect("Failed to parse bot base URL")
    }
    /// The bot authentication token
    pub fn token(&self) -> Secret<String> {
        self.token.clone()
    }
    /// The public bot link embedded in certificate QR codes
    pub fn public_url(&self) -> Url {
        Url::parse(&self.public_url).expect("Failed to parse bot public URL")
    }
    /// The Bot API timeout duration
    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_milliseconds)
    }
}

#[derive(Debug, Deserialize)]
pub struct DriveSettings {
    api_base_url: String,
    api_auth_token: Secret<String>,
    folder_id: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    api_timeout_milliseconds: u64,
}

impl DriveSettings {
    /// The base URL for the drive upload API
    pub fn api_base_url(&self) -> Url {
        Url::parse(&self.api_base_url).expect("Failed to parse drive base URL")
    }
    /// The authentication token to enclose when making upload requests
    pub fn api_auth_token(&self) -> Secret<String> {
        self.api_auth_token.clone()
    }
    /// The drive folder uploads land in
    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }
    /// The drive API timeout duration
    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_milliseconds)
    }
}
