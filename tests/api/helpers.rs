use std::net::TcpListener;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, Response};

use secrecy::Secret;

use serde::Serialize;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use tempfile::TempDir;

use tokio::sync::watch;

use url::Url;

use wiremock::MockServer;

use certmill::app;
use certmill::client::{DriveClient, EmailClient};
use certmill::dispatch::DispatchTask;
use certmill::render::RenderContext;
use certmill::storage::CertStorage;
use certmill::upload::UploadQueue;

#[derive(Debug, Serialize)]
pub struct NewCertificateBody {
    pub name: Option<String>,
    pub course: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NewGiftCertificateBody {
    pub course: Option<String>,
    pub expiry_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MailSettingsBody {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub password: Option<String>,
}

pub struct TestApp {
    addr: String,

    pub client: Client,
    pub pool: SqlitePool,
    pub storage: CertStorage,
    pub email_server: MockServer,
    pub drive_server: MockServer,

    _storage_dir: TempDir,
    _shutdown: watch::Sender<bool>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let pool = test_pool().await;

        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to listen on random port");
        let port = listener.local_addr().unwrap().port();

        let addr = format!("http://127.0.0.1:{}", port);

        let storage_dir = tempfile::tempdir().expect("Failed to create storage directory");
        let storage = CertStorage::new(storage_dir.path().to_path_buf())
            .expect("Failed to create certificate storage");

        let email_server = MockServer::start().await;
        let email_client = {
            let api_base_url =
                Url::parse(&email_server.uri()).expect("Failed to parse mock server uri");
            let api_timeout = Duration::from_secs(2);

            EmailClient::new(api_timeout, api_base_url).expect("Failed to create email client")
        };

        let drive_server = MockServer::start().await;
        let drive_client = {
            let api_base_url =
                Url::parse(&drive_server.uri()).expect("Failed to parse mock server uri");
            let api_auth_token = Secret::new("TestAuthorization".into());
            let api_timeout = Duration::from_secs(2);

            DriveClient::new(api_timeout, api_base_url, api_auth_token)
                .expect("Failed to create drive client")
        };

        let (shutdown, shutdown_rx) = watch::channel(false);
        let (uploads, _worker) =
            UploadQueue::spawn(drive_client, "test-folder".into(), shutdown_rx);

        let tracker_url =
            Url::parse(&format!("{}/email-tracker", addr)).expect("Failed to parse tracker url");
        let dispatch_task = Arc::new(DispatchTask::new(
            pool.clone(),
            storage.clone(),
            email_client,
            tracker_url,
        ));

        let render = RenderContext {
            verification_url: Url::parse("https://t.me/test_cert_bot")
                .expect("Failed to parse verification url"),
        };

        let server = app::run(
            listener,
            pool.clone(),
            storage.clone(),
            render,
            dispatch_task,
            uploads,
        )
        .expect("Failed to spawn app instance");
        let _ = tokio::spawn(server);

        let client = Client::new();

        Self {
            addr,
            client,
            pool,
            storage,
            email_server,
            drive_server,
            _storage_dir: storage_dir,
            _shutdown: shutdown,
        }
    }

    pub fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", &self.addr, url);
        self.client.request(method, url)
    }

    pub async fn health_check(&self) -> reqwest::Result<Response> {
        self.request(Method::GET, "health_check").send().await
    }

    pub async fn certificate_create(
        &self,
        new_certificate: &NewCertificateBody,
    ) -> reqwest::Result<Response> {
        self.request(Method::POST, "certificates")
            .json(new_certificate)
            .send()
            .await
    }

    pub async fn certificate_download(&self, id: i64) -> reqwest::Result<Response> {
        self.request(Method::GET, &format!("certificates/{}/download", id))
            .send()
            .await
    }

    pub async fn certificates_clear_history(&self) -> reqwest::Result<Response> {
        self.request(Method::POST, "certificates/clear_history")
            .send()
            .await
    }

    pub async fn gift_certificate_create(
        &self,
        new_gift: &NewGiftCertificateBody,
    ) -> reqwest::Result<Response> {
        self.request(Method::POST, "gift_certificates")
            .json(new_gift)
            .send()
            .await
    }

    pub async fn gift_certificate_download(&self, id: i64) -> reqwest::Result<Response> {
        self.request(Method::GET, &format!("gift_certificates/{}/download", id))
            .send()
            .await
    }

    pub async fn gift_certificates_clear_history(&self) -> reqwest::Result<Response> {
        self.request(Method::POST, "gift_certificates/clear_history")
            .send()
            .await
    }

    pub async fn tracker(&self, query: &str) -> reqwest::Result<Response> {
        self.request(Method::GET, &format!("email-tracker{}", query))
            .send()
            .await
    }

    pub async fn dispatch_run(&self) -> reqwest::Result<Response> {
        self.request(Method::POST, "dispatch/run").send().await
    }

    pub async fn mail_settings_put(
        &self,
        settings: &MailSettingsBody,
    ) -> reqwest::Result<Response> {
        self.request(Method::PUT, "mail_settings")
            .json(settings)
            .send()
            .await
    }

    /// Store a complete mail configuration through the API
    pub async fn configure_mail(&self, sender: &str, recipient: &str, password: &str) {
        let res = self
            .mail_settings_put(&MailSettingsBody {
                sender: Some(sender.into()),
                recipient: Some(recipient.into()),
                password: Some(password.into()),
            })
            .await
            .expect("Failed to execute request");

        assert_eq!(204, res.status().as_u16());
    }

    /// Block until the mock server has seen `count` requests
    pub async fn wait_for_requests(server: &MockServer, count: usize) {
        for _ in 0..100 {
            if server.received_requests().await.unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("Timed out waiting for {} requests", count);
    }
}

async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("Failed to parse database options")
        .foreign_keys(true);

    // A single connection keeps every query on the one in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}
