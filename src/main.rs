use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;

use sqlx::SqlitePool;

use tokio::sync::watch;

use certmill::app;
use certmill::client::{BotClient, DriveClient, EmailClient};
use certmill::dispatch::{DispatchTask, Scheduler};
use certmill::render::RenderContext;
use certmill::settings::Settings;
use certmill::storage::CertStorage;
use certmill::telemetry;
use certmill::upload::UploadQueue;
use certmill::verify;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().expect("Failed to load settings");

    let subscriber = telemetry::create_subscriber("info", std::io::stdout);
    telemetry::set_subscriber(subscriber)?;

    let pool = SqlitePool::connect_with(settings.database.connect_options()).await?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let storage = CertStorage::new(settings.storage.root())?;

    let email_client = EmailClient::new(
        settings.email.api_timeout(),
        settings.email.api_base_url(),
    )?;
    let bot_client = BotClient::new(
        settings.bot.api_timeout(),
        settings.bot.api_base_url(),
        settings.bot.token(),
    )?;
    let drive_client = DriveClient::new(
        settings.drive.api_timeout(),
        settings.drive.api_base_url(),
        settings.drive.api_auth_token(),
    )?;

    let render = RenderContext {
        verification_url: settings.bot.public_url(),
    };

    // One shutdown signal for every background task
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (uploads, upload_worker) = UploadQueue::spawn(
        drive_client,
        settings.drive.folder_id().to_string(),
        shutdown_rx.clone(),
    );

    let dispatch_task = Arc::new(DispatchTask::new(
        pool.clone(),
        storage.clone(),
        email_client,
        settings.dispatch.tracker_url(),
    ));
    let scheduler = Scheduler::spawn(
        dispatch_task.clone(),
        settings.dispatch.send_time(),
        shutdown_rx.clone(),
    );

    let bot = verify::spawn_bot(bot_client, pool.clone(), shutdown_rx);

    let listener = TcpListener::bind(settings.app.addr())?;
    app::run(listener, pool, storage, render, dispatch_task, uploads)?
        .await
        .context("Failed to run app")?;

    // The server is down; wind down the background tasks
    let _ = shutdown_tx.send(true);
    for handle in [scheduler, bot, upload_worker] {
        let _ = handle.await;
    }

    Ok(())
}
