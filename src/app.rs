use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{get, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use sqlx::SqlitePool;

use tracing_actix_web::TracingLogger;

use crate::controller::{certificates, dispatch, gift_certificates, mail_settings, tracker};
use crate::dispatch::DispatchTask;
use crate::render::RenderContext;
use crate::storage::CertStorage;
use crate::upload::UploadQueue;

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("I am alive")
}

/// Run the application on a specified TCP listener
pub fn run(
    listener: TcpListener,
    pool: SqlitePool,
    storage: CertStorage,
    render: RenderContext,
    dispatch_task: Arc<DispatchTask>,
    uploads: UploadQueue,
) -> anyhow::Result<Server> {
    // Wrap application data
    let pool = web::Data::new(pool);
    let storage = web::Data::new(storage);
    let render = web::Data::new(render);
    let dispatch_task = web::Data::from(dispatch_task);
    let uploads = web::Data::new(uploads);

    // Start the server
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(pool.clone())
            .app_data(storage.clone())
            .app_data(render.clone())
            .app_data(dispatch_task.clone())
            .app_data(uploads.clone())
            .service(health_check)
            .service(tracker::service())
            .service(certificates::scope())
            .service(gift_certificates::scope())
            .service(dispatch::scope())
            .service(mail_settings::scope())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
