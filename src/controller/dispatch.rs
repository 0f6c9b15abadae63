use actix_web::dev::HttpServiceFactory;
use actix_web::{post, web, HttpResponse, Responder};

use crate::dispatch::DispatchTask;

/// Manual trigger for the certificate dispatch task
///
/// Runs the same pass the scheduler runs; the outcome is reported in
/// the response body instead of only in the logs.
#[tracing::instrument(name = "Trigger dispatch manually", skip(task))]
#[post("/run")]
async fn run(task: web::Data<DispatchTask>) -> impl Responder {
    let outcome = task.run().await;

    HttpResponse::Ok().json(outcome)
}

/// Dispatch endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/dispatch").service(run)
}
