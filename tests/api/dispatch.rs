use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use chrono::{Duration, Utc};

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{MailSettingsBody, NewCertificateBody, TestApp};

fn certificate_body(name: &str, course: &str) -> NewCertificateBody {
    NewCertificateBody {
        name: Some(name.into()),
        course: Some(course.into()),
        template: None,
    }
}

#[tokio::test]
async fn dispatch_with_no_new_certificates_is_a_no_op() {
    let app = TestApp::spawn().await;

    app.configure_mail("sender@test.com", "certs@test.com", "hunter2")
        .await;

    let res = app.dispatch_run().await.expect("Failed to execute request");
    assert!(res.status().is_success());

    let outcome: serde_json::Value = res.json().await.expect("Failed to parse response body");
    assert_eq!(outcome["outcome"], "no_new_certificates");

    assert_eq!(0, app.email_server.received_requests().await.unwrap().len());
}

#[tokio::test]
async fn dispatch_without_mail_settings_is_skipped() {
    let app = TestApp::spawn().await;

    let res = app
        .certificate_create(&certificate_body("Jane Doe", "Rust Course"))
        .await
        .expect("Failed to execute request");
    assert!(res.status().is_success());

    let res = app.dispatch_run().await.expect("Failed to execute request");
    assert!(res.status().is_success());

    let outcome: serde_json::Value = res.json().await.expect("Failed to parse response body");
    assert_eq!(outcome["outcome"], "mail_not_configured");

    // A partial configuration is not enough to send with either
    let res = app
        .mail_settings_put(&MailSettingsBody {
            sender: Some("sender@test.com".into()),
            recipient: None,
            password: None,
        })
        .await
        .expect("Failed to execute request");
    assert_eq!(204, res.status().as_u16());

    let res = app.dispatch_run().await.expect("Failed to execute request");
    let outcome: serde_json::Value = res.json().await.expect("Failed to parse response body");
    assert_eq!(outcome["outcome"], "mail_not_configured");

    assert_eq!(0, app.email_server.received_requests().await.unwrap().len());
}

#[tokio::test]
async fn dispatch_sends_the_archive_to_the_configured_recipient() {
    let app = TestApp::spawn().await;

    Mock::given(path("/email"))
        .and(method("POST"))
        .and(header("X-Postmark-Server-Token", "hunter2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    for body in [
        certificate_body("Jane Doe", "Rust Course"),
        certificate_body("John Roe", "Go Course"),
    ] {
        let res = app
            .certificate_create(&body)
            .await
            .expect("Failed to execute request");
        assert!(res.status().is_success());
    }

    app.configure_mail("sender@test.com", "certs@test.com", "hunter2")
        .await;

    let res = app.dispatch_run().await.expect("Failed to execute request");
    assert!(res.status().is_success());

    let outcome: serde_json::Value = res.json().await.expect("Failed to parse response body");
    assert_eq!(outcome["outcome"], "sent");
    assert_eq!(outcome["certificates"], 2);

    let email_request = &app.email_server.received_requests().await.unwrap()[0];
    let body: serde_json::Value = serde_json::from_slice(&email_request.body).unwrap();

    assert_eq!(body["From"], "sender@test.com");
    assert_eq!(body["To"], "certs@test.com");
    assert_eq!(body["Subject"], "Certificates");

    let html_body = body["HtmlBody"].as_str().expect("Missing HTML body");
    let tracker_link = extract_link(html_body);
    assert!(tracker_link.ends_with("/email-tracker"));

    let attachments = body["Attachments"].as_array().expect("Missing attachments");
    assert_eq!(1, attachments.len());
    assert_eq!(attachments[0]["Name"], "certs.zip");
    assert_eq!(attachments[0]["ContentType"], "application/zip");

    // The attachment decodes back into a zip of the stored files
    let zip_bytes = STANDARD
        .decode(attachments[0]["Content"].as_str().expect("Missing content"))
        .expect("Attachment is not valid base64");
    let archive =
        zip::ZipArchive::new(Cursor::new(zip_bytes)).expect("Attachment is not a zip archive");
    let mut entries: Vec<String> = archive.file_names().map(String::from).collect();
    entries.sort();

    let mut stored: Vec<String> =
        sqlx::query_scalar("select file_path from certificates")
            .fetch_all(&app.pool)
            .await
            .expect("Failed to fetch stored paths");
    stored.sort();

    assert_eq!(stored, entries);
}

#[tokio::test]
async fn dispatch_reports_failure_when_the_mail_api_errors() {
    let app = TestApp::spawn().await;

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let res = app
        .certificate_create(&certificate_body("Jane Doe", "Rust Course"))
        .await
        .expect("Failed to execute request");
    assert!(res.status().is_success());

    app.configure_mail("sender@test.com", "certs@test.com", "hunter2")
        .await;

    let res = app.dispatch_run().await.expect("Failed to execute request");
    assert!(res.status().is_success());

    let outcome: serde_json::Value = res.json().await.expect("Failed to parse response body");
    assert_eq!(outcome["outcome"], "failed");
}

#[tokio::test]
async fn dispatch_skips_certificates_outside_the_window() {
    let app = TestApp::spawn().await;

    let res = app
        .certificate_create(&certificate_body("Jane Doe", "Rust Course"))
        .await
        .expect("Failed to execute request");
    assert!(res.status().is_success());

    // Age the row out of the dispatch window
    sqlx::query("update certificates set created_at = ?")
        .bind(Utc::now() - Duration::days(3))
        .execute(&app.pool)
        .await
        .expect("Failed to backdate row");

    app.configure_mail("sender@test.com", "certs@test.com", "hunter2")
        .await;

    let res = app.dispatch_run().await.expect("Failed to execute request");
    let outcome: serde_json::Value = res.json().await.expect("Failed to parse response body");
    assert_eq!(outcome["outcome"], "no_new_certificates");

    assert_eq!(0, app.email_server.received_requests().await.unwrap().len());
}

fn extract_link(body: &str) -> String {
    let links: Vec<_> = linkify::LinkFinder::new()
        .links(body)
        .filter(|l| *l.kind() == linkify::LinkKind::Url)
        .collect();
    assert_eq!(1, links.len());
    links[0].as_str().to_string()
}
