use regex::Regex;

use reqwest::StatusCode;

use crate::helpers::{NewGiftCertificateBody, TestApp};

fn valid_body() -> NewGiftCertificateBody {
    NewGiftCertificateBody {
        course: Some("Watercolor Basics".into()),
        expiry_date: Some("2030-12-31".into()),
    }
}

#[tokio::test]
async fn issue_returns_a_pdf_and_stores_the_record() {
    let app = TestApp::spawn().await;

    let res = app
        .gift_certificate_create(&valid_body())
        .await
        .expect("Failed to execute request");

    assert!(res.status().is_success());
    assert_eq!(res.headers()["content-type"], "application/pdf");

    let body = res.bytes().await.expect("Failed to read response body");
    assert!(body.starts_with(b"%PDF"));

    let (number, course, expires_on, file_path): (String, String, String, Option<String>) =
        sqlx::query_as("select number, course, expires_on, file_path from gift_certificates")
            .fetch_one(&app.pool)
            .await
            .expect("Failed to fetch inserted row");

    let number_format = Regex::new(r"^\d{11}$").unwrap();
    assert!(number_format.is_match(&number), "Bad number {}", number);
    assert_eq!("Watercolor Basics", course);
    assert_eq!("2030-12-31", expires_on);

    let file_path = file_path.expect("Stored row has no file path");
    assert!(file_path.contains(&number));
    assert!(app.storage.absolute(&file_path).is_file());
}

#[tokio::test]
async fn issue_returns_bad_request_for_invalid_data() {
    let app = TestApp::spawn().await;

    let test_cases: Vec<(String, NewGiftCertificateBody)> = vec![
        (
            "missing course".into(),
            NewGiftCertificateBody {
                course: None,
                expiry_date: Some("2030-12-31".into()),
            },
        ),
        (
            "missing expiry date".into(),
            NewGiftCertificateBody {
                course: Some("Test Course".into()),
                expiry_date: None,
            },
        ),
        (
            "malformed expiry date".into(),
            NewGiftCertificateBody {
                course: Some("Test Course".into()),
                expiry_date: Some("soon".into()),
            },
        ),
        (
            "empty course".into(),
            NewGiftCertificateBody {
                course: Some("".into()),
                expiry_date: Some("2030-12-31".into()),
            },
        ),
    ];

    for (desc, new_gift) in test_cases {
        let res = app
            .gift_certificate_create(&new_gift)
            .await
            .expect("Failed to execute request");

        assert!(
            res.status().is_client_error(),
            "API did not fail when payload was {}",
            desc
        );
    }
}

#[tokio::test]
async fn download_returns_the_stored_document() {
    let app = TestApp::spawn().await;

    let res = app
        .gift_certificate_create(&valid_body())
        .await
        .expect("Failed to execute request");
    assert!(res.status().is_success());

    let (id,): (i64,) = sqlx::query_as("select id from gift_certificates")
        .fetch_one(&app.pool)
        .await
        .expect("Failed to fetch inserted row");

    let res = app
        .gift_certificate_download(id)
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    assert_eq!(res.headers()["content-type"], "application/pdf");
}

#[tokio::test]
async fn download_unknown_gift_certificate_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app
        .gift_certificate_download(4242)
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::NOT_FOUND, res.status());
}

#[tokio::test]
async fn clear_history_removes_issued_gift_certificates() {
    let app = TestApp::spawn().await;

    let res = app
        .gift_certificate_create(&valid_body())
        .await
        .expect("Failed to execute request");
    assert!(res.status().is_success());

    let res = app
        .gift_certificates_clear_history()
        .await
        .expect("Failed to execute request");
    assert!(res.status().is_success());

    let count: i64 = sqlx::query_scalar("select count(*) from gift_certificates")
        .fetch_one(&app.pool)
        .await
        .expect("Failed to count rows");
    assert_eq!(0, count);
}
