use crate::helpers::{MailSettingsBody, TestApp};

#[tokio::test]
async fn put_stores_the_configuration() {
    let app = TestApp::spawn().await;

    let res = app
        .mail_settings_put(&MailSettingsBody {
            sender: Some("sender@test.com".into()),
            recipient: Some("certs@test.com".into()),
            password: Some("hunter2".into()),
        })
        .await
        .expect("Failed to execute request");

    assert_eq!(204, res.status().as_u16());

    let (sender, recipient, password): (String, String, String) =
        sqlx::query_as("select sender, recipient, password from mail_settings")
            .fetch_one(&app.pool)
            .await
            .expect("Failed to fetch stored settings");

    assert_eq!("sender@test.com", sender);
    assert_eq!("certs@test.com", recipient);
    assert_eq!("hunter2", password);
}

#[tokio::test]
async fn put_twice_replaces_the_single_record() {
    let app = TestApp::spawn().await;

    app.configure_mail("first@test.com", "certs@test.com", "old")
        .await;
    app.configure_mail("second@test.com", "certs@test.com", "new")
        .await;

    let count: i64 = sqlx::query_scalar("select count(*) from mail_settings")
        .fetch_one(&app.pool)
        .await
        .expect("Failed to count rows");
    assert_eq!(1, count);

    let sender: String = sqlx::query_scalar("select sender from mail_settings")
        .fetch_one(&app.pool)
        .await
        .expect("Failed to fetch stored sender");
    assert_eq!("second@test.com", sender);
}

#[tokio::test]
async fn put_rejects_invalid_addresses() {
    let app = TestApp::spawn().await;

    let res = app
        .mail_settings_put(&MailSettingsBody {
            sender: Some("not an email".into()),
            recipient: Some("certs@test.com".into()),
            password: Some("hunter2".into()),
        })
        .await
        .expect("Failed to execute request");

    assert_eq!(400, res.status().as_u16());
}

#[tokio::test]
async fn put_accepts_a_partial_configuration() {
    let app = TestApp::spawn().await;

    let res = app
        .mail_settings_put(&MailSettingsBody {
            sender: Some("sender@test.com".into()),
            recipient: None,
            password: None,
        })
        .await
        .expect("Failed to execute request");

    assert_eq!(204, res.status().as_u16());

    let (recipient, password): (Option<String>, Option<String>) =
        sqlx::query_as("select recipient, password from mail_settings")
            .fetch_one(&app.pool)
            .await
            .expect("Failed to fetch stored settings");

    assert!(recipient.is_none());
    assert!(password.is_none());
}
