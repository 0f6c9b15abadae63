use certmill::controller::tracker::TRACKING_PIXEL;

use crate::helpers::TestApp;

#[tokio::test]
async fn tracker_serves_the_exact_pixel_bytes() {
    let app = TestApp::spawn().await;

    let res = app.tracker("").await.expect("Failed to execute request");

    assert!(res.status().is_success());
    assert_eq!(res.headers()["content-type"], "image/gif");

    let body = res.bytes().await.expect("Failed to read response body");
    assert_eq!(43, body.len());
    assert_eq!(TRACKING_PIXEL, body.as_ref());
}

#[tokio::test]
async fn tracker_response_is_identical_for_any_query() {
    let app = TestApp::spawn().await;

    let plain = app
        .tracker("")
        .await
        .expect("Failed to execute request")
        .bytes()
        .await
        .expect("Failed to read response body");

    let with_query = app
        .tracker("?mail_id=abc123&opened=1")
        .await
        .expect("Failed to execute request")
        .bytes()
        .await
        .expect("Failed to read response body");

    assert_eq!(plain, with_query);
}
