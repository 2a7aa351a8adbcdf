use std::time::Duration;

use siaka_bot::{
    AuthError, FetchError, Portal, PortalClient,
    extractors::{PaymentEntry, extract_payments},
    portal::fetch_authenticated,
    session::{Cookie, Credentials, SessionCookies},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, header, method, path, query_param},
};

fn client(server: &MockServer) -> PortalClient {
    PortalClient::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap()
}

fn credentials() -> Credentials {
    Credentials::parse("12345-secret").unwrap()
}

async fn mount_login_flow(server: &MockServer, home_body: &str) {
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("page", "login"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "PHPSESSID=abc123; Path=/"),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(query_param("page", "login"))
        .and(query_param("aksi", "masuk"))
        .and(header("cookie", "PHPSESSID=abc123"))
        .and(body_string_contains("name=\"email\""))
        .and(body_string_contains("12345"))
        .and(body_string_contains("name=\"juser\""))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/")
                .insert_header("set-cookie", "level=MHS; Path=/"),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(home_body.to_string()))
        .with_priority(10)
        .mount(server)
        .await;
}

#[tokio::test]
async fn login_collects_cookies_across_the_exchange() {
    let server = MockServer::start().await;
    mount_login_flow(&server, "<html><body>Selamat datang</body></html>").await;

    let cookies = client(&server).authenticate(&credentials()).await.unwrap();

    let names: Vec<_> = cookies.0.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["PHPSESSID", "level"]);
    assert_eq!(cookies.0[0].value, "abc123");
    assert_eq!(cookies.0[0].path.as_deref(), Some("/"));
}

#[tokio::test]
async fn login_form_after_submit_means_rejected() {
    let server = MockServer::start().await;
    mount_login_flow(&server, r#"<form><input type="password" name="pasw"></form>"#).await;

    let err = client(&server).authenticate(&credentials()).await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected), "{err:?}");
}

async fn mount_login_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("page", "login"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "PHPSESSID=abc; Path=/"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn home_redirecting_to_login_means_rejected() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/?page=login"))
        .with_priority(10)
        .mount(&server)
        .await;

    let wrong = Credentials::parse("12345-wrong").unwrap();
    let err = client(&server).authenticate(&wrong).await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected), "{err:?}");
}

#[tokio::test]
async fn submit_redirecting_to_login_means_rejected() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "?page=login"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Selamat datang</html>"))
        .with_priority(10)
        .mount(&server)
        .await;

    let wrong = Credentials::parse("12345-wrong").unwrap();
    let err = client(&server).authenticate(&wrong).await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected), "{err:?}");
}

#[tokio::test]
async fn portal_error_on_login_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server).authenticate(&credentials()).await.unwrap_err();
    assert!(matches!(err, AuthError::Status(status) if status.as_u16() == 503), "{err:?}");
}

#[tokio::test]
async fn no_cookie_means_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = client(&server).authenticate(&credentials()).await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected), "{err:?}");
}

#[tokio::test]
async fn fetch_sends_cookies_and_extracts_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("page", "vbpp"))
        .and(header("cookie", "PHPSESSID=abc123; level=MHS"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div><table class="table-common">
                <tr><td>1</td><td>2023/1</td><td>2023-09-01</td><td>1500000</td></tr>
            </table></div>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let portal = client(&server);
    let cookies = SessionCookies(vec![Cookie::new("PHPSESSID", "abc123"), Cookie::new("level", "MHS")]);
    let url = portal.page_url("vbpp");

    let records = fetch_authenticated(&portal, &url, &cookies, extract_payments)
        .await
        .unwrap();
    assert_eq!(
        records,
        vec![PaymentEntry {
            semester: "2023/1".into(),
            paid_on: "2023-09-01".into(),
            amount: "1500000".into(),
        }]
    );
}

#[tokio::test]
async fn redirect_to_login_is_an_error_not_an_empty_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/?page=login"))
        .mount(&server)
        .await;

    let portal = client(&server);
    let url = portal.page_url("kelas");
    let err = fetch_authenticated(&portal, &url, &SessionCookies::default(), extract_payments)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status(status) if status.as_u16() == 302), "{err:?}");
}

#[tokio::test]
async fn slow_portal_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let portal = PortalClient::new(format!("{}/", server.uri()), Duration::from_millis(200)).unwrap();
    let url = portal.page_url("vdosen");
    let err = portal
        .fetch_page(&url, &SessionCookies::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Timeout), "{err:?}");
}
