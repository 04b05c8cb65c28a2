use std::time::Duration;

use nest_client::{Connection, NestError, DEFAULT_USER_AGENT};
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

use common::{mount_login, sample_snapshot, setup_test_connection, with_auth_headers, STATUS_PATH};

#[tokio::test]
async fn test_successful_login() -> Result<(), NestError> {
    // What it tests: the happy path of login → immediate status refresh. The login
    // form carries the credentials and the client identifier, and the refresh carries
    // every session header.
    //
    // Why it's valuable: Every later call depends on the session headers set here; a missing one
    // turns into a 401 far from the login that caused it.
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/login"))
        .and(header("user-agent", DEFAULT_USER_AGENT))
        .and(body_string("username=test-user&password=test-password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "urls": { "transport_url": format!("{}/", mock_server.uri()) },
            "access_token": "test-token",
            "userid": "u1"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    with_auth_headers(Mock::given(method("GET")).and(path(STATUS_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_snapshot()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let connection = Connection::builder().auth_url(mock_server.uri()).build()?;
    assert!(!connection.is_authenticated());

    connection.login("test-user", "test-password").await?;

    assert!(connection.is_authenticated());
    assert_eq!(connection.user_id().as_deref(), Some("u1"));
    assert_eq!(connection.transport_url(), Some(mock_server.uri()));
    assert_eq!(connection.snapshot().generation(), 1);
    assert_eq!(connection.devices().len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_failed_login_invalid_credentials() {
    // What it tests: a rejected login surfaces as AuthenticationError with the status,
    // and no status refresh is attempted.
    //
    // Why it's valuable: Bad credentials are the most common failure and must be distinguishable
    // from network trouble without a wasted status request.
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/login"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = Connection::builder()
        .auth_url(mock_server.uri())
        .username("test-user")
        .password("wrong-password")
        .connect()
        .await;

    match result {
        Err(NestError::AuthenticationError(msg)) => {
            assert_eq!(msg, "Authentication failed with status code: 400 Bad Request");
        }
        other => panic!("Expected AuthenticationError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_login_malformed_response() {
    // What it tests: a 200 login without the session fields is not a successful login.
    //
    // Why it's valuable: Proxies and captive portals answer 200 with unrelated bodies; treating
    // those as a session would fail later with a confusing NotAuthenticated.
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "userid": "u1"
        })))
        .mount(&mock_server)
        .await;

    let connection = Connection::builder()
        .auth_url(mock_server.uri())
        .build()
        .unwrap();
    let result = connection.login("test-user", "test-password").await;

    match result {
        Err(NestError::AuthenticationError(msg)) => {
            assert!(msg.starts_with("Malformed login response"), "{msg}");
        }
        other => panic!("Expected AuthenticationError, got {other:?}"),
    }
    assert!(!connection.is_authenticated());
}

#[tokio::test]
async fn test_login_invalid_transport_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "urls": { "transport_url": "not a url" },
            "access_token": "test-token",
            "userid": "u1"
        })))
        .mount(&mock_server)
        .await;

    let connection = Connection::builder()
        .auth_url(mock_server.uri())
        .build()
        .unwrap();

    assert!(matches!(
        connection.login("test-user", "test-password").await,
        Err(NestError::AuthenticationError(_))
    ));
}

#[tokio::test]
async fn test_refresh_before_login() {
    let connection = Connection::builder().build().unwrap();

    assert!(matches!(
        connection.refresh_status().await,
        Err(NestError::NotAuthenticated)
    ));
    assert!(connection.devices().is_empty());
}

#[tokio::test]
async fn test_refresh_rejected_session() {
    // What it tests: a 401 on refresh means the session is gone, anything else
    // non-2xx is an API error. Neither replaces the snapshot.
    //
    // Why it's valuable: Callers re-login on NotAuthenticated and retry on ApiError, and a failed
    // refresh must never leave them with an empty account.
    let mock_server = MockServer::start().await;
    mount_login(&mock_server).await;

    let first = Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_snapshot()))
        .mount_as_scoped(&mock_server)
        .await;

    let connection = Connection::builder()
        .auth_url(mock_server.uri())
        .username("test-user")
        .password("test-password")
        .connect()
        .await
        .unwrap();
    drop(first);

    let unauthorized = Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount_as_scoped(&mock_server)
        .await;
    assert!(matches!(
        connection.refresh_status().await,
        Err(NestError::NotAuthenticated)
    ));
    drop(unauthorized);

    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;
    match connection.refresh_status().await {
        Err(NestError::ApiError(msg)) => assert!(msg.contains("503"), "{msg}"),
        other => panic!("Expected ApiError, got {other:?}"),
    }

    assert_eq!(connection.snapshot().generation(), 1);
    assert_eq!(connection.devices().len(), 3);
}

#[tokio::test]
async fn test_refresh_timeout_is_transport_error() {
    let mock_server = MockServer::start().await;
    mount_login(&mock_server).await;

    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(sample_snapshot())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let result = Connection::builder()
        .auth_url(mock_server.uri())
        .username("test-user")
        .password("test-password")
        .timeout(Duration::from_millis(200))
        .connect()
        .await;

    match result {
        Err(NestError::TransportError(e)) => assert!(e.is_timeout()),
        other => panic!("Expected TransportError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_refresh_rejects_invalid_snapshot() {
    // What it tests: a login whose first refresh cannot be installed is not a login.
    //
    // Why it's valuable: callers branch on is_authenticated(); reporting true with an
    // empty snapshot would send them down the "logged in" path with nothing to show.
    let mock_server = MockServer::start().await;
    mount_login(&mock_server).await;

    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "device": ["d1"] })))
        .mount(&mock_server)
        .await;

    let connection = Connection::builder()
        .auth_url(mock_server.uri())
        .build()
        .unwrap();

    assert!(matches!(
        connection.login("test-user", "test-password").await,
        Err(NestError::SerializationError(_))
    ));
    assert!(!connection.is_authenticated());
    assert_eq!(connection.user_id(), None);
    assert_eq!(connection.snapshot().generation(), 0);
}

#[tokio::test]
async fn test_login_below_auth_url_prefix() {
    // What it tests: the login endpoint is resolved below the configured base URL, so a
    // path prefix such as `/nest` (with or without a trailing slash) is preserved.
    //
    // Why it's valuable: deployments behind a reverse proxy mount the service under a
    // prefix, and an absolute join would silently post credentials to the proxy root.
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/nest/user/login"))
        .and(body_string("username=test-user&password=test-password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "urls": { "transport_url": mock_server.uri() },
            "access_token": "test-token",
            "userid": "u1"
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    with_auth_headers(Mock::given(method("GET")).and(path(STATUS_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_snapshot()))
        .expect(2)
        .mount(&mock_server)
        .await;

    for base in [format!("{}/nest", mock_server.uri()), format!("{}/nest/", mock_server.uri())] {
        let connection = Connection::builder()
            .auth_url(base)
            .username("test-user")
            .password("test-password")
            .connect()
            .await
            .unwrap();
        assert!(connection.is_authenticated());
    }
}

#[tokio::test]
async fn test_debug_output_hides_token() {
    let mock_server = MockServer::start().await;
    let connection = setup_test_connection(&mock_server, sample_snapshot()).await;

    let debug = format!("{connection:?}");
    assert!(debug.contains("u1"));
    assert!(!debug.contains("test-token"));
}
