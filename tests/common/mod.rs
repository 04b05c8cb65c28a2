use nest_client::{Connection, DEFAULT_USER_AGENT};
use serde_json::{json, Value};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

pub const USER_ID: &str = "u1";
pub const ACCESS_TOKEN: &str = "test-token";
pub const STATUS_PATH: &str = "/v2/mobile/user.u1";

/// An account with two structures: s1 holds d1 and d2, s2 holds d3.
#[allow(dead_code)]
pub fn sample_snapshot() -> Value {
    json!({
        "user": {
            "u1": {
                "name": "Test User",
                "email": "test@example.com",
                "structures": ["structure.s1", "structure.s2"]
            }
        },
        "user_settings": {
            "u1": { "email": "test@example.com", "temperature_scale": "C" }
        },
        "device": {
            "d1": { "name": "Hallway", "serial_number": "01AA", "current_humidity": 41, "$version": 7 },
            "d2": { "name": "Bedroom", "serial_number": "02BB" },
            "d3": { "name": "Cabin", "serial_number": "03CC" }
        },
        "shared": {
            "d1": {
                "name": "Shadowed",
                "target_temperature": 20.0,
                "target_temperature_low": 18.0,
                "target_temperature_high": 24.0,
                "target_temperature_type": "heat",
                "current_temperature": "19.5"
            },
            "d2": { "target_temperature": 21.0 },
            "d3": {}
        },
        "link": {
            "d1": { "structure": "structure.s1" },
            "d2": { "structure": "structure.s1" },
            "d3": { "structure": "structure.s2" }
        },
        "structure": {
            "s1": { "name": "Home", "away": false },
            "s2": { "name": "Cabin", "away": true }
        },
        "metadata": { "d1": { "last_connection": 1700000000 } }
    })
}

/// Adds the headers every authenticated call must carry.
#[allow(dead_code)]
pub fn with_auth_headers(mock: MockBuilder) -> MockBuilder {
    mock.and(header("authorization", format!("Basic {ACCESS_TOKEN}").as_str()))
        .and(header("x-nl-user-id", USER_ID))
        .and(header("x-nl-protocol-version", "1"))
        .and(header("user-agent", DEFAULT_USER_AGENT))
}

/// Mounts a login endpoint that accepts `test-user` / `test-password` and
/// points the transport at the mock server itself.
pub async fn mount_login(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/user/login"))
        .and(body_string("username=test-user&password=test-password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "urls": { "transport_url": mock_server.uri() },
            "access_token": ACCESS_TOKEN,
            "userid": USER_ID,
            "email": "test@example.com",
            "expires_in": "Mon, 01-Jan-2035 00:00:00 GMT"
        })))
        .mount(mock_server)
        .await;
}

/// Mounts the status endpoint answering with `snapshot`.
#[allow(dead_code)]
pub async fn mount_status(mock_server: &MockServer, snapshot: Value) {
    with_auth_headers(Mock::given(method("GET")).and(path(STATUS_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot))
        .mount(mock_server)
        .await;
}

/// Logs in against the mock server, which serves `snapshot` as status.
#[allow(dead_code)]
pub async fn setup_test_connection(mock_server: &MockServer, snapshot: Value) -> Connection {
    mount_login(mock_server).await;
    mount_status(mock_server, snapshot).await;

    Connection::builder()
        .auth_url(mock_server.uri())
        .username("test-user")
        .password("test-password")
        .connect()
        .await
        .expect("Failed to connect")
}
