use serde::{Deserialize, Serialize};

/// Form body posted to the login endpoint.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    /// The account e-mail or username.
    pub username: &'a str,

    /// The account password.
    pub password: &'a str,
}

/// Successful response from the login endpoint.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    /// Service URLs assigned to this session.
    pub urls: LoginUrls,

    /// Token sent as `Authorization: Basic <token>` on later calls.
    pub access_token: String,

    /// Identifier of the authenticated user.
    pub userid: String,

    /// The account e-mail, if reported.
    pub email: Option<String>,

    /// Token expiry as reported by the server.
    pub expires_in: Option<String>,
}

/// Service URLs returned at login.
#[derive(Debug, Deserialize)]
pub struct LoginUrls {
    /// Base URL for status and write calls.
    pub transport_url: String,
}
