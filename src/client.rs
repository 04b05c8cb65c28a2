use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use arc_swap::ArcSwap;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client as ReqwestClient, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use url::Url;

use crate::models::auth::{LoginRequest, LoginResponse};
use crate::models::snapshot::{Category, Snapshot};
use crate::registry::{EntityKind, EntityRegistry};
use crate::{Device, NestError, NestResult, Structure, User, UserSettings};

/// Default host of the login endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://home.nest.com";

/// Client identifier sent on every request.
pub const DEFAULT_USER_AGENT: &str = "Nest/1.1.0.10 CFNetwork/548.0.4";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-nl-user-id");
const PROTOCOL_VERSION_HEADER: HeaderName = HeaderName::from_static("x-nl-protocol-version");
const PROTOCOL_VERSION: &str = "1";

/// Builder for a Nest connection.
///
/// This builder provides a fluent API for configuring connections with
/// validation at build time.
#[derive(Default)]
pub struct ConnectionBuilder {
    auth_url: Option<String>,
    username: Option<String>,
    password: Option<SecretString>,
    env_error: Option<String>,
    accept_invalid_certs: bool,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    http_client: Option<ReqwestClient>,
}

impl ConnectionBuilder {
    /// Sets the base URL of the login service.
    pub fn auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = Some(url.into());
        self
    }

    /// Sets the username used by [`connect`](Self::connect).
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password used by [`connect`](Self::connect).
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Reads the password from an environment variable.
    ///
    /// A missing variable is reported as a `ConfigurationError` when the
    /// builder is finished.
    pub fn password_from_env(mut self, var_name: &str) -> Self {
        match std::env::var(var_name) {
            Ok(password) => self.password = Some(SecretString::from(password)),
            Err(e) => {
                self.env_error =
                    Some(format!("Failed to read environment variable '{var_name}': {e}"));
            }
        }
        self
    }

    /// Sets whether invalid TLS certificates are accepted.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Sets the HTTP request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets a custom client identifier in place of the default user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets a custom reqwest client (e.g., for testing or custom middleware).
    pub fn http_client(mut self, http_client: ReqwestClient) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Validates the configuration and returns a connection that has not
    /// logged in yet.
    pub fn build(self) -> NestResult<Connection> {
        if let Some(msg) = self.env_error {
            return Err(NestError::ConfigurationError(msg));
        }

        let mut auth_url = Url::parse(self.auth_url.as_deref().unwrap_or(DEFAULT_AUTH_URL))
            .map_err(|e| NestError::ConfigurationError(format!("Invalid auth URL: {e}")))?;
        // Relative joins keep any path prefix only when the base ends in '/'.
        if !auth_url.path().ends_with('/') {
            let path = format!("{}/", auth_url.path());
            auth_url.set_path(&path);
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);

        let user_agent = self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let user_agent = HeaderValue::from_str(&user_agent)
            .map_err(|e| NestError::ConfigurationError(format!("Invalid user agent: {e}")))?;

        let http_client = if let Some(custom_client) = self.http_client {
            custom_client
        } else {
            ReqwestClient::builder()
                .timeout(timeout)
                .danger_accept_invalid_certs(self.accept_invalid_certs)
                .build()
                .map_err(|e| {
                    NestError::ConfigurationError(format!("Failed to create HTTP client: {e}"))
                })?
        };

        Ok(Connection {
            inner: Arc::new(ConnectionInner {
                auth_url,
                user_agent,
                http_client,
                session: RwLock::new(None),
                snapshot: ArcSwap::from_pointee(Snapshot::default()),
                sync_lock: tokio::sync::Mutex::new(()),
                registry: Mutex::new(EntityRegistry::default()),
            }),
        })
    }

    /// Builds the connection and logs in with the configured credentials.
    pub async fn connect(mut self) -> NestResult<Connection> {
        let username = self
            .username
            .take()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| NestError::ConfigurationError("Username is required".into()))?;

        let password = self
            .password
            .take()
            .filter(|p| !p.expose_secret().trim().is_empty())
            .ok_or_else(|| NestError::ConfigurationError("Password is required".into()))?;

        let connection = self.build()?;
        connection.login(&username, password.expose_secret()).await?;
        Ok(connection)
    }
}

/// Credentials and endpoints established by a successful login.
struct Session {
    transport_url: String,
    access_token: SecretString,
    user_id: String,
}

pub(crate) struct ConnectionInner {
    auth_url: Url,
    user_agent: HeaderValue,
    http_client: ReqwestClient,
    session: RwLock<Option<Session>>,
    snapshot: ArcSwap<Snapshot>,
    // Serializes login and refresh so snapshots are installed in order.
    sync_lock: tokio::sync::Mutex<()>,
    registry: Mutex<EntityRegistry>,
}

/// A session with the Nest service and the root of every entity view.
///
/// The connection owns the latest account snapshot and hands out memoized
/// views over it: asking twice for the same device, structure or user
/// returns the same `Arc`. Clones share the session, snapshot and views.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.inner.session.read();

        f.debug_struct("Connection")
            .field("auth_url", &self.inner.auth_url)
            .field("user_agent", &self.inner.user_agent)
            .field("transport_url", &session.as_ref().map(|s| s.transport_url.as_str()))
            .field("user_id", &session.as_ref().map(|s| s.user_id.as_str()))
            .field("generation", &self.inner.snapshot.load().generation())
            .finish()
    }
}

impl Connection {
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::default()
    }

    pub(crate) fn from_inner(inner: Arc<ConnectionInner>) -> Self {
        Self { inner }
    }

    fn downgrade(&self) -> Weak<ConnectionInner> {
        Arc::downgrade(&self.inner)
    }

    /// Logs in and fetches the first snapshot.
    ///
    /// The login endpoint is `user/login` below the configured auth URL, so
    /// a base such as `https://proxy.example/nest` posts to
    /// `https://proxy.example/nest/user/login`.
    ///
    /// The connection only counts as authenticated once the first snapshot
    /// has been installed. If that refresh fails the session is discarded.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationError` if the service rejects the credentials
    /// or answers with something other than a session description, and any
    /// error of [`refresh_status`](Self::refresh_status).
    pub async fn login(&self, username: &str, password: &str) -> NestResult<()> {
        let _sync = self.inner.sync_lock.lock().await;

        let login_url = self.inner.auth_url.join("user/login")?;
        debug!("logging in {username} at {login_url}");

        let response = self
            .inner
            .http_client
            .post(login_url)
            .header(USER_AGENT, self.inner.user_agent.clone())
            .form(&LoginRequest { username, password })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NestError::AuthenticationError(format!(
                "Authentication failed with status code: {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        let login: LoginResponse = serde_json::from_str(&body).map_err(|e| {
            NestError::AuthenticationError(format!("Malformed login response: {e}"))
        })?;

        let transport_url = login.urls.transport_url.trim_end_matches('/').to_string();
        Url::parse(&transport_url).map_err(|e| {
            NestError::AuthenticationError(format!("Invalid transport URL: {e}"))
        })?;
        HeaderValue::from_str(&login.userid).map_err(|e| {
            NestError::AuthenticationError(format!("Invalid user id: {e}"))
        })?;
        HeaderValue::from_str(&format!("Basic {}", login.access_token)).map_err(|e| {
            NestError::AuthenticationError(format!("Invalid access token: {e}"))
        })?;

        info!("logged in as user {} via {transport_url}", login.userid);
        *self.inner.session.write() = Some(Session {
            transport_url,
            access_token: SecretString::from(login.access_token),
            user_id: login.userid,
        });

        if let Err(e) = self.fetch_snapshot().await {
            warn!("initial status refresh failed, discarding session: {e}");
            *self.inner.session.write() = None;
            return Err(e);
        }

        Ok(())
    }

    /// Replaces the snapshot with the current server state.
    ///
    /// Views keep their identity across refreshes; every read after this
    /// call sees the new snapshot only.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` before login or when the session has been
    /// rejected, `TransportError` on network failure or timeout, and
    /// `ApiError` for any other non-success status.
    pub async fn refresh_status(&self) -> NestResult<()> {
        let _sync = self.inner.sync_lock.lock().await;
        self.fetch_snapshot().await
    }

    async fn fetch_snapshot(&self) -> NestResult<()> {
        let user_id = self.user_id().ok_or(NestError::NotAuthenticated)?;
        let (url, headers) = self.inner.endpoint(&format!("/v2/mobile/user.{user_id}"))?;
        debug!("GET {url}");

        let response = self.inner.http_client.get(url).headers(headers).send().await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(NestError::NotAuthenticated),
            status if !status.is_success() => {
                return Err(NestError::ApiError(format!(
                    "Status refresh failed with status code: {status}"
                )))
            }
            _ => {}
        }

        let body = response.text().await?;
        let snapshot: Snapshot = serde_json::from_str(&body)?;

        let generation = self.inner.snapshot.load().generation() + 1;
        self.inner.snapshot.store(Arc::new(snapshot.with_generation(generation)));
        info!("installed snapshot generation {generation}");

        Ok(())
    }

    /// POSTs a JSON body to a transport path such as `/v2/put/device.<id>`.
    pub(crate) async fn post_json<T>(&self, path: &str, body: &T) -> NestResult<()>
    where
        T: Serialize + ?Sized,
    {
        let (url, headers) = self.inner.endpoint(path)?;
        debug!("POST {url}");

        let response = self
            .inner
            .http_client
            .post(url.clone())
            .headers(headers)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!("failed to read error body from {url}: {e}");
                    String::new()
                }
            };
            warn!("POST {url} failed with status code: {status}");
            return Err(NestError::RemoteWriteError {
                endpoint: url.to_string(),
                status,
                body,
            });
        }

        Ok(())
    }

    /// Whether a login has succeeded on this connection.
    pub fn is_authenticated(&self) -> bool {
        self.inner.session.read().is_some()
    }

    /// Identifier of the logged-in user.
    pub fn user_id(&self) -> Option<String> {
        self.inner.session.read().as_ref().map(|s| s.user_id.clone())
    }

    /// Base URL for status and write calls, as assigned at login.
    pub fn transport_url(&self) -> Option<String> {
        self.inner.session.read().as_ref().map(|s| s.transport_url.clone())
    }

    /// The snapshot installed by the last refresh.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.snapshot.load_full()
    }

    /// Every device in the snapshot, keyed by device id.
    pub fn devices(&self) -> BTreeMap<String, Arc<Device>> {
        self.snapshot()
            .ids(Category::Device)
            .into_iter()
            .map(|id| {
                let device = self.device(&id);
                (id, device)
            })
            .collect()
    }

    /// Every user in the snapshot, keyed by user id.
    pub fn users(&self) -> BTreeMap<String, Arc<User>> {
        self.snapshot()
            .ids(Category::User)
            .into_iter()
            .map(|id| {
                let user = self.user(&id);
                (id, user)
            })
            .collect()
    }

    /// Device to structure associations, one per `link` record.
    pub fn links(&self) -> NestResult<Vec<(Arc<Device>, Arc<Structure>)>> {
        let snapshot = self.snapshot();
        snapshot
            .ids(Category::Link)
            .into_iter()
            .map(|device_id| -> NestResult<(Arc<Device>, Arc<Structure>)> {
                let structure_id = snapshot.linked_structure(&device_id)?;
                Ok((self.device(&device_id), self.structure(&structure_id)))
            })
            .collect()
    }

    /// Every structure reachable through a link, keyed by structure id.
    ///
    /// The snapshot has no enumerable list of structures, so this is the
    /// set of link targets.
    pub fn structures(&self) -> NestResult<BTreeMap<String, Arc<Structure>>> {
        Ok(self
            .links()?
            .into_iter()
            .map(|(_, structure)| (structure.structure_id().to_string(), structure))
            .collect())
    }

    /// The view of one device. The id may carry a `device.` prefix.
    pub fn device(&self, device_id: &str) -> Arc<Device> {
        let id = EntityKind::Device.normalize_id(device_id);
        self.inner.registry.lock().device(id, |id| Device::new(self.downgrade(), id))
    }

    /// The view of one structure. The id may carry a `structure.` prefix.
    pub fn structure(&self, structure_id: &str) -> Arc<Structure> {
        let id = EntityKind::Structure.normalize_id(structure_id);
        self.inner.registry.lock().structure(id, |id| Structure::new(self.downgrade(), id))
    }

    /// The view of one user. The id may carry a `user.` prefix.
    pub fn user(&self, user_id: &str) -> Arc<User> {
        let id = EntityKind::User.normalize_id(user_id);
        self.inner.registry.lock().user(id, |id| User::new(self.downgrade(), id))
    }

    /// The settings view of one user. The id may carry a `user_settings.`
    /// prefix.
    pub fn user_settings(&self, user_id: &str) -> Arc<UserSettings> {
        let id = EntityKind::UserSettings.normalize_id(user_id);
        self.inner
            .registry
            .lock()
            .user_settings(id, |id| UserSettings::new(self.downgrade(), id))
    }
}

impl ConnectionInner {
    /// Resolves a transport path and the headers every authenticated call
    /// carries.
    fn endpoint(&self, path: &str) -> NestResult<(Url, HeaderMap)> {
        let session = self.session.read();
        let session = session.as_ref().ok_or(NestError::NotAuthenticated)?;

        let url = Url::parse(&format!("{}{path}", session.transport_url))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {}", session.access_token.expose_secret()))
                .map_err(|e| NestError::ApiError(format!("Invalid access token: {e}")))?,
        );
        headers.insert(
            USER_ID_HEADER,
            HeaderValue::from_str(&session.user_id)
                .map_err(|e| NestError::ApiError(format!("Invalid user id: {e}")))?,
        );
        headers.insert(PROTOCOL_VERSION_HEADER, HeaderValue::from_static(PROTOCOL_VERSION));

        Ok((url, headers))
    }
}
