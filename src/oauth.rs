//! Third-party sign-in via the `OAuth2` authorization-code flow.
//!
//! The configuration is built once at startup and owned by [`OAuthClient`].
//! Every flow gets a fresh random state; the callback must echo it back
//! verbatim before any request is sent to the provider.

use base64::{engine::general_purpose::URL_SAFE, Engine};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const GOOGLE_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];
const STATE_LEN: usize = 16;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Error)]
pub enum Error {
    #[error("oauth state does not match")]
    StateMismatch,
    #[error("failed to generate oauth state")]
    Entropy(#[source] rand::Error),
    #[error("failed to exchange authorization code: {0}")]
    Exchange(String),
    #[error("failed to fetch provider profile: {0}")]
    ProfileFetch(String),
    #[error("failed to build http client")]
    Client(#[source] reqwest::Error),
}

#[derive(Clone)]
pub struct OAuthConfig {
    client_id: String,
    client_secret: SecretString,
    redirect_url: Url,
    auth_url: Url,
    token_url: Url,
    userinfo_url: Url,
    scopes: Vec<String>,
    timeout: Duration,
}

impl OAuthConfig {
    /// Google endpoints and the profile + email scopes.
    ///
    /// # Errors
    /// Returns an error only if the built-in endpoint URLs fail to parse.
    pub fn google(
        client_id: String,
        client_secret: SecretString,
        redirect_url: Url,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            client_id,
            client_secret,
            redirect_url,
            auth_url: Url::parse(GOOGLE_AUTH_URL)?,
            token_url: Url::parse(GOOGLE_TOKEN_URL)?,
            userinfo_url: Url::parse(GOOGLE_USERINFO_URL)?,
            scopes: GOOGLE_SCOPES.iter().map(ToString::to_string).collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        })
    }

    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    #[must_use]
    pub fn with_userinfo_url(mut self, url: Url) -> Self {
        self.userinfo_url = url;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_url", &self.redirect_url.as_str())
            .field("auth_url", &self.auth_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .field("userinfo_url", &self.userinfo_url.as_str())
            .field("scopes", &self.scopes)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Where to send the browser, and the state the callback must echo back.
#[derive(Debug)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

/// A provider identity mapped to local fields, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityCandidate {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub provider_subject: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Profile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
}

#[derive(Debug)]
pub struct OAuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl OAuthClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: OAuthConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(Error::Client)?;
        Ok(Self { config, http })
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Generate a state token and the provider authorization URL embedding it.
    ///
    /// # Errors
    /// Returns [`Error::Entropy`] if the OS random source fails.
    pub fn begin_authorization(&self) -> Result<AuthorizationRequest, Error> {
        let state = generate_state()?;
        let scope = self.config.scopes.join(" ");

        let mut url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_url.as_str())
            .append_pair("scope", &scope)
            .append_pair("state", &state);

        Ok(AuthorizationRequest {
            url: url.into(),
            state,
        })
    }

    /// Validate the echoed state, exchange `code`, and map the profile.
    ///
    /// # Errors
    /// [`Error::StateMismatch`] when the states differ or either is empty (no
    /// network call is made), [`Error::Exchange`] when `code` is empty or the
    /// token endpoint fails,
    /// [`Error::ProfileFetch`] when the profile cannot be fetched or decoded.
    #[instrument(skip_all)]
    pub async fn handle_callback(
        &self,
        received_state: &str,
        stored_state: Option<&str>,
        code: &str,
    ) -> Result<IdentityCandidate, Error> {
        check_state(received_state, stored_state)?;
        if code.is_empty() {
            return Err(Error::Exchange("missing authorization code".to_string()));
        }

        let access_token = self.exchange_code(code).await?;
        let profile = self.fetch_profile(&access_token).await?;

        let email = profile.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(Error::ProfileFetch("profile has no email".to_string()));
        }

        // Display names must be non-empty; fall back to the email.
        let username = match profile.name.trim() {
            "" => email.clone(),
            name => name.to_string(),
        };

        Ok(IdentityCandidate {
            id: Uuid::new_v4(),
            username,
            email,
            provider_subject: profile.id,
        })
    }

    async fn exchange_code(&self, code: &str) -> Result<String, Error> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Exchange(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Exchange(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Exchange(e.to_string()))?;

        debug!("authorization code exchanged");

        Ok(token.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Profile, Error> {
        let response = self
            .http
            .get(self.config.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Error::ProfileFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::ProfileFetch(format!(
                "profile endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<Profile>()
            .await
            .map_err(|e| Error::ProfileFetch(e.to_string()))
    }
}

fn check_state(received: &str, stored: Option<&str>) -> Result<(), Error> {
    match stored {
        Some(stored) if !stored.is_empty() && stored.as_bytes() == received.as_bytes() => Ok(()),
        _ => Err(Error::StateMismatch),
    }
}

fn generate_state() -> Result<String, Error> {
    let mut bytes = [0u8; STATE_LEN];
    OsRng.try_fill_bytes(&mut bytes).map_err(Error::Entropy)?;
    Ok(URL_SAFE.encode(bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };
    use tokio::net::TcpListener;

    fn config() -> OAuthConfig {
        OAuthConfig::google(
            "client-id".to_string(),
            SecretString::from("client-secret".to_string()),
            Url::parse("https://gatehouse.dev/auth/oauth/google/callback").unwrap(),
        )
        .unwrap()
    }

    // Points the provider at a port nothing listens on.
    fn unreachable_client() -> OAuthClient {
        let dead = Url::parse("http://127.0.0.1:9/").unwrap();
        OAuthClient::new(
            config()
                .with_token_url(dead.clone())
                .with_userinfo_url(dead)
                .with_timeout(Duration::from_secs(1)),
        )
        .unwrap()
    }

    async fn spawn_provider(router: Router) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    fn provider_client(base: &Url) -> OAuthClient {
        OAuthClient::new(
            config()
                .with_token_url(base.join("token").unwrap())
                .with_userinfo_url(base.join("userinfo").unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn authorization_url_embeds_state_and_scopes() {
        let client = unreachable_client();
        let request = client.begin_authorization().unwrap();
        let url = Url::parse(&request.url).unwrap();
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(query.get("state"), Some(&request.state));
        assert_eq!(query.get("client_id").map(String::as_str), Some("client-id"));
        assert_eq!(query.get("response_type").map(String::as_str), Some("code"));
        let scope = query.get("scope").cloned().unwrap_or_default();
        assert!(scope.contains("userinfo.email"));
        assert!(scope.contains("userinfo.profile"));
        assert!(!request.url.contains("client-secret"));
    }

    #[test]
    fn state_is_random_and_url_safe() {
        let client = unreachable_client();
        let first = client.begin_authorization().unwrap().state;
        let second = client.begin_authorization().unwrap().state;
        assert_ne!(first, second);
        assert_eq!(URL_SAFE.decode(&first).unwrap().len(), STATE_LEN);
        assert!(first
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '='));
    }

    #[test]
    fn check_state_requires_exact_non_empty_match() {
        assert!(check_state("abc", Some("abc")).is_ok());
        assert!(check_state("abc", Some("abd")).is_err());
        assert!(check_state("abc", Some("ABC")).is_err());
        assert!(check_state("", Some("")).is_err());
        assert!(check_state("abc", None).is_err());
    }

    #[tokio::test]
    async fn mismatched_state_fails_before_network() {
        let client = unreachable_client();
        let result = client.handle_callback("state", Some("other"), "code").await;
        assert!(matches!(result, Err(Error::StateMismatch)));
    }

    #[tokio::test]
    async fn matching_state_proceeds_to_exchange() {
        let client = unreachable_client();
        let result = client.handle_callback("state", Some("state"), "code").await;
        assert!(matches!(result, Err(Error::Exchange(_))));
    }

    #[tokio::test]
    async fn missing_code_fails_before_token_request() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/token",
            post(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Json(json!({"access_token": "at-123", "token_type": "Bearer"})) }
            }),
        );
        let base = spawn_provider(router).await;
        let client = provider_client(&base);

        let result = client.handle_callback("state", Some("state"), "").await;
        assert!(matches!(result, Err(Error::Exchange(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_callback_maps_profile() {
        let router = Router::new()
            .route(
                "/token",
                post(|| async { Json(json!({"access_token": "at-123", "token_type": "Bearer"})) }),
            )
            .route(
                "/userinfo",
                get(|| async {
                    Json(json!({"id": "g-42", "name": "Alice", "email": " Alice@Example.com "}))
                }),
            );
        let base = spawn_provider(router).await;
        let client = provider_client(&base);

        let candidate = client
            .handle_callback("state", Some("state"), "code")
            .await
            .unwrap();
        assert_eq!(candidate.username, "Alice");
        assert_eq!(candidate.email, "alice@example.com");
        assert_eq!(candidate.provider_subject, "g-42");
    }

    #[tokio::test]
    async fn rejected_code_is_exchange_failure() {
        let router = Router::new().route(
            "/token",
            post(|| async { (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"}))) }),
        );
        let base = spawn_provider(router).await;
        let client = provider_client(&base);

        let result = client.handle_callback("s", Some("s"), "bad-code").await;
        assert!(matches!(result, Err(Error::Exchange(_))));
    }

    #[tokio::test]
    async fn undecodable_profile_is_profile_failure() {
        let router = Router::new()
            .route(
                "/token",
                post(|| async { Json(json!({"access_token": "at-123"})) }),
            )
            .route("/userinfo", get(|| async { "not json" }));
        let base = spawn_provider(router).await;
        let client = provider_client(&base);

        let result = client.handle_callback("s", Some("s"), "code").await;
        assert!(matches!(result, Err(Error::ProfileFetch(_))));
    }

    #[tokio::test]
    async fn profile_without_email_is_profile_failure() {
        let router = Router::new()
            .route(
                "/token",
                post(|| async { Json(json!({"access_token": "at-123"})) }),
            )
            .route(
                "/userinfo",
                get(|| async { Json(json!({"id": "g-1", "name": "Nobody"})) }),
            );
        let base = spawn_provider(router).await;
        let client = provider_client(&base);

        let result = client.handle_callback("s", Some("s"), "code").await;
        assert!(matches!(result, Err(Error::ProfileFetch(_))));
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("client-secret"));
    }
}
