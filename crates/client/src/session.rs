//! # Session
//!
//! Holds the access token in memory and attaches it to every call. When a call outside
//! `/auth/*` comes back 401, the session refreshes the token pair and replays the call once.
//!
//! Refreshes are single-flight: the first 401 spawns the refresh and every caller that hits a 401
//! while it runs queues a waiter instead of starting another. Each refresh rotates the server-side
//! token, so a second concurrent refresh would invalidate the first. When the refresh fails every
//! waiter gets its original error back and the session is cleared.
//!
//! Refreshes are keyed by session generation. A refresh started before a login or sign-out never
//! answers callers of the newer session; they get a refresh of their own.

use crate::error::{ClientError, ClientResult};
use crate::store::{PersistedSession, SessionStore};
use api_shared::{ApiResponse, ErrorBody, LoginReq, LoginRes, RefreshReq, TokensRes, UserRes};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex, RwLock};

/// Upper bound on the refresh performed by [`Session::bootstrap`].
pub const BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Calls under this prefix are never intercepted for refresh.
const AUTH_PREFIX: &str = "/auth/";

#[derive(Debug, Default)]
struct Credentials {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<UserRes>,
    /// Bumped on every login and sign-out so a refresh that settles late cannot revive them.
    generation: u64,
}

#[derive(Debug, Clone)]
enum RefreshOutcome {
    Refreshed(String),
    Failed,
    /// The session changed while the refresh ran; its result was dropped.
    Superseded,
}

#[derive(Debug, Default)]
struct RefreshState {
    /// Generations with a refresh in flight.
    in_flight: Vec<u64>,
    waiters: Vec<(u64, oneshot::Sender<RefreshOutcome>)>,
}

#[derive(Debug)]
struct Inner {
    http: reqwest::Client,
    base_url: String,
    store: SessionStore,
    bootstrap_timeout: Duration,
    credentials: RwLock<Credentials>,
    refresh: Mutex<RefreshState>,
}

/// A signed-in (or signed-out) client. Clones share the same session.
#[derive(Clone, Debug)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    pub fn new(base_url: &str, store: SessionStore) -> ClientResult<Self> {
        let base_url = base_url.trim_end_matches('/');
        let parsed = reqwest::Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "{base_url}: scheme must be http or https"
            )));
        }

        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: base_url.to_owned(),
                store,
                bootstrap_timeout: BOOTSTRAP_TIMEOUT,
                credentials: RwLock::new(Credentials::default()),
                refresh: Mutex::new(RefreshState::default()),
            }),
        })
    }

    /// Overrides [`BOOTSTRAP_TIMEOUT`]. Only meaningful before the session is shared.
    pub fn with_bootstrap_timeout(mut self, timeout: Duration) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.bootstrap_timeout = timeout;
        }
        self
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub async fn current_user(&self) -> Option<UserRes> {
        self.inner.credentials.read().await.user.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.inner.credentials.read().await.access_token.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.credentials.read().await.access_token.is_some()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Restores the persisted session.
    ///
    /// The stored refresh token is exchanged for a fresh pair within the bootstrap timeout. If that
    /// fails or times out the session is cleared and `None` is returned.
    pub async fn bootstrap(&self) -> Option<UserRes> {
        let persisted = self.inner.store.load();
        let refresh_token = persisted.refresh_token?;
        {
            let mut creds = self.inner.credentials.write().await;
            creds.user = persisted.last_user;
            creds.refresh_token = Some(refresh_token);
            creds.access_token = None;
        }

        match tokio::time::timeout(self.inner.bootstrap_timeout, self.refreshed_token(None)).await
        {
            Ok(Some(_)) => {}
            Ok(None) => return None,
            Err(_) => {
                tracing::warn!("session bootstrap timed out");
                self.inner.clear().await;
                return None;
            }
        }

        if let Some(user) = self.current_user().await {
            return Some(user);
        }
        match self.profile().await {
            Ok(user) => {
                let mut creds = self.inner.credentials.write().await;
                creds.user = Some(user.clone());
                self.inner.persist(&creds);
                Some(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load profile after bootstrap");
                self.inner.clear().await;
                None
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<UserRes> {
        let req = LoginReq {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        let res: LoginRes = self
            .call(Method::POST, "/auth/login", |b| b.json(&req))
            .await?;

        let mut creds = self.inner.credentials.write().await;
        *creds = Credentials {
            access_token: Some(res.access_token),
            refresh_token: Some(res.refresh_token),
            user: Some(res.user.clone()),
            generation: creds.generation + 1,
        };
        self.inner.persist(&creds);
        Ok(res.user)
    }

    /// Revokes the refresh token on the server if possible and always clears the local session.
    pub async fn logout(&self) {
        let refresh_token = self.inner.credentials.read().await.refresh_token.clone();
        let req = RefreshReq { refresh_token };
        let result: ClientResult<()> = self
            .call(Method::POST, "/auth/logout", |b| b.json(&req))
            .await;
        if let Err(e) = result {
            tracing::debug!(error = %e, "server logout failed; clearing local session anyway");
        }
        self.inner.clear().await;
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Sends `method path`, letting `customize` add a body or query string.
    pub(crate) async fn call<T, F>(&self, method: Method, path: &str, customize: F) -> ClientResult<T>
    where
        T: DeserializeOwned,
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let builder = customize(self.inner.http.request(method, self.inner.url(path)));
        let retry = builder.try_clone();

        let token = self.access_token().await;
        let res = with_token(builder, token.as_deref()).send().await?;
        if res.status() != StatusCode::UNAUTHORIZED || path.starts_with(AUTH_PREFIX) {
            return decode(res).await;
        }

        let original = match decode::<T>(res).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        let Some(retry) = retry else {
            return Err(original);
        };

        match self.refreshed_token(token.as_deref()).await {
            Some(fresh) => {
                tracing::debug!(%path, "replaying request with refreshed token");
                decode(retry.bearer_auth(fresh).send().await?).await
            }
            None => Err(original),
        }
    }

    /// Returns a usable access token after a 401 seen with `stale`.
    ///
    /// If another refresh already replaced `stale`, that token is returned at once. Otherwise the
    /// caller joins the current session's in-flight refresh, starting it if there is none. A caller
    /// whose refresh was superseded by a login or sign-out re-evaluates against the new session.
    async fn refreshed_token(&self, stale: Option<&str>) -> Option<String> {
        loop {
            let rx = {
                let mut refresh = self.inner.refresh.lock().await;
                let (generation, current, has_refresh_token) = {
                    let creds = self.inner.credentials.read().await;
                    (
                        creds.generation,
                        creds.access_token.clone(),
                        creds.refresh_token.is_some(),
                    )
                };

                let running = refresh.in_flight.contains(&generation);
                if !running {
                    if current.is_some() && current.as_deref() != stale {
                        return current;
                    }
                    if !has_refresh_token {
                        return None;
                    }
                }

                let (tx, rx) = oneshot::channel();
                refresh.waiters.push((generation, tx));
                if !running {
                    refresh.in_flight.push(generation);
                    let inner = Arc::clone(&self.inner);
                    tokio::spawn(inner.run_refresh(generation));
                }
                rx
            };

            match rx.await {
                Ok(RefreshOutcome::Refreshed(token)) => return Some(token),
                Ok(RefreshOutcome::Superseded) => continue,
                Ok(RefreshOutcome::Failed) | Err(_) => return None,
            }
        }
    }
}

impl Inner {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Performs the refresh for `generation` and wakes that generation's waiters with the outcome.
    async fn run_refresh(self: Arc<Self>, generation: u64) {
        let refresh_token = {
            let creds = self.credentials.read().await;
            (creds.generation == generation).then(|| creds.refresh_token.clone())
        };

        let outcome = match refresh_token {
            Some(refresh_token) => {
                let result = self.exchange_refresh_token(refresh_token).await;
                self.apply_refresh(generation, result).await
            }
            None => RefreshOutcome::Superseded,
        };

        let waiters = {
            let mut refresh = self.refresh.lock().await;
            refresh.in_flight.retain(|g| *g != generation);
            let (settled, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut refresh.waiters)
                .into_iter()
                .partition(|(g, _)| *g == generation);
            refresh.waiters = pending;
            settled
        };
        tracing::debug!(
            generation,
            waiters = waiters.len(),
            ok = matches!(outcome, RefreshOutcome::Refreshed(_)),
            "refresh settled"
        );
        for (_, waiter) in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    async fn apply_refresh(
        &self,
        generation: u64,
        result: ClientResult<TokensRes>,
    ) -> RefreshOutcome {
        let mut creds = self.credentials.write().await;
        if creds.generation != generation {
            tracing::debug!("discarding refresh that settled after the session changed");
            return RefreshOutcome::Superseded;
        }
        match result {
            Ok(tokens) => {
                creds.access_token = Some(tokens.access_token.clone());
                creds.refresh_token = Some(tokens.refresh_token);
                self.persist(&creds);
                RefreshOutcome::Refreshed(tokens.access_token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed; signing out");
                self.reset(&mut creds);
                RefreshOutcome::Failed
            }
        }
    }

    async fn exchange_refresh_token(&self, refresh_token: Option<String>) -> ClientResult<TokensRes> {
        let refresh_token = refresh_token.ok_or(ClientError::NotAuthenticated)?;
        let res = self
            .http
            .post(self.url("/auth/refresh"))
            .json(&RefreshReq {
                refresh_token: Some(refresh_token),
            })
            .send()
            .await?;
        decode(res).await
    }

    fn persist(&self, creds: &Credentials) {
        let snapshot = PersistedSession {
            last_user: creds.user.clone(),
            refresh_token: creds.refresh_token.clone(),
        };
        if let Err(e) = self.store.save(&snapshot) {
            tracing::warn!(error = %e, "failed to persist session");
        }
    }

    async fn clear(&self) {
        let mut creds = self.credentials.write().await;
        self.reset(&mut creds);
    }

    fn reset(&self, creds: &mut Credentials) {
        *creds = Credentials {
            generation: creds.generation + 1,
            ..Credentials::default()
        };
        self.store.clear();
    }
}

fn with_token(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

/// Unwraps the success envelope, or turns a failure envelope into [`ClientError::Api`].
async fn decode<T: DeserializeOwned>(res: reqwest::Response) -> ClientResult<T> {
    let status = res.status();
    let bytes = res.bytes().await?;
    if status.is_success() {
        let envelope: ApiResponse<T> = serde_json::from_slice(&bytes)?;
        return Ok(envelope.data);
    }

    let body = serde_json::from_slice::<ErrorBody>(&bytes).unwrap_or_else(|_| {
        ErrorBody::new(status.canonical_reason().unwrap_or("Request failed"))
    });
    tracing::debug!(status = status.as_u16(), message = %body.message, "request failed");
    Err(ClientError::from_body(status.as_u16(), body))
}
