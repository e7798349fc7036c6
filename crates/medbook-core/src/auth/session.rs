//! Authenticated request handling with one-shot token refresh.
//!
//! Every protected call goes through [`AuthenticatedSession::request`]. A 401
//! triggers exactly one refresh attempt; if that works the identical request
//! is replayed once, otherwise the stored credential is dropped and the caller
//! gets [`ApiError::SessionExpired`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::api::{ApiError, ApiRequest, ApiResponse, Transport};
use crate::models::{RegistrationForm, Role, UserAccount};

use super::credentials::{Credential, CredentialStore, StorageKey};

/// Backend routes used by the session itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub token: String,
    pub refresh: String,
    pub register: String,
    /// Best-effort notification on logout. `None` skips the call.
    pub logout: Option<String>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token: "/api/token/".to_string(),
            refresh: "/api/token/refresh/".to_string(),
            register: "/api/auth/register/".to_string(),
            logout: Some("/api/auth/logout/".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Refreshing,
    /// Refresh failed and the credential was cleared. Left only by `login`.
    Expired,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: String,
    refresh: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    user: Option<UserAccount>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    /// Present when the backend rotates refresh tokens.
    #[serde(default)]
    refresh: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegistrationResponse {
    #[serde(default)]
    user: Option<UserAccount>,
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub role: Option<Role>,
    pub user: Option<UserAccount>,
}

#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    pub user: Option<UserAccount>,
    /// True when the backend issued tokens and the session is now logged in.
    pub logged_in: bool,
    pub message: Option<String>,
}

pub struct AuthenticatedSession<T> {
    transport: T,
    store: Arc<dyn CredentialStore>,
    endpoints: Endpoints,
    // Held for the whole refresh exchange so concurrent 401s coalesce.
    refresh_lock: Mutex<()>,
    state: watch::Sender<SessionState>,
}

impl<T: Transport> AuthenticatedSession<T> {
    pub fn new(transport: T, store: Arc<dyn CredentialStore>) -> Self {
        Self::with_endpoints(transport, store, Endpoints::default())
    }

    pub fn with_endpoints(transport: T, store: Arc<dyn CredentialStore>, endpoints: Endpoints) -> Self {
        let initial = match store.get(StorageKey::Access) {
            Ok(Some(_)) => SessionState::Authenticated,
            Ok(None) => SessionState::Unauthenticated,
            Err(e) => {
                warn!(error = %e, "Could not read stored credentials");
                SessionState::Unauthenticated
            }
        };
        let (state, _) = watch::channel(initial);
        Self {
            transport,
            store,
            endpoints,
            refresh_lock: Mutex::new(()),
            state,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state changes, e.g. to send the user to the login step on `Expired`.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.store.get(StorageKey::Access), Ok(Some(_)))
    }

    /// Cached role from the last login. Display only; the backend decides access.
    pub fn role(&self) -> Option<Role> {
        match self.store.get(StorageKey::Role) {
            Ok(role) => role.map(|r| Role::parse(&r)),
            Err(e) => {
                debug!(error = %e, "Could not read cached role");
                None
            }
        }
    }

    fn set_state(&self, next: SessionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(?prev, ?next, "Session state changed");
        }
    }

    /// Send `req` with the stored access token.
    ///
    /// 403 is reported as `Forbidden` and never refreshes. Every other status
    /// is handed back untouched.
    pub async fn request(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let token = match self.store.get(StorageKey::Access)? {
            Some(token) => token,
            None => {
                debug!(path = %req.path, "No access token, request not sent");
                if self.state() != SessionState::Expired {
                    self.set_state(SessionState::Unauthenticated);
                }
                return Err(ApiError::Unauthenticated);
            }
        };

        let response = self.transport.send(req, Some(&token)).await?;
        match response.status {
            401 => {}
            403 => return Err(ApiError::Forbidden(response.body)),
            _ => {
                self.mark_authenticated();
                return Ok(response);
            }
        }

        info!(path = %req.path, "Access token rejected, attempting refresh");
        let renewed = match self.renew(Some(&token), true).await {
            Some(token) => token,
            None => return Err(ApiError::SessionExpired),
        };

        // Final answer: no second refresh whatever the retry returns.
        let retried = self.transport.send(req, Some(&renewed)).await?;
        if retried.status == 403 {
            return Err(ApiError::Forbidden(retried.body));
        }
        if retried.status == 401 {
            warn!(path = %req.path, "Request still unauthorized after refresh");
        }
        Ok(retried)
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Never fails loudly; any problem comes back as `false`.
    pub async fn refresh(&self) -> bool {
        self.renew(None, false).await.is_some()
    }

    /// Refresh under the lock. `rejected` is the access token the caller just
    /// had refused; if the store already holds a different one, another
    /// request refreshed in the meantime and that token is reused as is.
    async fn renew(&self, rejected: Option<&str>, expire_on_failure: bool) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(rejected) = rejected {
            match self.store.get(StorageKey::Access) {
                Ok(Some(current)) if current != rejected => {
                    debug!("Access token already renewed by a concurrent request");
                    return Some(current);
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Could not re-read access token"),
            }
        }

        let before = self.state();
        self.set_state(SessionState::Refreshing);

        match self.exchange_refresh_token().await {
            Some(access) => {
                self.set_state(SessionState::Authenticated);
                Some(access)
            }
            None if expire_on_failure => {
                self.expire();
                None
            }
            None => {
                self.set_state(before);
                None
            }
        }
    }

    async fn exchange_refresh_token(&self) -> Option<String> {
        let refresh = match self.store.get(StorageKey::Refresh) {
            Ok(Some(refresh)) => refresh,
            Ok(None) => {
                debug!("No refresh token stored, skipping refresh");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Could not read refresh token");
                return None;
            }
        };

        let req = match ApiRequest::post(self.endpoints.refresh.as_str()).json(&RefreshRequest { refresh: &refresh }) {
            Ok(req) => req,
            Err(e) => {
                warn!(error = %e, "Could not build refresh request");
                return None;
            }
        };

        let response = match self.transport.send(&req, None).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh request failed");
                return None;
            }
        };
        if !response.is_success() {
            warn!(status = response.status, "Token refresh rejected");
            return None;
        }

        let parsed: RefreshResponse = match response.json() {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Malformed token refresh response");
                return None;
            }
        };
        if parsed.access.is_empty() {
            warn!("Token refresh response carried an empty access token");
            return None;
        }

        if let Err(e) = self.store.set(StorageKey::Access, &parsed.access) {
            warn!(error = %e, "Could not store refreshed access token");
            return None;
        }
        if let Some(rotated) = parsed.refresh.filter(|r| !r.is_empty()) {
            if let Err(e) = self.store.set(StorageKey::Refresh, &rotated) {
                warn!(error = %e, "Could not store rotated refresh token");
            }
        }
        debug!("Access token refreshed");
        Some(parsed.access)
    }

    fn mark_authenticated(&self) {
        if self.state() != SessionState::Authenticated {
            self.set_state(SessionState::Authenticated);
        }
    }

    fn expire(&self) {
        info!("Session expired, clearing stored credentials");
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored credentials");
        }
        self.set_state(SessionState::Expired);
    }

    /// Log in with username and password, replacing any stored credential.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, ApiError> {
        self.set_state(SessionState::Authenticating);
        let result = self.authenticate(username, password).await;
        match &result {
            Ok(_) => {
                info!(username, "Logged in");
                self.set_state(SessionState::Authenticated);
            }
            Err(e) => {
                debug!(username, error = %e, "Login failed");
                self.set_state(SessionState::Unauthenticated);
            }
        }
        result
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<LoginOutcome, ApiError> {
        let req = ApiRequest::post(self.endpoints.token.as_str()).json(&LoginRequest { username, password })?;
        let response = self.transport.send(&req, None).await?;
        if !response.is_success() {
            return Err(ApiError::from_status(response.status, &response.body));
        }

        let tokens: TokenResponse = response.json()?;
        let role = tokens
            .role
            .as_deref()
            .map(Role::parse)
            .or_else(|| tokens.user.as_ref().and_then(|u| u.role.clone()));

        self.replace_credential(
            &Credential {
                access: tokens.access,
                refresh: tokens.refresh,
            },
            role.as_ref(),
        )?;

        Ok(LoginOutcome {
            role,
            user: tokens.user,
        })
    }

    /// Register a new account. If the backend returns tokens the session is
    /// logged in straight away.
    pub async fn register(&self, form: &RegistrationForm) -> Result<RegistrationOutcome, ApiError> {
        form.validate()?;

        let req = ApiRequest::post(self.endpoints.register.as_str()).json(form)?;
        let response = self.transport.send(&req, None).await?;
        if !response.is_success() {
            return Err(ApiError::from_status(response.status, &response.body));
        }

        let parsed: RegistrationResponse = response.json()?;
        let logged_in = match (parsed.access, parsed.refresh) {
            (Some(access), Some(refresh)) => {
                let role = parsed
                    .user
                    .as_ref()
                    .and_then(|u| u.role.clone())
                    .or_else(|| Some(form.role.clone()));
                self.replace_credential(&Credential { access, refresh }, role.as_ref())?;
                self.set_state(SessionState::Authenticated);
                true
            }
            _ => false,
        };
        info!(username = %form.username, logged_in, "Registered account");

        Ok(RegistrationOutcome {
            user: parsed.user,
            logged_in,
            message: parsed.message,
        })
    }

    fn replace_credential(&self, credential: &Credential, role: Option<&Role>) -> Result<(), ApiError> {
        self.store.clear()?;
        self.store.store_credential(credential)?;
        if let Some(role) = role {
            self.store.set(StorageKey::Role, role.as_str())?;
        }
        Ok(())
    }

    /// Drop the stored credential. The backend is told first when possible,
    /// but local state is cleared whatever happens there.
    pub async fn logout(&self) {
        let token = self.store.get(StorageKey::Access).ok().flatten();
        if let (Some(path), Some(token)) = (self.endpoints.logout.as_deref(), token) {
            match self.transport.send(&ApiRequest::post(path), Some(&token)).await {
                Ok(response) if response.is_success() => debug!("Backend acknowledged logout"),
                Ok(response) => warn!(status = response.status, "Logout notification rejected"),
                Err(e) => warn!(error = %e, "Logout notification failed"),
            }
        }

        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored credentials");
        }
        self.set_state(SessionState::Unauthenticated);
        info!("Logged out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::testing::FakeTransport;
    use crate::api::TransportError;
    use crate::auth::MemoryStore;

    const REFRESH_PATH: &str = "/api/token/refresh/";

    fn session_with(store: MemoryStore, transport: FakeTransport) -> AuthenticatedSession<FakeTransport> {
        AuthenticatedSession::new(transport, Arc::new(store))
    }

    fn access(session: &AuthenticatedSession<FakeTransport>) -> Option<String> {
        session.store().get(StorageKey::Access).unwrap()
    }

    fn refresh_token(session: &AuthenticatedSession<FakeTransport>) -> Option<String> {
        session.store().get(StorageKey::Refresh).unwrap()
    }

    #[tokio::test]
    async fn test_no_token_is_unauthenticated_without_network() {
        let session = session_with(MemoryStore::new(), FakeTransport::new(|_| Ok(ApiResponse::new(200, "{}"))));

        let result = session.request(&ApiRequest::get("/dashboard/")).await;

        assert!(matches!(result, Err(ApiError::Unauthenticated)));
        assert_eq!(session.transport().call_count(), 0);
        assert_eq!(session.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_valid_token_single_call() {
        let transport = FakeTransport::new(|call| {
            assert_eq!(call.bearer.as_deref(), Some("A1"));
            Ok(ApiResponse::new(200, r#"{"ok":true}"#))
        });
        let session = session_with(MemoryStore::with_credential("A1", "R1"), transport);

        let response = session.request(&ApiRequest::get("/dashboard/")).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"ok":true}"#);
        assert_eq!(session.transport().call_count(), 1);
    }

    #[tokio::test]
    async fn test_401_refresh_then_retry() {
        let transport = FakeTransport::new(|call| {
            if call.path == REFRESH_PATH {
                assert_eq!(call.bearer, None);
                assert_eq!(call.body, Some(serde_json::json!({"refresh": "R1"})));
                return Ok(ApiResponse::new(200, r#"{"access":"A2"}"#));
            }
            match call.bearer.as_deref() {
                Some("A1") => Ok(ApiResponse::new(401, r#"{"detail":"token expired"}"#)),
                Some("A2") => Ok(ApiResponse::new(200, r#"{"ok":true}"#)),
                other => panic!("unexpected bearer {:?}", other),
            }
        });
        let session = session_with(MemoryStore::with_credential("A1", "R1"), transport);

        let response = session.request(&ApiRequest::get("/dashboard/")).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"ok":true}"#);
        // original + refresh + one retry
        assert_eq!(session.transport().call_count(), 3);
        assert_eq!(session.transport().calls_to(REFRESH_PATH), 1);
        assert_eq!(access(&session).as_deref(), Some("A2"));
        assert_eq!(refresh_token(&session).as_deref(), Some("R1"));
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_retry_replays_identical_request() {
        let transport = FakeTransport::new(|call| {
            if call.path == REFRESH_PATH {
                return Ok(ApiResponse::new(200, r#"{"access":"A2"}"#));
            }
            if call.bearer.as_deref() == Some("A1") {
                Ok(ApiResponse::new(401, ""))
            } else {
                Ok(ApiResponse::new(201, "{}"))
            }
        });
        let session = session_with(MemoryStore::with_credential("A1", "R1"), transport);
        let req = ApiRequest::post("/api/appointments/")
            .with_body(serde_json::json!({"doctor": 4, "date": "2025-03-01"}));

        session.request(&req).await.unwrap();

        let calls = session.transport().calls();
        assert_eq!(calls[0].path, calls[2].path);
        assert_eq!(calls[0].method, calls[2].method);
        assert_eq!(calls[0].body, calls[2].body);
        assert_eq!(calls[2].bearer.as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn test_retry_result_is_final() {
        // Even a second 401 comes back as-is; there is no further refresh.
        let transport = FakeTransport::new(|call| {
            if call.path == REFRESH_PATH {
                Ok(ApiResponse::new(200, r#"{"access":"A2"}"#))
            } else {
                Ok(ApiResponse::new(401, "still no"))
            }
        });
        let session = session_with(MemoryStore::with_credential("A1", "R1"), transport);

        let response = session.request(&ApiRequest::get("/api/appointments/")).await.unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(session.transport().call_count(), 3);
        assert_eq!(session.transport().calls_to(REFRESH_PATH), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_expires_session() {
        let transport = FakeTransport::new(|call| {
            if call.path == REFRESH_PATH {
                Ok(ApiResponse::new(401, r#"{"detail":"Token is invalid or expired"}"#))
            } else {
                Ok(ApiResponse::new(401, ""))
            }
        });
        let store = MemoryStore::with_credential("A1", "R1");
        store.set(StorageKey::Role, "DOCTOR").unwrap();
        let session = session_with(store, transport);
        let mut states = session.subscribe();

        let result = session.request(&ApiRequest::get("/api/doctor/patients/")).await;

        assert!(matches!(result, Err(ApiError::SessionExpired)));
        assert_eq!(access(&session), None);
        assert_eq!(refresh_token(&session), None);
        assert_eq!(session.role(), None);
        assert_eq!(session.state(), SessionState::Expired);
        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), SessionState::Expired);
        // No retry after a failed refresh
        assert_eq!(session.transport().call_count(), 2);

        // Expired stays put; the next call short-circuits
        let again = session.request(&ApiRequest::get("/api/doctor/patients/")).await;
        assert!(matches!(again, Err(ApiError::Unauthenticated)));
        assert_eq!(session.state(), SessionState::Expired);
        assert_eq!(session.transport().call_count(), 2);
    }

    #[tokio::test]
    async fn test_403_never_refreshes() {
        let transport = FakeTransport::new(|_| Ok(ApiResponse::new(403, r#"{"error":"doctor privileges required"}"#)));
        let session = session_with(MemoryStore::with_credential("A1", "R1"), transport);

        let result = session.request(&ApiRequest::get("/api/doctor/patients/")).await;

        match result {
            Err(ApiError::Forbidden(body)) => assert!(body.contains("doctor privileges required")),
            other => panic!("expected Forbidden, got {:?}", other),
        }
        assert_eq!(session.transport().call_count(), 1);
        assert_eq!(session.transport().calls_to(REFRESH_PATH), 0);
        assert_eq!(access(&session).as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn test_403_after_refresh_is_forbidden() {
        let transport = FakeTransport::new(|call| {
            if call.path == REFRESH_PATH {
                return Ok(ApiResponse::new(200, r#"{"access":"A2"}"#));
            }
            match call.bearer.as_deref() {
                Some("A1") => Ok(ApiResponse::new(401, "")),
                _ => Ok(ApiResponse::new(403, "forbidden")),
            }
        });
        let session = session_with(MemoryStore::with_credential("A1", "R1"), transport);

        let result = session.request(&ApiRequest::get("/api/doctor/patients/")).await;

        assert!(matches!(result, Err(ApiError::Forbidden(_))));
        assert_eq!(session.transport().calls_to(REFRESH_PATH), 1);
    }

    #[tokio::test]
    async fn test_other_statuses_pass_through() {
        for status in [400u16, 404, 409, 500, 503] {
            let transport = FakeTransport::new(move |_| Ok(ApiResponse::new(status, "payload")));
            let session = session_with(MemoryStore::with_credential("A1", "R1"), transport);

            let response = session.request(&ApiRequest::get("/api/appointments/")).await.unwrap();

            assert_eq!(response.status, status);
            assert_eq!(response.body, "payload");
            assert_eq!(session.transport().call_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_network_error_is_distinct() {
        let transport = FakeTransport::new(|_| Err(TransportError::Connection("connection refused".to_string())));
        let session = session_with(MemoryStore::with_credential("A1", "R1"), transport);

        let result = session.request(&ApiRequest::get("/dashboard/")).await;

        assert!(matches!(result, Err(ApiError::Network(_))));
        assert_eq!(access(&session).as_deref(), Some("A1"));
        assert_eq!(refresh_token(&session).as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token() {
        let store = MemoryStore::new();
        store.set(StorageKey::Access, "A1").unwrap();
        let session = session_with(store, FakeTransport::new(|_| Ok(ApiResponse::new(200, r#"{"access":"A2"}"#))));

        assert!(!session.refresh().await);
        assert_eq!(session.transport().call_count(), 0);
        // A bare refresh() failure leaves the stored token alone
        assert_eq!(access(&session).as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn test_refresh_malformed_body() {
        let session = session_with(
            MemoryStore::with_credential("A1", "R1"),
            FakeTransport::new(|_| Ok(ApiResponse::new(200, r#"{"token":"nope"}"#))),
        );
        assert!(!session.refresh().await);
        assert_eq!(access(&session).as_deref(), Some("A1"));
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_refresh_network_error() {
        let session = session_with(
            MemoryStore::with_credential("A1", "R1"),
            FakeTransport::new(|_| Err(TransportError::Connection("timed out".to_string()))),
        );
        assert!(!session.refresh().await);
    }

    #[tokio::test]
    async fn test_refresh_stores_rotated_refresh_token() {
        let session = session_with(
            MemoryStore::with_credential("A1", "R1"),
            FakeTransport::new(|_| Ok(ApiResponse::new(200, r#"{"access":"A2","refresh":"R2"}"#))),
        );
        assert!(session.refresh().await);
        assert_eq!(access(&session).as_deref(), Some("A2"));
        assert_eq!(refresh_token(&session).as_deref(), Some("R2"));
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        let transport = FakeTransport::new(|call| {
            if call.path == REFRESH_PATH {
                return Ok(ApiResponse::new(200, r#"{"access":"A2"}"#));
            }
            match call.bearer.as_deref() {
                Some("A1") => Ok(ApiResponse::new(401, "")),
                _ => Ok(ApiResponse::new(200, "[]")),
            }
        });
        let session = session_with(MemoryStore::with_credential("A1", "R1"), transport);

        let first = ApiRequest::get("/api/appointments/");
        let second = ApiRequest::get("/api/doctors/");
        let (a, b) = futures::join!(session.request(&first), session.request(&second));

        assert_eq!(a.unwrap().status, 200);
        assert_eq!(b.unwrap().status, 200);
        assert_eq!(session.transport().calls_to(REFRESH_PATH), 1);
        assert_eq!(access(&session).as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn test_login_stores_credential_and_role() {
        let transport = FakeTransport::new(|call| {
            assert_eq!(call.path, "/api/token/");
            assert_eq!(call.bearer, None);
            assert_eq!(
                call.body,
                Some(serde_json::json!({"username": "dr_house", "password": "vicodin"}))
            );
            Ok(ApiResponse::new(200, r#"{"access":"A1","refresh":"R1","role":"DOCTOR"}"#))
        });
        let session = session_with(MemoryStore::new(), transport);
        assert_eq!(session.state(), SessionState::Unauthenticated);

        let outcome = session.login("dr_house", "vicodin").await.unwrap();

        assert_eq!(outcome.role, Some(Role::Doctor));
        assert_eq!(access(&session).as_deref(), Some("A1"));
        assert_eq!(refresh_token(&session).as_deref(), Some("R1"));
        assert_eq!(session.role(), Some(Role::Doctor));
        assert_eq!(session.state(), SessionState::Authenticated);
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_failure() {
        let transport = FakeTransport::new(|_| Ok(ApiResponse::new(401, r#"{"error":"Invalid credentials"}"#)));
        let session = session_with(MemoryStore::new(), transport);

        let result = session.login("nobody", "wrong").await;

        match result {
            Err(e @ ApiError::ServerError { status: 401, .. }) => {
                assert_eq!(e.server_message().as_deref(), Some("Invalid credentials"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_replaces_previous_credential() {
        let store = MemoryStore::with_credential("OLD_A", "OLD_R");
        store.set(StorageKey::Role, "DOCTOR").unwrap();
        let transport = FakeTransport::new(|_| Ok(ApiResponse::new(200, r#"{"access":"A1","refresh":"R1"}"#)));
        let session = session_with(store, transport);

        session.login("pat", "pw").await.unwrap();

        assert_eq!(access(&session).as_deref(), Some("A1"));
        assert_eq!(refresh_token(&session).as_deref(), Some("R1"));
        assert_eq!(session.role(), None);
    }

    #[tokio::test]
    async fn test_login_after_expiry() {
        let transport = FakeTransport::new(|call| match call.path.as_str() {
            "/api/token/" => Ok(ApiResponse::new(200, r#"{"access":"A9","refresh":"R9"}"#)),
            REFRESH_PATH => Ok(ApiResponse::new(401, "")),
            _ => match call.bearer.as_deref() {
                Some("A9") => Ok(ApiResponse::new(200, "{}")),
                _ => Ok(ApiResponse::new(401, "")),
            },
        });
        let session = session_with(MemoryStore::with_credential("A1", "R1"), transport);

        assert!(matches!(
            session.request(&ApiRequest::get("/dashboard/")).await,
            Err(ApiError::SessionExpired)
        ));
        assert_eq!(session.state(), SessionState::Expired);

        session.login("pat", "pw").await.unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.request(&ApiRequest::get("/dashboard/")).await.unwrap().status, 200);
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_backend_fails() {
        let store = MemoryStore::with_credential("A1", "R1");
        store.set(StorageKey::Role, "PATIENT").unwrap();
        let session = session_with(
            store,
            FakeTransport::new(|_| Err(TransportError::Connection("unreachable".to_string()))),
        );

        session.logout().await;

        assert_eq!(session.transport().calls_to("/api/auth/logout/"), 1);
        assert_eq!(session.transport().calls()[0].bearer.as_deref(), Some("A1"));
        for key in StorageKey::ALL {
            assert_eq!(session.store().get(key).unwrap(), None);
        }
        assert_eq!(session.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_logout_without_token_skips_notify() {
        let session = session_with(MemoryStore::new(), FakeTransport::new(|_| Ok(ApiResponse::new(200, ""))));
        session.logout().await;
        assert_eq!(session.transport().call_count(), 0);
    }

    #[tokio::test]
    async fn test_register_with_tokens_logs_in() {
        let transport = FakeTransport::new(|call| {
            assert_eq!(call.path, "/api/auth/register/");
            let body = call.body.as_ref().expect("registration body");
            assert_eq!(body["username"], "jdoe");
            assert_eq!(body["role"], "PATIENT");
            Ok(ApiResponse::new(
                201,
                r#"{"user":{"id":3,"username":"jdoe","role":"PATIENT"},"access":"A1","refresh":"R1","message":"User registered successfully"}"#,
            ))
        });
        let session = session_with(MemoryStore::new(), transport);

        let outcome = session.register(&RegistrationForm::sample()).await.unwrap();

        assert!(outcome.logged_in);
        assert_eq!(outcome.user.and_then(|u| u.username).as_deref(), Some("jdoe"));
        assert_eq!(access(&session).as_deref(), Some("A1"));
        assert_eq!(session.role(), Some(Role::Patient));
    }

    #[tokio::test]
    async fn test_register_without_tokens() {
        let transport = FakeTransport::new(|_| Ok(ApiResponse::new(201, r#"{"message":"User registered successfully"}"#)));
        let session = session_with(MemoryStore::new(), transport);

        let outcome = session.register(&RegistrationForm::sample()).await.unwrap();

        assert!(!outcome.logged_in);
        assert_eq!(outcome.message.as_deref(), Some("User registered successfully"));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_register_password_mismatch_is_local() {
        let session = session_with(MemoryStore::new(), FakeTransport::new(|_| Ok(ApiResponse::new(201, "{}"))));
        let mut form = RegistrationForm::sample();
        form.confirm_password = "different".to_string();

        let result = session.register(&form).await;

        assert!(matches!(result, Err(ApiError::Validation(ref m)) if m == "Passwords do not match"));
        assert_eq!(session.transport().call_count(), 0);
    }
}
