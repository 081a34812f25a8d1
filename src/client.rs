use crate::{
    endpoints::{self, LoginError, ProfileUpdate},
    refresh::RefreshCoordinator,
    request::Attempt,
    ClientConfig, ClientError, CurrentUser, HttpTransport, RawResponse,
    RequestDescriptor, SessionEvent, SessionStore, Transport,
    UnauthorizedReason,
};
use serde_json::Value;
use std::sync::Arc;

/// Sends requests without any session recovery.
///
/// This is what you use before there is a session to recover (logging in,
/// registering) and for the session management endpoints themselves.
#[derive(Clone)]
pub struct UnauthenticatedClient {
    transport: Arc<dyn Transport>,
}

impl UnauthenticatedClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        UnauthenticatedClient { transport }
    }

    /// Send a request, turning any non-2xx response into a
    /// [`ClientError::Application`].
    pub async fn send(
        &self,
        request: &RequestDescriptor,
    ) -> Result<RawResponse, ClientError> {
        let response = self.transport.execute(request).await?;
        into_result(response)
    }
}

impl std::fmt::Debug for UnauthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnauthenticatedClient").finish()
    }
}

/// What happened to a single request/response round trip.
enum Outcome {
    Success(RawResponse),
    /// The attached session was rejected.
    AuthorizationFailure,
    Failed(ClientError),
}

/// A client which transparently recovers from an expired session.
///
/// When a request is rejected because the session expired, the client asks
/// the server to refresh the session (at most one refresh is in flight at a
/// time, no matter how many requests failed) and re-issues the request once.
/// If the session can't be refreshed the user is logged out and a
/// [`SessionEvent::Expired`] is published so the UI can navigate back to the
/// entry point.
pub struct AuthenticatedClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    plain: UnauthenticatedClient,
    refresher: RefreshCoordinator,
    session: Arc<SessionStore>,
}

impl AuthenticatedClient {
    /// Create a client which talks to the server over HTTP.
    pub fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(&config)?;
        Ok(AuthenticatedClient::new(config, Arc::new(transport)))
    }

    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        AuthenticatedClient::with_session(
            config,
            transport,
            Arc::new(SessionStore::new()),
        )
    }

    pub fn with_session(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        session: Arc<SessionStore>,
    ) -> Self {
        let plain = UnauthenticatedClient::new(Arc::clone(&transport));
        let refresher =
            RefreshCoordinator::new(plain.clone(), config.refresh_timeout);

        AuthenticatedClient {
            config,
            transport,
            plain,
            refresher,
            session,
        }
    }

    pub fn config(&self) -> &ClientConfig { &self.config }

    pub fn session(&self) -> &Arc<SessionStore> { &self.session }

    /// The same transport, minus session recovery.
    pub fn unauthenticated(&self) -> &UnauthenticatedClient { &self.plain }

    pub fn refresher(&self) -> &RefreshCoordinator { &self.refresher }

    /// Send a request, refreshing the session and retrying once if it has
    /// expired.
    pub async fn send(
        &self,
        request: &RequestDescriptor,
    ) -> Result<RawResponse, ClientError> {
        let mut attempt = Attempt::Fresh;

        loop {
            match (self.issue(request).await, attempt) {
                (Outcome::Success(response), _) => return Ok(response),
                (Outcome::Failed(err), _) => return Err(err),
                (Outcome::AuthorizationFailure, Attempt::Retried) => {
                    log::warn!(
                        "{} {} was rejected even after refreshing the session",
                        request.method,
                        request.path
                    );
                    return Err(ClientError::Unauthorized(
                        UnauthorizedReason::RejectedAfterRetry,
                    ));
                },
                (Outcome::AuthorizationFailure, Attempt::Fresh) => {
                    log::debug!(
                        "The session expired while sending {} {}",
                        request.method,
                        request.path
                    );
                    attempt = Attempt::Retried;

                    if self.refresher.refresh().await.is_err() {
                        self.force_logout().await;
                        return Err(ClientError::Unauthorized(
                            UnauthorizedReason::RefreshFailed,
                        ));
                    }

                    log::debug!("Retrying {} {}", request.method, request.path);
                },
            }
        }
    }

    async fn issue(&self, request: &RequestDescriptor) -> Outcome {
        let timeout = self.config.request_timeout;
        let response = tokio::time::timeout(
            timeout,
            self.transport.execute(request),
        )
        .await;

        match response {
            Err(_) => Outcome::Failed(ClientError::TimedOut(timeout)),
            Ok(Err(e)) => Outcome::Failed(e),
            Ok(Ok(response))
                if self.config.triggers_refresh(response.status) =>
            {
                Outcome::AuthorizationFailure
            },
            Ok(Ok(response)) => match into_result(response) {
                Ok(response) => Outcome::Success(response),
                Err(e) => Outcome::Failed(e),
            },
        }
    }

    /// End a session which can't be repaired.
    ///
    /// The local identity is always cleared and [`SessionEvent::Expired`] is
    /// published before the server is told about the logout, so dropping this
    /// future part-way through never loses the redirect. Only the first call
    /// after a session was established does anything, so concurrent failures
    /// produce a single [`SessionEvent::Expired`].
    pub async fn force_logout(&self) {
        if !self.session.begin_invalidation() {
            log::debug!("The session has already been invalidated");
            return;
        }

        log::info!("The session can't be refreshed, logging out");
        self.session.clear();
        self.session.publish(SessionEvent::Expired {
            redirect_to: self.config.entry_point.clone(),
        });

        self.tell_server_about_logout().await;
    }

    /// Ask the server who we are, remembering the answer.
    ///
    /// Not having a session is an expected state (e.g. on startup), so any
    /// failure just clears the stored identity and returns `None`.
    pub async fn fetch_current_user(&self) -> Option<CurrentUser> {
        match endpoints::current_user(self).await {
            Ok(user) => {
                self.session.sign_in(user.clone());
                Some(user)
            },
            Err(e) => {
                log::debug!("Unable to fetch the current user: {}", e);
                self.session.clear();
                None
            },
        }
    }

    /// Find out whether an existing session is still around when the
    /// application starts.
    pub async fn bootstrap(&self) -> Option<CurrentUser> {
        self.fetch_current_user().await
    }

    /// Exchange a username and password for a session, then fetch the user
    /// it belongs to.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<CurrentUser, LoginError> {
        endpoints::login(&self.plain, username, password).await?;
        self.session.reset_invalidation();

        self.fetch_current_user()
            .await
            .ok_or(LoginError::NoSession)
    }

    /// Sign out at the user's request.
    pub async fn logout(&self) {
        self.tell_server_about_logout().await;

        // a rejected request from here on shouldn't look like an expiry
        self.session.begin_invalidation();
        self.session.clear();
        log::info!("Logged out");
        self.session.publish(SessionEvent::SignedOut);
    }

    // best-effort, the local state gets cleared either way
    async fn tell_server_about_logout(&self) {
        let timeout = self.config.refresh_timeout;
        let logout = endpoints::logout(&self.plain);

        match tokio::time::timeout(timeout, logout).await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => {
                log::warn!("Unable to tell the server about the logout: {}", e)
            },
            Err(_) => log::warn!("The logout request timed out"),
        }
    }

    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> Result<Value, ClientError> {
        endpoints::update_profile(self, update).await
    }
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("config", &self.config)
            .field("session", &self.session)
            .finish()
    }
}

fn into_result(response: RawResponse) -> Result<RawResponse, ClientError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ClientError::Application {
            status: response.status,
            body: response.body,
        })
    }
}
