use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, watch};
use url::Url;

/// The identity associated with the active session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct CurrentUser {
    #[serde(default)]
    pub id: Option<u64>,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    /// A path to the user's avatar, relative to the API's base URL.
    #[serde(default)]
    pub profile_picture: Option<String>,
    /// Any other fields the server told us about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CurrentUser {
    pub fn new(username: impl Into<String>) -> Self {
        CurrentUser {
            id: None,
            username: username.into(),
            email: None,
            profile_picture: None,
            extra: Map::new(),
        }
    }

    /// Resolve [`CurrentUser::profile_picture`] against the API's base URL.
    pub fn profile_picture_url(&self, base_url: &Url) -> Option<Url> {
        let picture = self.profile_picture.as_deref()?;
        base_url.join(picture.trim_start_matches('/')).ok()
    }
}

/// What we currently know about the user's session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// We haven't asked the server yet.
    Loading,
    Authenticated(CurrentUser),
    Anonymous,
}

impl SessionState {
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Notifications the UI shell reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn(CurrentUser),
    /// The user asked to sign out.
    SignedOut,
    /// The session couldn't be repaired and the user should be sent back to
    /// `redirect_to`.
    Expired { redirect_to: String },
}

/// Process-wide record of who is signed in.
///
/// State changes are published on a [`watch`] channel, while one-off
/// notifications (like "navigate back to the login page") go out on a
/// [`broadcast`] channel so every subscriber sees each one exactly once.
#[derive(Debug)]
pub struct SessionStore {
    state: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    invalidated: AtomicBool,
}

impl SessionStore {
    const EVENT_BUFFER: usize = 16;

    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        let (events, _) = broadcast::channel(SessionStore::EVENT_BUFFER);

        SessionStore {
            state,
            events,
            invalidated: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SessionState { self.state.borrow().clone() }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.state.borrow().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().user().is_some()
    }

    /// Watch the session state, e.g. to guard protected pages.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Receive every [`SessionEvent`] published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Remember the user for a freshly established session.
    pub(crate) fn sign_in(&self, user: CurrentUser) {
        log::info!("Signed in as {}", user.username);

        self.reset_invalidation();
        let previous = self
            .state
            .send_replace(SessionState::Authenticated(user.clone()));

        if previous.user() != Some(&user) {
            self.publish(SessionEvent::SignedIn(user));
        }
    }

    /// Forget the current identity.
    pub(crate) fn clear(&self) {
        self.state.send_replace(SessionState::Anonymous);
    }

    /// Returns `true` for the first caller after a session was established,
    /// and `false` for everyone after that.
    pub(crate) fn begin_invalidation(&self) -> bool {
        self.invalidated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Allow the next forced logout to go through again, e.g. because a new
    /// session was just established.
    pub(crate) fn reset_invalidation(&self) {
        self.invalidated.store(false, Ordering::SeqCst);
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        log::debug!("Publishing {:?}", event);

        // nobody listening isn't an error
        let _ = self.events.send(event);
    }
}

impl Default for SessionStore {
    fn default() -> Self { SessionStore::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_current_user() {
        let src = include_str!("endpoints/current_user_okay.json");
        let mut should_be = CurrentUser::new("alice");
        should_be.id = Some(7);
        should_be.email = Some(String::from("alice@example.com"));
        should_be.profile_picture =
            Some(String::from("/media/profile_pictures/alice.png"));
        should_be
            .extra
            .insert(String::from("is_active"), Value::Bool(true));

        let got: CurrentUser = serde_json::from_str(src).unwrap();

        assert_eq!(got, should_be);
    }

    #[test]
    fn profile_pictures_are_relative_to_the_api() {
        let base = Url::parse("http://localhost:8000/").unwrap();
        let mut user = CurrentUser::new("alice");
        user.profile_picture = Some(String::from("/media/alice.png"));

        assert_eq!(
            user.profile_picture_url(&base).unwrap().as_str(),
            "http://localhost:8000/media/alice.png"
        );
        assert_eq!(CurrentUser::new("bob").profile_picture_url(&base), None);
    }

    #[test]
    fn the_store_starts_out_loading() {
        let store = SessionStore::new();

        assert_eq!(store.state(), SessionState::Loading);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn only_the_first_invalidation_wins() {
        let store = SessionStore::new();

        assert!(store.begin_invalidation());
        assert!(!store.begin_invalidation());

        store.sign_in(CurrentUser::new("alice"));
        assert!(store.begin_invalidation());
    }

    #[test]
    fn signing_in_notifies_subscribers() {
        let store = SessionStore::new();
        let mut events = store.subscribe();
        let alice = CurrentUser::new("alice");

        store.sign_in(alice.clone());
        store.sign_in(alice.clone());
        store.clear();

        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedIn(alice));
        assert!(events.try_recv().is_err());
        assert_eq!(store.state(), SessionState::Anonymous);
    }
}
