use reqwest::StatusCode;
use std::{collections::HashSet, time::Duration};
use url::Url;

/// How a client talks to the blog API.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// The API root. Endpoint paths are joined underneath it.
    pub base_url: Url,
    /// Keep cookies between requests so the session is attached
    /// automatically.
    pub with_credentials: bool,
    pub user_agent: String,
    /// Response statuses which mean "your session is no longer valid".
    pub refresh_statuses: HashSet<StatusCode>,
    pub request_timeout: Duration,
    pub refresh_timeout: Duration,
    /// Where the UI should send the user once their session is gone.
    pub entry_point: String,
}

impl ClientConfig {
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(base_url: Url) -> Self {
        ClientConfig {
            base_url: with_trailing_slash(base_url),
            with_credentials: true,
            user_agent: String::from(crate::DEFAULT_USER_AGENT),
            refresh_statuses: std::iter::once(StatusCode::FORBIDDEN).collect(),
            request_timeout: ClientConfig::DEFAULT_REQUEST_TIMEOUT,
            refresh_timeout: ClientConfig::DEFAULT_REFRESH_TIMEOUT,
            entry_point: String::from("/"),
        }
    }

    pub fn parse(base_url: &str) -> Result<Self, url::ParseError> {
        Url::parse(base_url).map(ClientConfig::new)
    }

    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = with_credentials;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Replace the set of statuses that trigger a session refresh.
    pub fn with_refresh_statuses<I>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = StatusCode>,
    {
        self.refresh_statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    pub fn triggers_refresh(&self, status: StatusCode) -> bool {
        self.refresh_statuses.contains(&status)
    }
}

// Url::join() replaces the last path segment unless the base ends in a "/"
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_always_ends_in_a_slash() {
        let config = ClientConfig::parse("http://localhost:8000/api").unwrap();

        assert_eq!(config.base_url.as_str(), "http://localhost:8000/api/");
        assert_eq!(
            config.base_url.join("auth/login").unwrap().as_str(),
            "http://localhost:8000/api/auth/login"
        );
    }

    #[test]
    fn only_forbidden_triggers_a_refresh_by_default() {
        let config = ClientConfig::parse("http://localhost:8000/").unwrap();

        assert!(config.triggers_refresh(StatusCode::FORBIDDEN));
        assert!(!config.triggers_refresh(StatusCode::UNAUTHORIZED));

        let config = config.with_refresh_statuses(vec![
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
        ]);
        assert!(config.triggers_refresh(StatusCode::UNAUTHORIZED));
    }
}
