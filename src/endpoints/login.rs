use crate::{ClientError, RequestDescriptor, UnauthenticatedClient};
use serde_derive::{Deserialize, Serialize};

/// Exchange a username and password for a session.
///
/// The session itself travels in a cookie, the response only tells us
/// whether one was established. This doesn't touch any [`SessionStore`], so
/// prefer [`AuthenticatedClient::login()`] which also re-arms forced logouts
/// after a previous sign out.
///
/// [`SessionStore`]: crate::SessionStore
/// [`AuthenticatedClient::login()`]: crate::AuthenticatedClient::login
pub async fn login(
    client: &UnauthenticatedClient,
    username: &str,
    password: &str,
) -> Result<LoginResponse, LoginError> {
    let data = Data { username, password };
    log::debug!("Logging in as {}", username);

    let request = RequestDescriptor::post("auth/login")
        .json(&data)
        .map_err(ClientError::from)?;
    let response = client.send(&request).await?;
    log::trace!("Response: {}", response.text());

    let login: LoginResponse = response.json()?;
    interpret_response(login)
}

fn interpret_response(
    response: LoginResponse,
) -> Result<LoginResponse, LoginError> {
    match response.access_token {
        Some(ref token) if !token.is_empty() => Ok(response),
        _ => {
            log::error!("The login response didn't contain an access token");
            Err(LoginError::MissingAccessToken)
        },
    }
}

/// What the server sends back after a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

// the password must never end up in the logs
#[derive(Copy, Clone, Serialize)]
struct Data<'a> {
    username: &'a str,
    password: &'a str,
}

/// Possible errors that may be returned by [`login()`].
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// The request failed or the server rejected the credentials.
    #[error("Unable to log in")]
    HttpClient(#[from] ClientError),
    /// The server accepted the request but didn't say a session was created.
    #[error("Invalid response from server")]
    MissingAccessToken,
    /// We logged in, but the server wouldn't tell us who we are.
    #[error("Logged in, but no session was established")]
    NoSession,
}
