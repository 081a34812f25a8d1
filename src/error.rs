use bytes::Bytes;
use reqwest::StatusCode;
use serde_json::Value;
use std::{collections::BTreeMap, error::Error as StdError, time::Duration};

const MESSAGE_KEYS: &[&str] = &["detail", "message", "error"];

/// Field names mapped to the messages the server attached to them.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Everything that can go wrong while talking to the blog API.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No response was received (connection refused, DNS, TLS, ...).
    #[error("Unable to send the request")]
    Transport(#[source] Box<dyn StdError + Send + Sync + 'static>),
    /// The server took longer than the configured limit to respond.
    #[error("No response after {0:?}")]
    TimedOut(Duration),
    /// The session was rejected and couldn't be repaired.
    #[error("Unauthorized: {0}")]
    Unauthorized(UnauthorizedReason),
    /// Any other non-success status, passed through untouched.
    #[error("The server responded with {}", status)]
    Application { status: StatusCode, body: Bytes },
    #[error("Unable to parse the response")]
    Decode(#[from] serde_json::Error),
    #[error("Unable to construct the request URL")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// The status code the server responded with, if there was a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Application { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }

    /// A human-readable message from the server, for bodies shaped like
    /// `{"detail": "..."}` or `{"message": "..."}`.
    pub fn detail(&self) -> Option<String> {
        let body = self.error_body()?;

        MESSAGE_KEYS
            .iter()
            .filter_map(|key| body.get(*key))
            .find_map(|value| value.as_str().map(String::from))
    }

    /// Field-level validation messages, when the server sent any.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        let body = self.error_body()?;

        let object = ["detail", "errors"]
            .iter()
            .filter_map(|key| body.get(*key))
            .find_map(Value::as_object)
            .or_else(|| body.as_object())?;

        let fields: FieldErrors = object
            .iter()
            .filter(|(field, _)| !MESSAGE_KEYS.contains(&field.as_str()))
            .filter_map(|(field, value)| {
                messages(value).map(|msgs| (field.clone(), msgs))
            })
            .collect();

        if fields.is_empty() {
            None
        } else {
            Some(fields)
        }
    }

    fn error_body(&self) -> Option<Value> {
        match self {
            ClientError::Application { body, .. } => {
                serde_json::from_slice(body).ok()
            },
            _ => None,
        }
    }
}

fn messages(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(msg) => Some(vec![msg.clone()]),
        Value::Array(items) => {
            let msgs: Vec<String> = items
                .iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect();

            if msgs.is_empty() {
                None
            } else {
                Some(msgs)
            }
        },
        _ => None,
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> ClientError {
        ClientError::Transport(Box::new(err))
    }
}

/// Why a request ended up [`ClientError::Unauthorized`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnauthorizedReason {
    /// The session expired and the refresh endpoint wouldn't renew it.
    RefreshFailed,
    /// The session was renewed but the retried request was still rejected.
    RejectedAfterRetry,
}

impl std::fmt::Display for UnauthorizedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnauthorizedReason::RefreshFailed => {
                write!(f, "the session could not be refreshed")
            },
            UnauthorizedReason::RejectedAfterRetry => {
                write!(f, "the request was rejected again after a refresh")
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application(status: u16, body: &'static str) -> ClientError {
        ClientError::Application {
            status: StatusCode::from_u16(status).unwrap(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn field_errors_from_nested_detail() {
        let err = application(
            400,
            r#"{"detail": {"username": ["already taken"], "email": "invalid"}}"#,
        );
        let mut should_be = FieldErrors::new();
        should_be.insert(String::from("email"), vec![String::from("invalid")]);
        should_be.insert(
            String::from("username"),
            vec![String::from("already taken")],
        );

        assert_eq!(err.field_errors(), Some(should_be));
        assert_eq!(err.detail(), None);
    }

    #[test]
    fn plain_detail_message() {
        let err = application(400, r#"{"detail": "Username is taken"}"#);

        assert_eq!(err.detail().as_deref(), Some("Username is taken"));
        assert_eq!(err.field_errors(), None);
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn non_json_bodies_have_no_detail() {
        let err = application(500, "<html>Internal Server Error</html>");

        assert_eq!(err.field_errors(), None);
        assert_eq!(err.detail(), None);
    }
}
