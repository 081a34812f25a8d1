//! An in-memory [`Transport`] for exercising the client without a server.

use crate::{ClientError, RawResponse, RequestDescriptor, Transport};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

#[derive(Debug, Clone)]
enum Reply {
    Respond {
        status: StatusCode,
        body: String,
        delay: Option<Duration>,
    },
    Disconnect,
}

/// Replays canned responses, keyed by request path.
///
/// Replies queued for a path are handed out in order, and the last one keeps
/// being repeated. Paths without any replies get a `404`.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<(Method, String)>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> { Arc::new(ScriptedTransport::default()) }

    pub(crate) fn respond(&self, path: &str, status: u16, body: &str) {
        self.push(path, Reply::Respond {
            status: status_code(status),
            body: String::from(body),
            delay: None,
        });
    }

    pub(crate) fn respond_after(
        &self,
        path: &str,
        delay: Duration,
        status: u16,
        body: &str,
    ) {
        self.push(path, Reply::Respond {
            status: status_code(status),
            body: String::from(body),
            delay: Some(delay),
        });
    }

    /// Fail the next request to `path` without a response.
    pub(crate) fn disconnect(&self, path: &str) {
        self.push(path, Reply::Disconnect);
    }

    pub(crate) fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, p)| p == path)
            .count()
    }

    fn push(&self, path: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(String::from(path))
            .or_default()
            .push_back(reply);
    }

    fn next_reply(&self, path: &str) -> Option<Reply> {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(path)?;

        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(
        &self,
        request: &RequestDescriptor,
    ) -> Result<RawResponse, ClientError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.method.clone(), request.path.clone()));

        match self.next_reply(&request.path) {
            Some(Reply::Respond {
                status,
                body,
                delay,
            }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(RawResponse::new(status, body))
            },
            Some(Reply::Disconnect) => {
                Err(ClientError::Transport(Box::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                ))))
            },
            None => Ok(RawResponse::new(StatusCode::NOT_FOUND, "")),
        }
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).expect("a valid status code")
}
