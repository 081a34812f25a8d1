//! A session-aware client for the blog application's HTTP API.
//!
//! The interesting part is [`AuthenticatedClient`], which attaches the
//! session to every request and quietly refreshes it when the server says it
//! has expired.

#![forbid(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod client;
mod config;
pub mod endpoints;
mod error;
mod refresh;
mod request;
mod session;
#[cfg(test)]
mod test_utils;
mod transport;

pub use client::{AuthenticatedClient, UnauthenticatedClient};
pub use config::ClientConfig;
pub use error::{ClientError, FieldErrors, UnauthorizedReason};
pub use refresh::{Flight, RefreshCoordinator, RefreshOutcome, SingleFlight};
pub use request::{Body, MultipartField, MultipartValue, RequestDescriptor};
pub use session::{CurrentUser, SessionEvent, SessionState, SessionStore};
pub use transport::{HttpTransport, RawResponse, Transport};

/// The default user agent to use when communicating with the blog API.
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));
