//! The blog API's endpoints.
//!
//! Session management endpoints go through an [`UnauthenticatedClient`],
//! everything else goes through an [`AuthenticatedClient`] so an expired
//! session gets refreshed transparently.
//!
//! [`UnauthenticatedClient`]: crate::UnauthenticatedClient
//! [`AuthenticatedClient`]: crate::AuthenticatedClient

mod current_user;
mod login;
mod logout;
mod profile;
mod refresh;
mod register;

pub use current_user::current_user;
pub use login::{login, LoginError, LoginResponse};
pub use logout::logout;
pub use profile::{update_profile, ProfilePicture, ProfileUpdate};
pub use refresh::refresh;
pub use register::{register, Registration};

/// An empty JSON object, for `POST`s which don't need a payload.
fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}
