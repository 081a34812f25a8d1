use crate::{ClientError, RequestDescriptor, UnauthenticatedClient};
use serde_derive::Serialize;

/// Create a new account.
///
/// Validation failures (username taken, bad email, ...) come back as a
/// [`ClientError::Application`], see [`ClientError::field_errors()`].
pub async fn register(
    client: &UnauthenticatedClient,
    registration: &Registration,
) -> Result<(), ClientError> {
    log::debug!("Registering {}", registration.username);

    let request = RequestDescriptor::post("auth/register").json(registration)?;
    let response = client.send(&request).await?;
    log::trace!("Response: {}", response.text());

    log::info!("Registered {}", registration.username);
    Ok(())
}

#[derive(Clone, PartialEq, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedTransport;
    use reqwest::StatusCode;

    #[tokio::test]
    async fn validation_errors_are_reported_per_field() {
        let transport = ScriptedTransport::new();
        transport.respond(
            "auth/register",
            422,
            include_str!("register_validation_error.json"),
        );
        let client = UnauthenticatedClient::new(transport);
        let registration = Registration {
            username: String::from("alice"),
            email: String::from("not-an-email"),
            password: String::from("hunter2"),
        };

        let err = register(&client, &registration).await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
        let fields = err.field_errors().unwrap();
        assert_eq!(fields["email"], vec![String::from("Enter a valid email")]);
        assert_eq!(
            fields["username"],
            vec![String::from("This username is already taken")]
        );
    }
}
