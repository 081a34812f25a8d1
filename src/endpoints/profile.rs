use crate::{
    request::MultipartField, AuthenticatedClient, ClientError,
    RequestDescriptor,
};
use serde_json::Value;

/// Update the signed-in user's profile.
///
/// Returns whatever the server sent back (typically the updated fields). An
/// empty body is [`Value::Null`] and a body which isn't JSON comes back as a
/// [`Value::String`].
///
/// Validation failures are surfaced as a [`ClientError::Application`] so the
/// caller can show [`ClientError::field_errors()`] next to each field.
pub async fn update_profile(
    client: &AuthenticatedClient,
    update: &ProfileUpdate,
) -> Result<Value, ClientError> {
    log::debug!("Updating the profile for {}", update.username);

    let request =
        RequestDescriptor::put("user_routes/update").multipart(update.fields());
    let response = client.send(&request).await?;
    log::trace!("Response: {}", response.text());

    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    Ok(response
        .json()
        .unwrap_or_else(|_| Value::String(response.text())))
}

/// The fields a user can change about themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    /// A new avatar, if the user picked one.
    pub profile_picture: Option<ProfilePicture>,
}

impl ProfileUpdate {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        ProfileUpdate {
            username: username.into(),
            email: email.into(),
            profile_picture: None,
        }
    }

    pub fn with_picture(mut self, picture: ProfilePicture) -> Self {
        self.profile_picture = Some(picture);
        self
    }

    fn fields(&self) -> Vec<MultipartField> {
        let mut fields = vec![
            MultipartField::text("username", self.username.as_str()),
            MultipartField::text("email", self.email.as_str()),
        ];

        if let Some(picture) = &self.profile_picture {
            fields.push(MultipartField::file(
                "profile_picture",
                picture.file_name.as_str(),
                picture.mime_type.as_str(),
                picture.contents.clone(),
            ));
        }

        fields
    }
}

#[derive(Clone, PartialEq)]
pub struct ProfilePicture {
    pub file_name: String,
    pub mime_type: String,
    pub contents: Vec<u8>,
}

impl ProfilePicture {
    /// Guess the mime type from the file's extension.
    pub fn from_file_name(
        file_name: impl Into<String>,
        contents: Vec<u8>,
    ) -> Self {
        let file_name = file_name.into();
        let extension = file_name
            .rsplit('.')
            .next()
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let mime_type = match extension.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        };

        ProfilePicture {
            file_name,
            mime_type: String::from(mime_type),
            contents,
        }
    }
}

impl std::fmt::Debug for ProfilePicture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfilePicture")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.contents.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Body, MultipartValue};

    #[test]
    fn pictures_are_sent_as_file_parts() {
        let picture = ProfilePicture::from_file_name("me.PNG", vec![1, 2, 3]);
        let update = ProfileUpdate::new("alice", "alice@example.com")
            .with_picture(picture);

        let request = RequestDescriptor::put("user_routes/update")
            .multipart(update.fields());

        let fields = match request.body {
            Body::Multipart(fields) => fields,
            other => panic!("Expected a multipart body, got {:?}", other),
        };
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], MultipartField::text("username", "alice"));
        assert_eq!(
            fields[2].value,
            MultipartValue::File {
                file_name: String::from("me.PNG"),
                mime_type: String::from("image/png"),
                contents: vec![1, 2, 3],
            }
        );
    }

    #[test]
    fn no_picture_means_no_file_part() {
        let update = ProfileUpdate::new("alice", "alice@example.com");

        let names: Vec<_> =
            update.fields().into_iter().map(|field| field.name).collect();

        assert_eq!(names, vec!["username", "email"]);
    }
}
