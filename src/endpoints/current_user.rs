use crate::{AuthenticatedClient, ClientError, CurrentUser, RequestDescriptor};

/// Ask the server who the active session belongs to.
///
/// Most callers want [`AuthenticatedClient::fetch_current_user()`], which
/// also updates the session store.
pub async fn current_user(
    client: &AuthenticatedClient,
) -> Result<CurrentUser, ClientError> {
    let request = RequestDescriptor::get("user_routes/user");
    let response = client.send(&request).await?;
    log::trace!("Response: {}", response.text());

    let user: CurrentUser = response.json()?;
    log::trace!("Parsed response: {:#?}", user);

    Ok(user)
}
