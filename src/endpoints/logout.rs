use crate::{ClientError, RequestDescriptor, UnauthenticatedClient};

/// Tell the server to invalidate the current session.
pub async fn logout(client: &UnauthenticatedClient) -> Result<(), ClientError> {
    let request =
        RequestDescriptor::post("auth/logout").json(&super::empty_object())?;

    log::debug!("Sending a logout request");
    client.send(&request).await?;
    log::debug!("Logged out successfully");

    Ok(())
}
