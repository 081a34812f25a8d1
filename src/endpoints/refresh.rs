use crate::{ClientError, RequestDescriptor, UnauthenticatedClient};

/// Exchange the current (possibly stale) session for a renewed one.
///
/// The renewed session arrives as a cookie, so there's nothing to return.
/// Use [`RefreshCoordinator`](crate::RefreshCoordinator) rather than calling
/// this directly when requests may be running concurrently.
pub async fn refresh(
    client: &UnauthenticatedClient,
) -> Result<(), ClientError> {
    let request =
        RequestDescriptor::post("auth/refresh").json(&super::empty_object())?;

    log::debug!("Sending a refresh request");
    let response = client.send(&request).await?;
    log::trace!("Response: {}", response.text());

    Ok(())
}
