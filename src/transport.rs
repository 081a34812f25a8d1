use crate::{
    request::{Body, MultipartField, MultipartValue},
    ClientConfig, ClientError, RequestDescriptor,
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    header::HeaderMap,
    multipart::{Form, Part},
    Client, StatusCode,
};
use serde::de::DeserializeOwned;
use url::Url;

/// Something which can put a request on the wire.
///
/// Implementations hand back the response whatever its status, only failing
/// when no response was received at all.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        request: &RequestDescriptor,
    ) -> Result<RawResponse, ClientError>;
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        RawResponse {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool { self.status.is_success() }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).map_err(ClientError::from)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A [`Transport`] backed by [`reqwest`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        // the cookie jar is what carries our session between requests
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .cookie_store(config.with_credentials)
            .build()?;

        Ok(HttpTransport::with_client(client, config.base_url.clone()))
    }

    pub fn with_client(client: Client, base_url: Url) -> Self {
        HttpTransport { client, base_url }
    }

    pub fn base_url(&self) -> &Url { &self.base_url }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        request: &RequestDescriptor,
    ) -> Result<RawResponse, ClientError> {
        let url = self.base_url.join(&request.path)?;

        log::debug!("Sending a {} request to {}", request.method, url);
        log::trace!("Payload: {:#?}", request.body);

        let builder = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.clone());

        let builder = match &request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Form(pairs) => builder.form(pairs),
            Body::Multipart(fields) => {
                builder.multipart(multipart_form(fields)?)
            },
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        log::trace!("Headers: {:#?}", headers);

        let body = response.bytes().await?;
        log::trace!(
            "Response ({}): {}",
            status,
            String::from_utf8_lossy(&body)
        );

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

fn multipart_form(fields: &[MultipartField]) -> Result<Form, ClientError> {
    let mut form = Form::new();

    for field in fields {
        form = match &field.value {
            MultipartValue::Text(text) => {
                form.text(field.name.clone(), text.clone())
            },
            MultipartValue::File {
                file_name,
                mime_type,
                contents,
            } => {
                let part = Part::bytes(contents.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime_type)?;
                form.part(field.name.clone(), part)
            },
        };
    }

    Ok(form)
}
