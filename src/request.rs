use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method,
};
use serde::Serialize;
use serde_json::Value;

/// Everything needed to (re-)issue a request.
///
/// Credentials are never part of the descriptor, the transport attaches them.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// A path relative to the API's base URL (e.g. `auth/login`).
    pub path: String,
    pub headers: HeaderMap,
    pub body: Body,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        RequestDescriptor {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        RequestDescriptor::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        RequestDescriptor::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        RequestDescriptor::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        RequestDescriptor::new(Method::DELETE, path)
    }

    pub fn json<T: Serialize + ?Sized>(
        mut self,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        self.body = Body::Json(serde_json::to_value(payload)?);
        Ok(self)
    }

    pub fn form(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = Body::Form(pairs);
        self
    }

    pub fn multipart(mut self, fields: Vec<MultipartField>) -> Self {
        self.body = Body::Multipart(fields);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A request body which can be replayed as many times as necessary.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    Multipart(Vec<MultipartField>),
}

/// One named field in a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartField {
    pub name: String,
    pub value: MultipartValue,
}

impl MultipartField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        MultipartField {
            name: name.into(),
            value: MultipartValue::Text(value.into()),
        }
    }

    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        contents: Vec<u8>,
    ) -> Self {
        MultipartField {
            name: name.into(),
            value: MultipartValue::File {
                file_name: file_name.into(),
                mime_type: mime_type.into(),
                contents,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MultipartValue {
    Text(String),
    File {
        file_name: String,
        mime_type: String,
        contents: Vec<u8>,
    },
}

/// Has this request already been retried after a session refresh?
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Attempt {
    Fresh,
    Retried,
}
