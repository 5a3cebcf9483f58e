//! # HTTP Transport
//!
//! Rendered requests, received responses and the [`HttpClient`] seam the
//! runner executes them through. [`ReqwestClient`] is the production client;
//! tests substitute their own implementation.

mod client;
mod cookie;
mod encoding;

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

pub use client::{ClientOptions, ReqwestClient};
pub use cookie::{Cookie, CookieStore, SetCookie};
pub use encoding::ContentEncoding;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("invalid url <{0}>")]
    InvalidUrl(String),
    #[error("could not build http client: {0}")]
    Client(String),
    #[error("request to <{url}> failed: {message}")]
    Transport { url: String, message: String },
    #[error("request to <{0}> timed out")]
    Timeout(String),
    #[error("too many redirects ({0})")]
    TooManyRedirects(usize),
    #[error("unsupported content encoding {0}")]
    UnsupportedContentEncoding(String),
    #[error("could not decompress body: {0}")]
    Decompression(String),
    #[error("unknown charset {0}")]
    UnknownCharset(String),
    #[error("body can not be decoded with charset {0}")]
    InvalidText(String),
}

/// A part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        data: Vec<u8>,
        content_type: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
    pub data: Vec<u8>,
    /// Implicit content type, used when the request has no explicit header.
    pub content_type: Option<String>,
}

/// A fully rendered request, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query_params: Vec<(String, String)>,
    pub form_params: Vec<(String, String)>,
    pub multipart: Vec<MultipartPart>,
    pub cookies: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http10,
    Http11,
    Http2,
    Http3,
}

impl HttpVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::Http11 => "HTTP/1.1",
            HttpVersion::Http2 => "HTTP/2",
            HttpVersion::Http3 => "HTTP/3",
        }
    }
}

impl std::fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub version: HttpVersion,
    pub status: u16,
    /// Headers in received order; names keep their original case.
    pub headers: Vec<(String, String)>,
    /// Body as received, before any content decoding.
    pub body: Bytes,
    pub duration: Duration,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            version: HttpVersion::Http11,
            status,
            headers: Vec::new(),
            body: Bytes::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Values of every header named `name`, compared case-insensitively.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header_values("Content-Type").into_iter().next()
    }

    /// Body with every `Content-Encoding` undone.
    pub fn uncompressed_body(&self) -> Result<Vec<u8>, HttpError> {
        let encodings = self
            .header_values("Content-Encoding")
            .into_iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ContentEncoding::parse)
            .collect::<Result<Vec<_>, _>>()?;
        encoding::decode_all(&self.body, &encodings)
    }

    /// Decoded body text, using the charset of `Content-Type` (UTF-8 when
    /// absent).
    pub fn text(&self) -> Result<String, HttpError> {
        let body = self.uncompressed_body()?;
        encoding::decode_text(&body, self.content_type())
    }
}

/// Transport used by the runner. One client serves a whole run and keeps
/// its cookie storage across requests.
pub trait HttpClient {
    fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse, HttpError>;

    fn add_cookie(&mut self, cookie: Cookie);

    fn clear_cookie_storage(&mut self);
}
