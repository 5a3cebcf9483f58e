//! Shared helpers for the integration tests.

use std::collections::HashMap;

use hurlite::http::{Cookie, HttpClient, HttpError, HttpRequest, HttpResponse};

/// Transport answering by URL, recording every request it receives.
#[derive(Default)]
pub struct StubClient {
    routes: HashMap<String, HttpResponse>,
    pub requests: Vec<HttpRequest>,
    pub cookies: Vec<Cookie>,
}

#[allow(dead_code)]
impl StubClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, response: HttpResponse) -> Self {
        self.routes.insert(url.to_string(), response);
        self
    }
}

impl HttpClient for StubClient {
    fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        self.requests.push(request.clone());
        self.routes.get(&request.url).cloned().ok_or_else(|| HttpError::Transport {
            url: request.url.clone(),
            message: "connection refused".to_string(),
        })
    }

    fn add_cookie(&mut self, cookie: Cookie) {
        self.cookies.push(cookie);
    }

    fn clear_cookie_storage(&mut self) {
        self.cookies.clear();
    }
}
