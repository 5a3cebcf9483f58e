use std::time::{Duration, Instant};

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::redirect::Policy;
use reqwest::{Method, Proxy, Url};

use super::{
    Cookie, CookieStore, HttpClient, HttpError, HttpRequest, HttpResponse, HttpVersion,
    MultipartPart,
};
use crate::config;

const MAX_REDIRECTS: usize = 50;
const ACCEPT_ENCODING: &str = "gzip, deflate, zstd";

/// Transport settings shared by every request of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub proxy: Option<String>,
    pub insecure: bool,
    pub follow_location: bool,
    /// Basic authentication as `user:password`.
    pub user: Option<String>,
    pub connect_timeout: Duration,
    pub max_time: Option<Duration>,
    pub compressed: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            proxy: None,
            insecure: false,
            follow_location: false,
            user: None,
            connect_timeout: config::DEFAULT_CONNECT_TIMEOUT,
            max_time: None,
            compressed: false,
        }
    }
}

/// [`HttpClient`] backed by a blocking reqwest client. Redirects and cookies
/// are handled here rather than by reqwest so that cookies set by
/// intermediate responses are kept.
pub struct ReqwestClient {
    client: Client,
    options: ClientOptions,
    cookies: CookieStore,
}

impl ReqwestClient {
    pub fn new(options: ClientOptions) -> Result<Self, HttpError> {
        let mut builder = Client::builder()
            .redirect(Policy::none())
            .connect_timeout(options.connect_timeout)
            .danger_accept_invalid_certs(options.insecure)
            .user_agent(config::user_agent());
        if let Some(max_time) = options.max_time {
            builder = builder.timeout(max_time);
        }
        if let Some(proxy) = &options.proxy {
            let proxy =
                Proxy::all(proxy.as_str()).map_err(|e| HttpError::Client(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;
        tracing::debug!("Created HTTP client with {:?}", options);
        Ok(Self {
            client,
            options,
            cookies: CookieStore::new(),
        })
    }

    pub fn cookies(&self) -> &CookieStore {
        &self.cookies
    }

    /// Builds one hop of `request`. Hops after a redirect drop the body.
    fn build(
        &self,
        method: Method,
        url: &Url,
        request: &HttpRequest,
        first: bool,
    ) -> Result<RequestBuilder, HttpError> {
        let mut builder = self.client.request(method, url.clone());
        for (name, value) in &request.headers {
            if !first && is_body_header(name) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut cookies: Vec<String> = self
            .cookies
            .matching(url)
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        if first {
            cookies.extend(
                request
                    .cookies
                    .iter()
                    .map(|(name, value)| format!("{name}={value}")),
            );
        }
        if !cookies.is_empty() {
            builder = builder.header("Cookie", cookies.join("; "));
        }

        if self.options.compressed && !request.has_header("Accept-Encoding") {
            builder = builder.header("Accept-Encoding", ACCEPT_ENCODING);
        }
        if let Some(user) = &self.options.user {
            let (name, password) = match user.split_once(':') {
                Some((name, password)) => (name, Some(password)),
                None => (user.as_str(), None),
            };
            builder = builder.basic_auth(name, password);
        }
        if !first {
            return Ok(builder);
        }

        if !request.form_params.is_empty() {
            builder = builder.form(&request.form_params);
        } else if !request.multipart.is_empty() {
            builder = builder.multipart(multipart_form(&request.multipart)?);
        } else if let Some(body) = &request.body {
            match &body.content_type {
                Some(content_type) if !request.has_header("Content-Type") => {
                    builder = builder.header("Content-Type", content_type.as_str());
                }
                _ => {}
            }
            builder = builder.body(body.data.clone());
        }
        Ok(builder)
    }
}

fn is_body_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("Content-Type") || name.eq_ignore_ascii_case("Content-Length")
}

fn multipart_form(parts: &[MultipartPart]) -> Result<Form, HttpError> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            MultipartPart::Text { name, value } => form.text(name.clone(), value.clone()),
            MultipartPart::File {
                name,
                filename,
                data,
                content_type,
            } => {
                let mut file = Part::bytes(data.clone()).file_name(filename.clone());
                if let Some(content_type) = content_type {
                    file = file
                        .mime_str(content_type)
                        .map_err(|e| HttpError::Client(e.to_string()))?;
                }
                form.part(name.clone(), file)
            }
        };
    }
    Ok(form)
}

fn request_url(request: &HttpRequest) -> Result<Url, HttpError> {
    let mut url =
        Url::parse(&request.url).map_err(|_| HttpError::InvalidUrl(request.url.clone()))?;
    if !request.query_params.is_empty() {
        url.query_pairs_mut().extend_pairs(&request.query_params);
    }
    Ok(url)
}

fn http_version(version: reqwest::Version) -> HttpVersion {
    if version == reqwest::Version::HTTP_2 {
        HttpVersion::Http2
    } else if version == reqwest::Version::HTTP_3 {
        HttpVersion::Http3
    } else if version == reqwest::Version::HTTP_11 {
        HttpVersion::Http11
    } else {
        HttpVersion::Http10
    }
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

impl HttpClient for ReqwestClient {
    fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let start = Instant::now();
        let mut url = request_url(request)?;
        let mut method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| HttpError::Client(e.to_string()))?;
        let mut redirects = 0;

        loop {
            tracing::debug!("{} {}", method, url);
            let builder = self.build(method.clone(), &url, request, redirects == 0)?;
            let response = builder.send().map_err(|e| {
                if e.is_timeout() {
                    HttpError::Timeout(url.to_string())
                } else {
                    HttpError::Transport {
                        url: url.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

            let status = response.status().as_u16();
            let version = http_version(response.version());
            let headers: Vec<(String, String)> = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let body = response.bytes().map_err(|e| HttpError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;
            let response = HttpResponse {
                version,
                status,
                headers,
                body,
                duration: start.elapsed(),
            };
            tracing::debug!("{} {} ({} bytes)", response.version, status, response.body.len());
            self.cookies
                .store_response(&url, response.header_values("Set-Cookie"));

            let location = response.header_values("Location").into_iter().next();
            match location {
                Some(location) if self.options.follow_location && is_redirect(status) => {
                    redirects += 1;
                    if redirects > MAX_REDIRECTS {
                        return Err(HttpError::TooManyRedirects(MAX_REDIRECTS));
                    }
                    url = url
                        .join(location)
                        .map_err(|_| HttpError::InvalidUrl(location.to_string()))?;
                    method = Method::GET;
                }
                _ => return Ok(response),
            }
        }
    }

    fn add_cookie(&mut self, cookie: Cookie) {
        self.cookies.add(cookie);
    }

    fn clear_cookie_storage(&mut self) {
        self.cookies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RequestBody;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serves the given raw responses, one per connection, and returns the
    /// received request heads.
    fn serve(responses: Vec<&'static str>) -> (String, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let mut requests = Vec::new();
            for response in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut head = String::new();
                let mut content_length = 0;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                        content_length = value.trim().parse().unwrap();
                    }
                    if line == "\r\n" || line.is_empty() {
                        break;
                    }
                    head.push_str(&line);
                }
                let mut body = vec![0; content_length];
                reader.read_exact(&mut body).unwrap();
                head.push_str(&String::from_utf8_lossy(&body));
                requests.push(head);
                stream.write_all(response.as_bytes()).unwrap();
            }
            requests
        });
        (address, handle)
    }

    #[test]
    fn execute_should_send_request_and_read_response() {
        let (address, handle) = serve(vec![
            "HTTP/1.1 201 Created\r\nX-Id: 42\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
        ]);
        let mut client = ReqwestClient::new(ClientOptions::default()).unwrap();
        let mut request = HttpRequest::new("POST", format!("{address}/items"));
        request.query_params.push(("q".to_string(), "a b".to_string()));
        request.body = Some(RequestBody {
            data: b"{\"a\":1}".to_vec(),
            content_type: Some("application/json".to_string()),
        });

        let response = client.execute(&request).unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.header_values("x-id"), vec!["42"]);
        assert_eq!(&response.body[..], b"ok");

        let received = handle.join().unwrap();
        assert!(received[0].starts_with("POST /items?q=a+b HTTP/1.1"));
        assert!(received[0].to_ascii_lowercase().contains("content-type: application/json"));
        assert!(received[0].ends_with("{\"a\":1}"));
    }

    #[test]
    fn execute_should_follow_redirect_and_keep_cookies() {
        let (address, handle) = serve(vec![
            "HTTP/1.1 302 Found\r\nLocation: /next\r\nSet-Cookie: sid=abc; Path=/\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            "HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\ndone",
        ]);
        let options = ClientOptions {
            follow_location: true,
            ..Default::default()
        };
        let mut client = ReqwestClient::new(options).unwrap();
        let response = client
            .execute(&HttpRequest::new("GET", format!("{address}/start")))
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(&response.body[..], b"done");

        let received = handle.join().unwrap();
        assert!(received[1].starts_with("GET /next HTTP/1.1"));
        assert!(received[1].contains("sid=abc"));
    }

    #[test]
    fn execute_should_fail_on_invalid_url() {
        let mut client = ReqwestClient::new(ClientOptions::default()).unwrap();
        let result = client.execute(&HttpRequest::new("GET", "not a url"));
        assert_eq!(result, Err(HttpError::InvalidUrl("not a url".to_string())));
    }

    #[test]
    fn clear_cookie_storage_should_drop_added_cookies() {
        let mut client = ReqwestClient::new(ClientOptions::default()).unwrap();
        client.add_cookie(Cookie {
            domain: "localhost".to_string(),
            include_subdomains: false,
            path: "/".to_string(),
            secure: false,
            expires: None,
            name: "a".to_string(),
            value: "1".to_string(),
        });
        assert_eq!(client.cookies().cookies().len(), 1);
        client.clear_cookie_storage();
        assert!(client.cookies().cookies().is_empty());
    }
}
