//! Out-of-band commands written as comments before a request, for instance
//! `# @cookie_storage_set:localhost FALSE / FALSE 0 id 42`.

use std::fmt;

use crate::http::{Cookie, HttpClient};

const CLEAR_COMMAND: &str = "# @cookie_storage_clear";
const SET_PREFIX: &str = "# @cookie_storage_set:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CookieStorageClear,
    CookieStorageSet {
        domain: String,
        include_subdomains: bool,
        path: String,
        http_only: bool,
        /// Seconds since the epoch; `0` for a session cookie.
        expires: u64,
        name: String,
        value: String,
    },
}

impl Command {
    /// Parses a comment line. Anything that is not a well-formed command,
    /// including a `cookie_storage_set` with the wrong token count, is `None`.
    pub fn parse(comment: &str) -> Option<Self> {
        if comment.trim() == CLEAR_COMMAND {
            return Some(Command::CookieStorageClear);
        }
        let args = comment.strip_prefix(SET_PREFIX)?;
        let tokens: Vec<&str> = args.split_whitespace().collect();
        let [domain, include_subdomains, path, http_only, expires, name, value] = tokens.as_slice()
        else {
            return None;
        };
        Some(Command::CookieStorageSet {
            domain: domain.to_string(),
            include_subdomains: *include_subdomains == "TRUE",
            path: path.to_string(),
            http_only: *http_only == "TRUE",
            expires: expires.parse().ok()?,
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    pub fn apply(&self, client: &mut dyn HttpClient) {
        match self {
            Command::CookieStorageClear => client.clear_cookie_storage(),
            Command::CookieStorageSet {
                domain,
                include_subdomains,
                path,
                http_only,
                expires,
                name,
                value,
            } => client.add_cookie(Cookie {
                domain: domain.clone(),
                include_subdomains: *include_subdomains,
                path: path.clone(),
                // the fourth Netscape field doubles as the secure flag
                secure: *http_only,
                expires: (*expires != 0).then_some(*expires),
                name: name.clone(),
                value: value.clone(),
            }),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::CookieStorageClear => write!(f, "cookie_storage_clear"),
            Command::CookieStorageSet {
                domain, path, name, ..
            } => write!(f, "cookie_storage_set({name} for {domain}{path})"),
        }
    }
}
