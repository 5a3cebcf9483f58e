//! Cookie storage shared by every request of a run.

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Url;

/// A stored cookie, in the Netscape cookie file model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    /// Expiry as seconds since the epoch; `None` for a session cookie.
    pub expires: Option<u64>,
    pub name: String,
    pub value: String,
}

impl Cookie {
    fn is_expired(&self, now: u64) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    fn matches(&self, url: &Url, now: u64) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let domain = self.domain.trim_start_matches('.');
        let host = host.to_ascii_lowercase();
        let domain = domain.to_ascii_lowercase();
        let domain_match =
            host == domain || (self.include_subdomains && host.ends_with(&format!(".{domain}")));
        domain_match
            && path_matches(url.path(), &self.path)
            && (!self.secure || url.scheme() == "https")
            && !self.is_expired(now)
    }
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path || cookie_path.is_empty() {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

/// A parsed `Set-Cookie` header value. Attribute names are lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub attributes: Vec<(String, Option<String>)>,
}

impl SetCookie {
    /// Returns `None` when the first pair has no `=`.
    pub fn parse(header: &str) -> Option<Self> {
        let mut tokens = header.split(';');
        let (name, value) = tokens.next()?.split_once('=')?;
        let unquote = |s: &str| s.trim().trim_matches(|c| c == '"' || c == '\'').to_string();
        let attributes = tokens
            .map(|token| match token.split_once('=') {
                Some((key, value)) => (
                    key.trim().to_ascii_lowercase(),
                    Some(value.trim().to_string()),
                ),
                None => (token.trim().to_ascii_lowercase(), None),
            })
            .filter(|(key, _)| !key.is_empty())
            .collect();
        Some(Self {
            name: unquote(name),
            value: unquote(value),
            attributes,
        })
    }

    /// `Some(None)` for a flag attribute such as `Secure`.
    pub fn attribute(&self, name: &str) -> Option<Option<&str>> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_deref())
    }

    /// Cookie to store for a response received from `url`.
    fn into_cookie(self, url: &Url, now: u64) -> Cookie {
        let domain_attribute = self
            .attribute("domain")
            .flatten()
            .map(|d| d.trim_start_matches('.').to_string());
        let include_subdomains = domain_attribute.is_some();
        let domain =
            domain_attribute.unwrap_or_else(|| url.host_str().unwrap_or_default().to_string());
        let path = match self.attribute("path").flatten() {
            Some(path) if path.starts_with('/') => path.to_string(),
            _ => default_path(url.path()),
        };
        let max_age = self
            .attribute("max-age")
            .flatten()
            .and_then(|v| v.parse::<i64>().ok());
        let expires = match max_age {
            Some(age) if age <= 0 => Some(0),
            Some(age) => Some(now.saturating_add(age.unsigned_abs())),
            None => self.attribute("expires").flatten().and_then(parse_http_date),
        };
        Cookie {
            domain,
            include_subdomains,
            path,
            secure: self.attribute("secure").is_some(),
            expires,
            name: self.name,
            value: self.value,
        }
    }
}

fn default_path(request_path: &str) -> String {
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => request_path[..index].to_string(),
    }
}

/// Parses an IMF-fixdate such as `Wed, 21 Oct 2015 07:28:00 GMT`.
pub fn parse_http_date(text: &str) -> Option<u64> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let rest = text.split_once(',').map_or(text, |(_, rest)| rest);
    let parts: Vec<&str> = rest
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|p| !p.is_empty())
        .collect();
    let [day, month, year, time, ..] = parts.as_slice() else {
        return None;
    };
    let day: i64 = day.parse().ok()?;
    let month = MONTHS.iter().position(|m| month.eq_ignore_ascii_case(m))? as i64 + 1;
    let mut year: i64 = year.parse().ok()?;
    if year < 100 {
        year += if year < 70 { 2000 } else { 1900 };
    }
    let mut hms = time.split(':').map(|v| v.parse::<i64>().ok());
    let (h, m, s) = (hms.next()??, hms.next()??, hms.next()??);

    // days from civil, proleptic Gregorian
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    let days = era * 146_097 + doe - 719_468;

    u64::try_from(days * 86_400 + h * 3600 + m * 60 + s).ok()
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default)]
pub struct CookieStore {
    cookies: Vec<Cookie>,
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the cookie with the same domain, path and name.
    pub fn add(&mut self, cookie: Cookie) {
        self.cookies.retain(|c| {
            !(c.domain == cookie.domain && c.path == cookie.path && c.name == cookie.name)
        });
        if !cookie.is_expired(now()) {
            self.cookies.push(cookie);
        }
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Stores every `Set-Cookie` value received from `url`.
    pub fn store_response<'a>(
        &mut self,
        url: &Url,
        set_cookies: impl IntoIterator<Item = &'a str>,
    ) {
        let now = now();
        for header in set_cookies {
            match SetCookie::parse(header) {
                Some(set_cookie) => {
                    let cookie = set_cookie.into_cookie(url, now);
                    tracing::debug!("Storing cookie {} for {}", cookie.name, cookie.domain);
                    self.add(cookie);
                }
                None => tracing::warn!("Ignoring invalid Set-Cookie header: {header}"),
            }
        }
    }

    /// Name/value pairs to send to `url`.
    pub fn matching(&self, url: &Url) -> Vec<(&str, &str)> {
        let now = now();
        self.cookies
            .iter()
            .filter(|c| c.matches(url, now))
            .map(|c| (c.name.as_str(), c.value.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(text: &str) -> Url {
        Url::parse(text).unwrap()
    }

    #[test]
    fn set_cookie_should_parse_attributes() {
        let cookie = SetCookie::parse("LSID=\"DQAAAK\"; Path=/accounts; Secure; HttpOnly; SameSite=Lax").unwrap();
        assert_eq!(cookie.name, "LSID");
        assert_eq!(cookie.value, "DQAAAK");
        assert_eq!(cookie.attribute("path"), Some(Some("/accounts")));
        assert_eq!(cookie.attribute("secure"), Some(None));
        assert_eq!(cookie.attribute("samesite"), Some(Some("Lax")));
        assert_eq!(cookie.attribute("domain"), None);
    }

    #[test]
    fn set_cookie_should_reject_missing_value_pair() {
        assert!(SetCookie::parse("garbage").is_none());
    }

    #[test]
    fn parse_http_date_should_read_imf_fixdate() {
        assert_eq!(parse_http_date("Wed, 21 Oct 2015 07:28:00 GMT"), Some(1_445_412_480));
        assert_eq!(parse_http_date("Thu, 01 Jan 1970 00:00:00 GMT"), Some(0));
        assert_eq!(parse_http_date("yesterday"), None);
    }

    #[test]
    fn store_should_send_cookies_matching_domain_and_path() {
        let mut store = CookieStore::new();
        store.store_response(
            &url("http://api.example.com/users/1"),
            [
                "id=1; Path=/users",
                "theme=dark; Domain=example.com; Path=/",
                "gone=x; Max-Age=0",
            ],
        );
        assert_eq!(
            store.matching(&url("http://api.example.com/users/2")),
            vec![("id", "1"), ("theme", "dark")]
        );
        assert_eq!(store.matching(&url("http://www.example.com/")), vec![("theme", "dark")]);
        assert!(store.matching(&url("http://other.org/")).is_empty());
    }

    #[test]
    fn store_should_keep_secure_cookies_off_plain_http() {
        let mut store = CookieStore::new();
        store.add(Cookie {
            domain: "localhost".to_string(),
            include_subdomains: false,
            path: "/".to_string(),
            secure: true,
            expires: None,
            name: "s".to_string(),
            value: "1".to_string(),
        });
        assert!(store.matching(&url("http://localhost/")).is_empty());
        assert_eq!(store.matching(&url("https://localhost/")), vec![("s", "1")]);
    }

    #[test]
    fn path_matches_should_require_segment_boundary() {
        assert!(path_matches("/docs/a", "/docs"));
        assert!(path_matches("/docs/", "/docs/"));
        assert!(!path_matches("/docsearch", "/docs"));
    }
}
