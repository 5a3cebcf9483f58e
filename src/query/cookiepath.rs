use super::{QueryError, QueryResult};
use crate::http::SetCookie;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attribute {
    Value,
    Expires,
    MaxAge,
    Domain,
    Path,
    Secure,
    HttpOnly,
    SameSite,
}

/// Parses `name` or `name[Attribute]`.
fn parse(expr: &str) -> Result<(&str, Attribute), QueryError> {
    let invalid = || QueryError::Invalid(format!("invalid cookie path query {expr}"));
    let Some(start) = expr.find('[') else {
        return Ok((expr, Attribute::Value));
    };
    let end = expr[start..].find(']').ok_or_else(invalid)? + start;
    let attribute = match expr[start + 1..end].to_ascii_lowercase().as_str() {
        "value" => Attribute::Value,
        "expires" => Attribute::Expires,
        "max-age" => Attribute::MaxAge,
        "domain" => Attribute::Domain,
        "path" => Attribute::Path,
        "secure" => Attribute::Secure,
        "httponly" => Attribute::HttpOnly,
        "samesite" => Attribute::SameSite,
        _ => return Err(invalid()),
    };
    Ok((&expr[..start], attribute))
}

/// Evaluates a cookie path against the `Set-Cookie` values of a response.
pub(super) fn evaluate(expr: &str, set_cookies: &[&str]) -> Result<QueryResult, QueryError> {
    let (name, attribute) = parse(expr)?;
    let mut cookie = None;
    for header in set_cookies {
        let parsed = SetCookie::parse(header)
            .ok_or_else(|| QueryError::Invalid(format!("invalid set-cookie header {header}")))?;
        if parsed.name == name {
            cookie = Some(parsed);
            break;
        }
    }
    let Some(cookie) = cookie else {
        return Ok(QueryResult::None);
    };

    let text = |name: &str| {
        cookie
            .attribute(name)
            .flatten()
            .map_or(QueryResult::None, |v| QueryResult::String(v.to_string()))
    };
    let flag = |name: &str| {
        cookie
            .attribute(name)
            .map_or(QueryResult::None, |_| QueryResult::Boolean(true))
    };
    let result = match attribute {
        Attribute::Value => QueryResult::String(cookie.value.clone()),
        Attribute::Expires => text("expires"),
        Attribute::MaxAge => match cookie.attribute("max-age").flatten() {
            None => QueryResult::None,
            Some(value) => value
                .parse::<i64>()
                .map(|v| QueryResult::Number(v as f64))
                .map_err(|_| QueryError::Invalid(format!("invalid cookie max-age {value}")))?,
        },
        Attribute::Domain => text("domain"),
        Attribute::Path => text("path"),
        Attribute::Secure => flag("secure"),
        Attribute::HttpOnly => flag("httponly"),
        Attribute::SameSite => text("samesite"),
    };
    Ok(result)
}
