//! # Script AST
//!
//! Immutable tree produced by the parser. Every node keeps the position where
//! it starts so that runtime failures can point back into the script.

use crate::parser::Position;

/// A parsed script: an ordered list of entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub entries: Vec<Entry>,
}

/// One request and its optional expected response.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub request: Request,
    pub response: Option<Response>,
}

impl Entry {
    /// Captures of the entry, in script order. Captures written in the request
    /// part apply to the response of that request.
    pub fn captures(&self) -> impl Iterator<Item = &Capture> {
        let response = self.response.iter().flat_map(|r| r.captures.iter());
        self.request.captures.iter().chain(response)
    }

    pub fn asserts(&self) -> impl Iterator<Item = &Assert> {
        let response = self.response.iter().flat_map(|r| r.asserts.iter());
        self.request.asserts.iter().chain(response)
    }
}

/// A string that may contain `{{name}}` placeholders, with escapes already
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub value: String,
    pub position: Position,
}

impl Template {
    pub fn new(value: impl Into<String>, position: Position) -> Self {
        Self {
            value: value.into(),
            position,
        }
    }
}

/// A `#` comment, including the leading `#`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub value: String,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
}

impl Method {
    pub const ALL: [Method; 9] = [
        Method::Get,
        Method::Head,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Connect,
        Method::Options,
        Method::Trace,
        Method::Patch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Patch => "PATCH",
        }
    }
}

/// `key: value` line used by headers, params and cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Template,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileParam {
    pub key: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartParam {
    Text(KeyValue),
    File(FileParam),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub position: Position,
    /// Comments on the lines preceding the method line.
    pub comments: Vec<Comment>,
    pub method: Method,
    pub url: Template,
    pub headers: Vec<KeyValue>,
    pub query_params: Vec<KeyValue>,
    pub form_params: Vec<KeyValue>,
    pub multipart: Vec<MultipartParam>,
    pub cookies: Vec<KeyValue>,
    pub captures: Vec<Capture>,
    pub asserts: Vec<Assert>,
    pub body: Option<Body>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionValue {
    Http10,
    Http11,
    Http2,
    Any,
}

impl VersionValue {
    pub const ALL: [VersionValue; 4] = [
        VersionValue::Http10,
        VersionValue::Http11,
        VersionValue::Http2,
        VersionValue::Any,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VersionValue::Http10 => "HTTP/1.0",
            VersionValue::Http11 => "HTTP/1.1",
            VersionValue::Http2 => "HTTP/2",
            VersionValue::Any => "HTTP/*",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub value: VersionValue,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusValue {
    Code(u16),
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub value: StatusValue,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub position: Position,
    pub version: Version,
    pub status: Status,
    pub headers: Vec<KeyValue>,
    pub captures: Vec<Capture>,
    pub asserts: Vec<Assert>,
    pub body: Option<Body>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    pub bytes: Bytes,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bytes {
    Json(Template),
    Xml(Template),
    Raw(Template),
    Base64(Vec<u8>),
    File { filename: String, position: Position },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub name: String,
    pub query: Query,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assert {
    pub query: Query,
    pub predicate: Predicate,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub kind: QueryKind,
    pub subquery: Option<Subquery>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    Status,
    Header(Template),
    Cookie(Template),
    Body,
    XPath(Template),
    JsonPath(Template),
    Regex(Template),
    Variable(Template),
    Duration,
}

impl QueryKind {
    /// Keyword introducing the query in a script.
    pub fn name(&self) -> &'static str {
        match self {
            QueryKind::Status => "status",
            QueryKind::Header(_) => "header",
            QueryKind::Cookie(_) => "cookie",
            QueryKind::Body => "body",
            QueryKind::XPath(_) => "xpath",
            QueryKind::JsonPath(_) => "jsonpath",
            QueryKind::Regex(_) => "regex",
            QueryKind::Variable(_) => "variable",
            QueryKind::Duration => "duration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subquery {
    Regex(Template),
    Count,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub not: bool,
    pub func: PredicateFunc,
    pub position: Position,
}

/// Comparison performed by an assert, with its expected literal.
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateFunc {
    EqualString(Template),
    EqualNumber(f64),
    EqualBool(bool),
    EqualNull,
    /// `equals {{name}}`: the expected value is a variable, compared with its
    /// own type.
    EqualExpr { name: String, position: Position },
    GreaterThan(f64),
    GreaterThanOrEqual(f64),
    LessThan(f64),
    LessThanOrEqual(f64),
    StartWith(Template),
    Contain(Template),
    IncludeString(Template),
    IncludeNumber(f64),
    IncludeBool(bool),
    IncludeNull,
    Match(Template),
    CountEqual(usize),
    Exist,
}

impl PredicateFunc {
    /// Keyword introducing the predicate in a script.
    pub fn name(&self) -> &'static str {
        match self {
            PredicateFunc::EqualString(_)
            | PredicateFunc::EqualNumber(_)
            | PredicateFunc::EqualBool(_)
            | PredicateFunc::EqualNull
            | PredicateFunc::EqualExpr { .. } => "equals",
            PredicateFunc::GreaterThan(_) => "greaterThan",
            PredicateFunc::GreaterThanOrEqual(_) => "greaterThanOrEquals",
            PredicateFunc::LessThan(_) => "lessThan",
            PredicateFunc::LessThanOrEqual(_) => "lessThanOrEquals",
            PredicateFunc::StartWith(_) => "startsWith",
            PredicateFunc::Contain(_) => "contains",
            PredicateFunc::IncludeString(_)
            | PredicateFunc::IncludeNumber(_)
            | PredicateFunc::IncludeBool(_)
            | PredicateFunc::IncludeNull => "includes",
            PredicateFunc::Match(_) => "matches",
            PredicateFunc::CountEqual(_) => "countEquals",
            PredicateFunc::Exist => "exists",
        }
    }
}
