//! Request parsing.
//!
//! # Responsibilities
//! - Split the request line into method, path and protocol version
//! - Split query parameters off the path
//! - Collect header fields exactly as received
//! - Decode url-encoded form bodies into key/value pairs
//!
//! # Design Decisions
//! - No percent-decoding here; the storage layer decodes what it needs
//! - Header keys keep their received case; lookups ignore ASCII case

use std::collections::HashMap;

use thiserror::Error;

/// Error type for request parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty request")]
    Empty,

    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),
}

/// Request method. Only `GET` and `POST` are served.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Other(String),
}

impl Method {
    pub fn parse(token: &str) -> Self {
        match token {
            "GET" => Method::Get,
            "POST" => Method::Post,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Other(token) => token,
        }
    }

    pub fn is_allowed(&self) -> bool {
        !matches!(self, Method::Other(_))
    }

    /// Bounded label for metrics. Every unknown token collapses to `OTHER`.
    pub fn metric_label(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Other(_) => "OTHER",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Path without the query string.
    pub path: String,
    pub version: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    /// Body bytes received so far; may be a prefix of the full body.
    pub body: Vec<u8>,
}

impl Request {
    /// Parse a header region (request line + header fields, no trailing delimiter).
    pub fn parse(head: &str, body: Vec<u8>) -> Result<Self, ParseError> {
        let mut lines = head.split("\r\n");
        let request_line = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or(ParseError::Empty)?;

        let tokens: Vec<&str> = request_line.split(' ').collect();
        let [method, target, version] = tokens[..] else {
            return Err(ParseError::MalformedRequestLine(request_line.to_string()));
        };

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, HashMap::new()),
        };

        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.to_string(), value.trim().to_string()))
            .collect();

        Ok(Self {
            method: Method::parse(method),
            path: path.to_string(),
            version: version.to_string(),
            query,
            headers,
            body,
        })
    }

    /// Look up a header, ignoring ASCII case in the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .or_else(|| {
                self.headers
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
    }

    /// The declared body length, if present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        self.header("Content-Length")?.parse().ok()
    }

    /// The body decoded as a url-encoded form.
    pub fn form(&self) -> HashMap<String, String> {
        parse_pairs(&String::from_utf8_lossy(&self.body))
    }
}

/// Value of header `name` in a raw CRLF-separated header block.
pub fn find_header<'a>(block: &'a str, name: &str) -> Option<&'a str> {
    block
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim())
}

/// Parse a query string.
///
/// `a=1&b=2` yields two entries, `a=1` one; a string with neither `&` nor `=`
/// is left unparsed.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    if query.contains('&') || query.contains('=') {
        parse_pairs(query)
    } else {
        HashMap::new()
    }
}

/// Split `key=value` pairs joined by `&`. A pair without `=` maps to an empty value.
pub fn parse_pairs(text: &str) -> HashMap<String, String> {
    text.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (key.to_string(), value.to_string())
        })
        .collect()
}
