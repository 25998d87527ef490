//! Status lines the server can emit.

/// The closed set of statuses this server answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusLine {
    Ok,
    Forbidden,
    NotFound,
    Conflict,
}

impl StatusLine {
    /// The literal status line, including its trailing CRLF.
    pub const fn as_str(&self) -> &'static str {
        match self {
            StatusLine::Ok => "HTTP/1.1 200 OK\r\n",
            StatusLine::Forbidden => "HTTP/1.1 403 Forbidden\r\n",
            StatusLine::NotFound => "HTTP/1.1 404 Not Found\r\n",
            StatusLine::Conflict => "HTTP/1.1 409 Conflict\r\n",
        }
    }

    pub const fn code(&self) -> u16 {
        match self {
            StatusLine::Ok => 200,
            StatusLine::Forbidden => 403,
            StatusLine::NotFound => 404,
            StatusLine::Conflict => 409,
        }
    }
}

impl std::fmt::Display for StatusLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str().trim_end())
    }
}
