//! Route lookup.
//!
//! # Responsibilities
//! - Map an exact `(method, path)` pair to a [`Route`]
//! - Fall back to [`Route::NotFound`] for everything else
//!
//! # Design Decisions
//! - Immutable after construction (shared without locks)
//! - Exact path match only; the query string is already split off
//! - O(n) scan over a handful of entries

use crate::http::request::Method;

/// Handler kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Index,
    Favicon,
    Signup,
    Register,
    Signin,
    Logout,
    List,
    Download,
    Upload,
    NotFound,
}

impl Route {
    /// Stable label for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Route::Index => "index",
            Route::Favicon => "favicon",
            Route::Signup => "signup",
            Route::Register => "register",
            Route::Signin => "signin",
            Route::Logout => "logout",
            Route::List => "list",
            Route::Download => "download",
            Route::Upload => "upload",
            Route::NotFound => "not_found",
        }
    }
}

/// One routing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub method: Method,
    pub path: &'static str,
    pub route: Route,
}

/// Exact-match routing table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// The file server's fixed route set.
    pub fn standard() -> Self {
        let entries = [
            (Method::Get, "/", Route::Index),
            (Method::Get, "/favicon.ico", Route::Favicon),
            (Method::Get, "/signup", Route::Signup),
            (Method::Post, "/register", Route::Register),
            (Method::Get, "/signin", Route::Signin),
            (Method::Get, "/logout", Route::Logout),
            (Method::Get, "/list", Route::List),
            (Method::Post, "/download", Route::Download),
            (Method::Post, "/upload", Route::Upload),
        ]
        .into_iter()
        .map(|(method, path, route)| RouteEntry { method, path, route })
        .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Route for `method` and `path`.
    pub fn resolve(&self, method: &Method, path: &str) -> Route {
        self.entries
            .iter()
            .find(|entry| entry.method == *method && entry.path == path)
            .map_or(Route::NotFound, |entry| entry.route)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}
