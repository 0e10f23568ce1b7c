//! Route classification: which authorization level a path + method needs.
//!
//! The policy is immutable, compiled once at startup, and consulted fresh on
//! every request. Classification is a pure function of the path and method;
//! the most specific applicable rule wins, and the explicit public carve-out
//! under `/v1/seasons` overrides that family's admin gating.

use anyhow::{Context, Result};
use axum::http::Method;
use regex::Regex;

/// Authorization level required for a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// No identity required; the gate passes the request through untouched.
    Public,
    /// Any authenticated identity suffices.
    Authenticated,
    /// Only the administrator role may pass.
    AdminOnly,
}

/// Unauthenticated entry points, matched exactly.
const PUBLIC_EXACT: &[&str] = &[
    "/",
    "/health",
    "/v1/auth/register",
    "/v1/auth/login",
    "/v1/auth/reset/request",
    "/v1/auth/reset/redeem",
];

/// Read-only public carve-outs under otherwise admin-gated families.
const PUBLIC_READ_EXACT: &[&str] = &["/v1/seasons/current"];

/// Parameterized read-only reference routes and framework introspection
/// paths.
const PUBLIC_READ_PATTERNS: &[&str] = &[
    r"^/docs(/.*)?$",
    r"^/api-docs(/.*)?$",
    r"^/v1/players/[0-9]+$",
];

/// Sensitive collections: every call, reads included, requires the
/// administrator role.
const ADMIN_ALL_PATTERNS: &[&str] = &[r"^/v1/admin(/.*)?$", r"^/v1/seasons(/.*)?$"];

/// Reference-data families where only mutating calls require the
/// administrator role.
const ADMIN_MUTATING_PATTERNS: &[&str] = &[r"^/v1/roles(/.*)?$"];

pub struct RoutePolicy {
    public_read_patterns: Vec<Regex>,
    admin_all_patterns: Vec<Regex>,
    admin_mutating_patterns: Vec<Regex>,
}

fn compile(patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).with_context(|| format!("invalid route pattern: {pattern}"))
        })
        .collect()
}

fn is_read_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD)
}

impl RoutePolicy {
    /// Compile the route tables.
    ///
    /// # Errors
    /// Returns an error if any pattern fails to compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            public_read_patterns: compile(PUBLIC_READ_PATTERNS)?,
            admin_all_patterns: compile(ADMIN_ALL_PATTERNS)?,
            admin_mutating_patterns: compile(ADMIN_MUTATING_PATTERNS)?,
        })
    }

    /// Classify a request. New route families not matched by any rule
    /// default to `Authenticated`, never to `Public`.
    #[must_use]
    pub fn classify(&self, path: &str, method: &Method) -> Access {
        if PUBLIC_EXACT.contains(&path) {
            return Access::Public;
        }
        // Carve-outs beat the admin prefixes for the same path.
        if is_read_method(method) && PUBLIC_READ_EXACT.contains(&path) {
            return Access::Public;
        }
        if is_read_method(method)
            && self
                .public_read_patterns
                .iter()
                .any(|pattern| pattern.is_match(path))
        {
            return Access::Public;
        }
        if self
            .admin_all_patterns
            .iter()
            .any(|pattern| pattern.is_match(path))
        {
            return Access::AdminOnly;
        }
        if !is_read_method(method)
            && self
                .admin_mutating_patterns
                .iter()
                .any(|pattern| pattern.is_match(path))
        {
            return Access::AdminOnly;
        }
        Access::Authenticated
    }
}
