//! # Gridiron (Fantasy Football League API)
//!
//! `gridiron` is the web API behind a fantasy-football league manager. League,
//! roster and player CRUD are thin database plumbing; the part of the service
//! with real design stakes is the identity core, and that is what this crate
//! is organized around:
//!
//! - **Sessions** are opaque bearer tokens with sliding expiration. Only a
//!   SHA-256 hash of the token is stored; validation and the expiry push are
//!   a single atomic store operation so concurrent requests on one session
//!   never race each other.
//! - **Login lockout**: repeated failed logins lock the account for a window.
//!   Every attempt, including ones for unknown emails, is recorded in an
//!   append-only log.
//! - **Password reset** tokens are single-use and short-lived; redeeming one
//!   rotates the password, clears lockout state and revokes every session for
//!   the account in one transaction.
//! - **The authentication gate** classifies each request (public,
//!   authenticated, admin) from its path and method, resolves the bearer
//!   token to a [`Principal`](api::handlers::auth::Principal), and fails
//!   closed with a structured error. Store outages surface as 5xx, never as
//!   a logout.
//!
//! Session and account state live behind the [`store`] traits; the Postgres
//! implementation is the production backend and an in-memory one backs tests
//! and local development.

pub mod api;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
