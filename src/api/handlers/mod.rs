//! API handlers for gridiron.
//!
//! The auth submodule holds the identity core; everything else here is the
//! league-facing surface that sits behind (or deliberately in front of) the
//! authentication gate.

pub mod admin;
pub mod auth;
pub mod health;
pub mod me;
pub mod root;
pub mod seasons;
