//! Identity core: credentials, sessions, password reset and the
//! authentication gate.
//!
//! Every request to the API passes through [`gate::authentication_gate`],
//! which consults the compiled [`routes::RoutePolicy`] and the session store
//! before any business handler runs. The handlers in this module are the
//! public entry points the policy leaves open plus the session-management
//! endpoints behind it.

pub mod credentials;
pub mod error;
pub mod gate;
pub mod login;
pub mod password;
pub mod principal;
pub mod register;
pub mod reset;
pub mod routes;
pub mod session;
pub mod state;
pub mod utils;

#[cfg(test)]
mod tests;

pub use error::{FailureBody, GateError};
pub use gate::authentication_gate;
pub use principal::Principal;
pub use state::{AuthConfig, AuthState};
