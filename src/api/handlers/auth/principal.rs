//! Request-scoped identity.
//!
//! The gate resolves the bearer token and inserts a [`Principal`] into the
//! request extensions; downstream handlers receive it through
//! `Extension<Principal>` instead of re-reading headers or ambient state.

use uuid::Uuid;

use crate::store::Role;

/// Authenticated identity attached to a request by the gate.
#[derive(Clone, Debug)]
pub struct Principal {
    pub account_id: Uuid,
    pub email: String,
    pub role: Role,
    /// Expiry after this request's sliding refresh.
    pub expires_at_unix: i64,
    /// Hash of the session token this request presented; used by logout.
    pub token_hash: Vec<u8>,
}

impl Principal {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
