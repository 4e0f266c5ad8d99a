use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A group member's role, as handed down by the authentication/authorization system.
///
/// The core never hard-codes a set of roles: `AuthorizationPolicy` (see
/// `nestcall_signaling_core::capabilities`) is the only thing that interprets a [`Role`],
/// so adding a role elsewhere in the product never requires a change here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// The one role name the core itself is aware of: `Initiate` refuses to invite a
    /// supervisor (spec.md §4.3), so the literal has to live somewhere reachable by the
    /// state machine.
    pub const SUPERVISOR: &'static str = "supervisor";

    pub const ADMIN: &'static str = "admin";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_supervisor(&self) -> bool {
        self.0 == Self::SUPERVISOR
    }

    pub fn is_admin(&self) -> bool {
        self.0 == Self::ADMIN
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
