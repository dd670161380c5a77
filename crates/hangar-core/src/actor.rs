use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::id::{TenantId, UserId};

/// Role carried by the caller, already authenticated upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform administrator; not bound to a single tenant.
    Admin,
    /// Administrator of one tenant.
    TenantAdmin,
    /// Plans and moves maintenance work.
    Scheduler,
    /// Performs maintenance work.
    Mechanic,
    /// Read-only access.
    Viewer,
}

impl Role {
    /// String representation used in configuration and CLI flags.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::TenantAdmin => "tenant_admin",
            Self::Scheduler => "scheduler",
            Self::Mechanic => "mechanic",
            Self::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "admin" => Ok(Self::Admin),
            "tenant_admin" => Ok(Self::TenantAdmin),
            "scheduler" => Ok(Self::Scheduler),
            "mechanic" => Ok(Self::Mechanic),
            "viewer" => Ok(Self::Viewer),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Tenant visibility of a read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    /// Restricted to one tenant.
    Tenant(TenantId),
    /// Unrestricted (platform administrators).
    All,
}

impl TenantScope {
    /// Whether a record owned by `tenant` is visible in this scope.
    #[must_use]
    pub fn includes(self, tenant: TenantId) -> bool {
        match self {
            Self::Tenant(scoped) => scoped == tenant,
            Self::All => true,
        }
    }
}

/// Caller identity passed to every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Tenant the caller belongs to.
    pub tenant: TenantId,
    /// Caller user id.
    pub user: UserId,
    /// Caller role.
    pub role: Role,
}

impl Actor {
    /// Construct an actor.
    #[must_use]
    pub const fn new(tenant: TenantId, user: UserId, role: Role) -> Self {
        Self { tenant, user, role }
    }

    /// Tenant scope for reads and writes issued on behalf of this actor.
    #[must_use]
    pub const fn scope(&self) -> TenantScope {
        match self.role {
            Role::Admin => TenantScope::All,
            _ => TenantScope::Tenant(self.tenant),
        }
    }

    /// Scheduler or admin, as required for cancellation and early completion.
    #[must_use]
    pub const fn is_scheduler_or_admin(&self) -> bool {
        matches!(self.role, Role::Scheduler | Role::Admin)
    }

    /// Roles allowed to move a task's time window.
    #[must_use]
    pub const fn can_reschedule(&self) -> bool {
        matches!(self.role, Role::Scheduler | Role::Admin | Role::TenantAdmin)
    }
}
