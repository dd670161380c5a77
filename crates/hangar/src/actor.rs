//! Resolve the calling [`Actor`] from CLI flags or environment variables.

use std::env;

use anyhow::{Context, Result, anyhow};
use hangar_core::id::{TenantId, UserId};
use hangar_core::{Actor, Role};

/// Environment variable consulted when `--tenant` is absent.
pub const ENV_ACTOR_TENANT: &str = "HANGAR_ACTOR_TENANT";
/// Environment variable consulted when `--user` is absent.
pub const ENV_ACTOR_USER: &str = "HANGAR_ACTOR_USER";
/// Environment variable consulted when `--role` is absent.
pub const ENV_ACTOR_ROLE: &str = "HANGAR_ACTOR_ROLE";

/// Flags given on the command line; each one overrides its environment variable.
#[derive(Debug, Default, Clone)]
pub struct ActorFlags {
    pub tenant: Option<TenantId>,
    pub user: Option<UserId>,
    pub role: Option<Role>,
}

/// Resolve the actor from flags, then the process environment. The role defaults to viewer.
pub fn resolve_actor(flags: ActorFlags) -> Result<Actor> {
    let mut fetch = |key: &'static str| env::var(key).ok();
    resolve_actor_with(flags, &mut fetch)
}

fn resolve_actor_with(
    flags: ActorFlags,
    fetch: &mut impl FnMut(&'static str) -> Option<String>,
) -> Result<Actor> {
    let tenant = match flags.tenant {
        Some(tenant) => tenant,
        None => fetch(ENV_ACTOR_TENANT)
            .ok_or_else(|| anyhow!("tenant not provided; pass --tenant or set {ENV_ACTOR_TENANT}"))?
            .parse()
            .with_context(|| format!("invalid {ENV_ACTOR_TENANT}"))?,
    };
    let user = match flags.user {
        Some(user) => user,
        None => fetch(ENV_ACTOR_USER)
            .ok_or_else(|| anyhow!("user not provided; pass --user or set {ENV_ACTOR_USER}"))?
            .parse()
            .with_context(|| format!("invalid {ENV_ACTOR_USER}"))?,
    };
    let role = match flags.role {
        Some(role) => role,
        None => match fetch(ENV_ACTOR_ROLE) {
            Some(raw) => raw.parse().map_err(|err: String| anyhow!(err))?,
            None => Role::Viewer,
        },
    };
    Ok(Actor::new(tenant, user, role))
}
