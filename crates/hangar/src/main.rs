//! CLI entry point for hangar.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hangar_app::{ProjectConfig, RequestContext, SchedulingService};
use hangar_core::id::{DependencyId, TaskId, TenantId, UserId};
use hangar_core::{AircraftStatus, DependencyType, Role, TaskState};
use hangar_store_mem::MemoryStore;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use actor::{ActorFlags, resolve_actor};

mod actor;
mod commands;
mod fixture;

/// Default fixture location relative to the working directory.
const DEFAULT_FIXTURE: &str = ".hangar/schedule.json";

/// Maintenance task scheduling over a fixture file.
#[derive(Parser, Debug)]
#[command(
    name = "hangar",
    version,
    about = "hangar: aircraft maintenance scheduling with dependencies, cascades and conflict checks"
)]
struct Cli {
    /// Project directory holding `.hangar/` (defaults to current).
    #[arg(long, default_value = ".")]
    workdir: PathBuf,

    /// Schedule fixture (JSON or TOML); defaults to `.hangar/schedule.json`.
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Persist changes back to the fixture.
    #[arg(long)]
    write: bool,

    /// Tenant of the caller (falls back to `HANGAR_ACTOR_TENANT`).
    #[arg(long, global = true)]
    tenant: Option<TenantId>,

    /// Caller id (falls back to `HANGAR_ACTOR_USER`).
    #[arg(long, global = true)]
    user: Option<UserId>,

    /// Caller role (falls back to `HANGAR_ACTOR_ROLE`, then viewer).
    #[arg(long, global = true)]
    role: Option<Role>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List tasks visible to the caller.
    Tasks {
        #[arg(long = "state")]
        states: Vec<TaskState>,
    },

    /// Report active tasks that start before an unfinished prerequisite ends.
    Conflicts,

    /// Make `--task` depend on `--on`.
    Depend {
        #[arg(long)]
        task: TaskId,
        #[arg(long)]
        on: TaskId,
        #[arg(long)]
        kind: Option<DependencyType>,
    },

    /// Remove a dependency edge.
    Undepend {
        #[arg(long)]
        dependency: DependencyId,
    },

    /// List prerequisites of a task.
    Deps {
        #[arg(long)]
        task: TaskId,
    },

    /// List tasks depending on a task.
    Dependents {
        #[arg(long)]
        task: TaskId,
    },

    /// Move a task to a new window, optionally shifting its dependents.
    Reschedule {
        #[arg(long)]
        task: TaskId,
        #[arg(long, value_parser = parse_timestamp)]
        start: OffsetDateTime,
        #[arg(long, value_parser = parse_timestamp)]
        end: OffsetDateTime,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        cascade: bool,
    },

    /// Move a task through its lifecycle.
    Transition {
        #[arg(long)]
        task: TaskId,
        #[arg(long)]
        state: TaskState,
        #[arg(long, value_enum, default_value_t = AircraftArg::Grounded)]
        aircraft: AircraftArg,
        #[arg(long)]
        reservations_closed: bool,
        #[arg(long)]
        require_parts_used: bool,
        #[arg(long)]
        parts_used: bool,
        #[arg(long)]
        signed_off: bool,
        #[arg(long)]
        allow_early_completion: bool,
        #[arg(long)]
        allow_late_cancel: bool,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show the schedule change history of a task.
    History {
        #[arg(long)]
        task: TaskId,
    },
}

impl Command {
    const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Depend { .. }
                | Self::Undepend { .. }
                | Self::Reschedule { .. }
                | Self::Transition { .. }
        )
    }
}

/// Aircraft status as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AircraftArg {
    Operational,
    Grounded,
    Retired,
}

impl From<AircraftArg> for AircraftStatus {
    fn from(value: AircraftArg) -> Self {
        match value {
            AircraftArg::Operational => Self::Operational,
            AircraftArg::Grounded => Self::Grounded,
            AircraftArg::Retired => Self::Retired,
        }
    }
}

fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|err| format!("expected RFC 3339 timestamp: {err}"))
}

fn main() -> Result<()> {
    install_tracing();
    let Cli {
        workdir,
        fixture,
        write,
        tenant,
        user,
        role,
        cmd,
    } = Cli::parse();

    let actor = resolve_actor(ActorFlags { tenant, user, role })?;
    let fixture = fixture.unwrap_or_else(|| workdir.join(DEFAULT_FIXTURE));
    let config = ProjectConfig::from_workdir(&workdir)?;
    let store = Arc::new(open_store(&fixture)?);
    let service = SchedulingService::new(Arc::clone(&store), config).with_publisher(store.clone());
    let ctx = RequestContext::new(actor);

    let persist = write && cmd.is_mutation();
    let output = commands::run(cmd, &service, &ctx)?;
    println!("{output}");

    if persist {
        if let Some(parent) = fixture.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fixture::save(&fixture, &store)?;
    }
    Ok(())
}

fn open_store(path: &Path) -> Result<MemoryStore> {
    if path.exists() {
        fixture::load(path)
    } else {
        debug!(path = %path.display(), "Fixture not found; starting empty");
        Ok(MemoryStore::new())
    }
}

fn install_tracing() {
    // RUST_LOG is honored; INFO by default. Logs go to stderr so stdout stays JSON.
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
