//! Loading and saving schedule fixtures (TOML or JSON).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use hangar_store_mem::{MemoryStore, Snapshot};
use tracing::debug;

/// On-disk encoding, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureFormat {
    Json,
    Toml,
}

impl FixtureFormat {
    /// `.toml` files are TOML; everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// Read a fixture into a fresh store.
pub fn load(path: &Path) -> Result<MemoryStore> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read fixture {}", path.display()))?;
    let snapshot = parse(&contents, FixtureFormat::from_path(path))
        .with_context(|| format!("failed to parse fixture {}", path.display()))?;
    debug!(
        path = %path.display(),
        tasks = snapshot.tasks.len(),
        dependencies = snapshot.dependencies.len(),
        "Loaded fixture"
    );
    MemoryStore::from_snapshot(snapshot)
        .with_context(|| format!("inconsistent fixture {}", path.display()))
}

/// Write the store's contents back to `path`.
pub fn save(path: &Path, store: &MemoryStore) -> Result<()> {
    let rendered = render(&store.snapshot(), FixtureFormat::from_path(path))?;
    fs::write(path, rendered)
        .with_context(|| format!("failed to write fixture {}", path.display()))
}

fn parse(contents: &str, format: FixtureFormat) -> Result<Snapshot> {
    match format {
        FixtureFormat::Json => serde_json::from_str(contents).context("invalid JSON fixture"),
        FixtureFormat::Toml => toml::from_str(contents).context("invalid TOML fixture"),
    }
}

fn render(snapshot: &Snapshot, format: FixtureFormat) -> Result<String> {
    match format {
        FixtureFormat::Json => {
            serde_json::to_string_pretty(snapshot).context("failed to encode JSON fixture")
        }
        FixtureFormat::Toml => {
            toml::to_string_pretty(snapshot).context("failed to encode TOML fixture")
        }
    }
}
