//! Server list file: durable form of the endpoint registry.
//!
//! One endpoint per line. Lines starting with `#` and blank lines are
//! ignored; invalid lines are skipped with a warning. Saving writes the
//! registry's sorted list, one canonical `<ip>:<port>` per line.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::registry::{EndpointRegistry, RegistryError};

/// Outcome of loading a server list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

/// Read `path` and add every valid endpoint to `registry`.
pub fn load(path: &Path, registry: &EndpointRegistry) -> Result<LoadReport> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read server list: {}", path.display()))?;
    let report = load_str(&text, registry);
    tracing::info!(
        path = %path.display(),
        loaded = report.loaded,
        duplicates = report.duplicates,
        invalid = report.invalid,
        "server list loaded"
    );
    Ok(report)
}

/// Add every valid endpoint line of `text` to `registry`.
pub fn load_str(text: &str, registry: &EndpointRegistry) -> LoadReport {
    let mut report = LoadReport::default();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match registry.add(line) {
            Ok(_) => report.loaded += 1,
            Err(RegistryError::Duplicate(endpoint)) => {
                tracing::debug!(line = index + 1, endpoint = %endpoint, "duplicate server list entry");
                report.duplicates += 1;
            }
            Err(e) => {
                tracing::warn!(line = index + 1, content = line, error = %e, "invalid server list line, skipping");
                report.invalid += 1;
            }
        }
    }

    report
}

/// Render the registry in file form.
pub fn render(registry: &EndpointRegistry) -> String {
    let servers = registry.sorted_list();
    // "[ipv6]:port\n" is at most 48 bytes
    let mut out = String::with_capacity(servers.len() * 48);
    for server in servers {
        out.push_str(&server.to_string());
        out.push('\n');
    }
    out
}

/// Write the registry to `path`. Returns the number of endpoints written.
///
/// Writes are atomic: write to temp file, then rename.
pub fn save(path: &Path, registry: &EndpointRegistry) -> Result<usize> {
    let text = render(registry);
    let count = text.lines().count();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp_path)
            .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;
        file.write_all(text.as_bytes())
            .context("failed to write server list")?;
        file.sync_all().context("failed to sync server list to disk")?;
    }

    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "failed to rename {} to {}",
            tmp_path.display(),
            path.display()
        )
    })?;

    tracing::info!(path = %path.display(), count, "server list saved");
    Ok(count)
}
