//! Verification profile storage and first-time acquisition.
//!
//! The profile lives in the worktree (`.chief/verification.txt`) with the project
//! file (`<home>/<project>/verification.txt`) as fallback. Once either exists,
//! runs reuse it without asking.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{debug, info};

use crate::core::verification::normalize_steps;
use crate::io::terminal::Prompter;

/// Where a profile is read from and written to.
#[derive(Debug, Clone)]
pub struct ProfileLocation {
    /// `<workspace>/.chief/verification.txt`
    pub workspace_path: PathBuf,
    /// `<home>/<project>/verification.txt`
    pub project_path: PathBuf,
}

/// Read the profile, preferring the workspace file over the project file.
///
/// Whitespace-only files count as absent.
pub fn read_profile(location: &ProfileLocation) -> Result<Option<String>> {
    for path in [&location.workspace_path, &location.project_path] {
        if let Some(text) = read_non_empty(path)? {
            debug!(path = %path.display(), "verification profile found");
            return Ok(Some(text));
        }
    }
    Ok(None)
}

/// Persist `text` verbatim.
pub fn write_profile(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut buf = text.to_string();
    if !buf.ends_with('\n') {
        buf.push('\n');
    }
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}

/// Return the stored profile, acquiring and persisting one if none exists yet.
pub fn ensure_profile<P: Prompter>(
    location: &ProfileLocation,
    workspace_root: &Path,
    prompter: &P,
) -> Result<String> {
    if let Some(existing) = read_profile(location)? {
        return Ok(existing);
    }
    acquire_profile(location, workspace_root, prompter)
}

/// Ask for verification steps, normalize them and persist them.
///
/// When the workspace declares `package.json` scripts, they are offered as a
/// guided choice first; choosing none falls back to free-text entry. The
/// result is written to the workspace file, and seeds the project file when that
/// does not exist yet.
pub fn acquire_profile<P: Prompter>(
    location: &ProfileLocation,
    workspace_root: &Path,
    prompter: &P,
) -> Result<String> {
    println!("\nFirst-time setup: Please provide verification steps.");
    println!("These are commands to verify the agent's work (e.g., tests, lint, build).\n");

    let candidates = manifest_commands(workspace_root)?;
    let mut raw = String::new();
    if !candidates.is_empty() {
        let picked = prompter.multi_select(
            "Select the scripts the agent must run after each task:",
            &candidates,
        )?;
        raw = picked
            .into_iter()
            .filter_map(|idx| candidates.get(idx).cloned())
            .collect::<Vec<_>>()
            .join("\n");
    }
    if raw.trim().is_empty() {
        println!("Example:");
        println!("  - cargo clippy --all-targets");
        println!("  - cargo test\n");
        raw = prompter.multiline("Enter verification steps:")?;
    }

    let steps = normalize_steps(&raw);
    if steps.is_empty() {
        bail!("Verification steps cannot be empty.");
    }

    write_profile(&location.workspace_path, &steps)?;
    if read_non_empty(&location.project_path)?.is_none() {
        write_profile(&location.project_path, &steps)?;
    }
    info!(path = %location.workspace_path.display(), "verification profile saved");
    println!("\n✓ Verification steps saved.\n");
    Ok(steps)
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    scripts: BTreeMap<String, String>,
}

/// Commands derived from the workspace's `package.json` scripts, if any.
///
/// The package manager is inferred from the lockfile present.
pub fn manifest_commands(workspace_root: &Path) -> Result<Vec<String>> {
    let manifest_path = workspace_root.join("package.json");
    if !manifest_path.exists() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(&manifest_path)
        .with_context(|| format!("read {}", manifest_path.display()))?;
    let manifest: PackageManifest = serde_json::from_str(&contents)
        .with_context(|| format!("parse {}", manifest_path.display()))?;
    let runner = package_runner(workspace_root);
    Ok(manifest
        .scripts
        .keys()
        .map(|name| format!("{runner} run {name}"))
        .collect())
}

fn package_runner(workspace_root: &Path) -> &'static str {
    const LOCKFILES: [(&str, &str); 4] = [
        ("bun.lockb", "bun"),
        ("bun.lock", "bun"),
        ("pnpm-lock.yaml", "pnpm"),
        ("yarn.lock", "yarn"),
    ];
    LOCKFILES
        .iter()
        .find(|(file, _)| workspace_root.join(file).exists())
        .map(|(_, runner)| *runner)
        .unwrap_or("npm")
}

fn read_non_empty(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let trimmed = contents.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}
