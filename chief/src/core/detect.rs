//! Structural detection of a chief worktree from a directory path.
//!
//! Worktrees live at `<home>/<project>/worktrees/<name>`; any directory below one
//! identifies it.

use std::path::{Component, Path, PathBuf};

const WORKTREES_DIR: &str = "worktrees";

/// Worktree identified from a path under the chief home.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedWorkspace {
    pub project: String,
    pub name: String,
    pub path: PathBuf,
}

/// Parse `cwd` as `<home>/<project>/worktrees/<name>/...`.
///
/// Pure path arithmetic: the caller decides whether the directory must exist.
pub fn parse_workspace_path(home: &Path, cwd: &Path) -> Option<DetectedWorkspace> {
    let relative = cwd.strip_prefix(home).ok()?;
    let mut parts = relative.components().filter_map(|component| match component {
        Component::Normal(part) => part.to_str(),
        _ => None,
    });

    let project = parts.next()?;
    if parts.next()? != WORKTREES_DIR {
        return None;
    }
    let name = parts.next()?;

    Some(DetectedWorkspace {
        project: project.to_string(),
        name: name.to_string(),
        path: home.join(project).join(WORKTREES_DIR).join(name),
    })
}
