//! Worktree and branch naming.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum length of the descriptive part of a worktree name.
pub const MAX_NAME_LEN: usize = 30;

static NON_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex is valid"));
static WORKTREE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9-]*[a-z0-9]$|^[a-z0-9]$").expect("static regex is valid")
});

/// Reduce free text (typically the agent's suggestion) to a kebab-case slug.
///
/// Takes the last non-empty line, lowercases it, collapses anything that is not
/// `[a-z0-9]` into single dashes and cuts at [`MAX_NAME_LEN`]. Returns `None` when
/// nothing usable remains.
pub fn slugify(raw: &str) -> Option<String> {
    let line = raw.lines().rev().map(str::trim).find(|l| !l.is_empty())?;
    let lowered = line.to_lowercase();
    let slug = NON_SLUG_RE.replace_all(&lowered, "-");
    let mut slug = slug.trim_matches('-').to_string();
    if slug.len() > MAX_NAME_LEN {
        slug.truncate(MAX_NAME_LEN);
        slug = slug.trim_end_matches('-').to_string();
    }
    (!slug.is_empty()).then_some(slug)
}

/// True if `name` can be used as both a directory name and a branch name.
pub fn is_valid_worktree_name(name: &str) -> bool {
    WORKTREE_NAME_RE.is_match(name)
}

/// `<slug>-<suffix>`, the final worktree and branch name.
pub fn worktree_name(slug: &str, suffix: &str) -> String {
    format!("{slug}-{suffix}")
}
