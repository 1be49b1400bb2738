//! Normalization of verification steps into the dash-list form used in prompts.

/// Turn free-form verification input into one `- <step>` line per step.
///
/// Lines are trimmed and blank lines dropped. A line that already starts with a
/// dash keeps its text, re-spaced as `- <text>`. Returns an empty string when no
/// step remains.
pub fn normalize_steps(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let step = line.strip_prefix('-').map(str::trim_start).unwrap_or(line);
            (!step.is_empty()).then(|| format!("- {step}"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
