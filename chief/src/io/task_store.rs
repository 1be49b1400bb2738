//! Task document load helpers with schema validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::debug;

use crate::io::paths::WorkspacePaths;
use crate::task::Task;

/// Companion JSON schema for `.chief/tasks.json`.
pub const TASKS_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/tasks.schema.json"
));

/// Read the task document of the workspace at `workspace_root`.
///
/// A missing document means "no tasks yet" and yields an empty list. A document
/// that is not valid JSON or violates the schema is an error: a corrupt task
/// list must stop the loop, not look like an empty one.
pub fn read_tasks(workspace_root: &Path) -> Result<Vec<Task>> {
    let paths = WorkspacePaths::new(workspace_root);
    load_tasks(&paths.tasks_path)
}

/// Load and validate a task document from an explicit path.
pub fn load_tasks(tasks_path: &Path) -> Result<Vec<Task>> {
    if !tasks_path.exists() {
        debug!(path = %tasks_path.display(), "no task document");
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(tasks_path)
        .with_context(|| format!("read tasks {}", tasks_path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse tasks {}", tasks_path.display()))?;
    validate_schema(&value).with_context(|| format!("validate tasks {}", tasks_path.display()))?;
    let tasks: Vec<Task> = serde_json::from_value(value)
        .with_context(|| format!("deserialize tasks {}", tasks_path.display()))?;
    debug!(count = tasks.len(), "task document loaded");
    Ok(tasks)
}

/// Write `tasks.schema.json` into `dir` so the agent can read the contract.
pub fn write_task_schema(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    let path = dir.join("tasks.schema.json");
    fs::write(&path, TASKS_SCHEMA).with_context(|| format!("write {}", path.display()))
}

fn validate_schema(tasks: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(TASKS_SCHEMA).context("parse tasks schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    let messages = compiled
        .iter_errors(tasks)
        .map(|err| err.to_string())
        .collect::<Vec<_>>();
    if !messages.is_empty() {
        return Err(anyhow!(
            "task schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{tasks_with_passes, write_tasks};

    #[test]
    fn missing_document_reads_as_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tasks = read_tasks(temp.path()).expect("read");
        assert!(tasks.is_empty());
    }

    #[test]
    fn reads_written_document() {
        let temp = tempfile::tempdir().expect("tempdir");
        let written = tasks_with_passes(&[true, false, true]);
        write_tasks(temp.path(), &written).expect("write");

        let tasks = read_tasks(temp.path()).expect("read");
        assert_eq!(tasks, written);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = WorkspacePaths::new(temp.path());
        fs::create_dir_all(&paths.chief_dir).expect("mkdir");
        fs::write(&paths.tasks_path, "[{\"category\": ").expect("write");

        let err = read_tasks(temp.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parse tasks"));
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = WorkspacePaths::new(temp.path());
        fs::create_dir_all(&paths.chief_dir).expect("mkdir");
        fs::write(
            &paths.tasks_path,
            r#"[{"category": "ui", "description": "x", "steps": []}]"#,
        )
        .expect("write");

        let err = read_tasks(temp.path()).unwrap_err();
        assert!(format!("{err:#}").contains("schema validation failed"));
    }

    #[test]
    fn additional_fields_are_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = WorkspacePaths::new(temp.path());
        fs::create_dir_all(&paths.chief_dir).expect("mkdir");
        fs::write(
            &paths.tasks_path,
            r#"[{"category": "ui", "description": "x", "passes": false, "steps": [], "priority": 1}]"#,
        )
        .expect("write");

        assert!(read_tasks(temp.path()).is_err());
    }

    #[test]
    fn non_array_document_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = WorkspacePaths::new(temp.path());
        fs::create_dir_all(&paths.chief_dir).expect("mkdir");
        fs::write(&paths.tasks_path, r#"{"tasks": []}"#).expect("write");

        assert!(read_tasks(temp.path()).is_err());
    }

    #[test]
    fn writes_schema_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_task_schema(temp.path()).expect("write schema");
        let written = fs::read_to_string(temp.path().join("tasks.schema.json")).expect("read");
        let value: Value = serde_json::from_str(&written).expect("schema is json");
        assert_eq!(value["type"], "array");
    }
}
