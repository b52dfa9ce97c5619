//! Directory listing under a fixed root

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Value, json};

use agent_core::{Result as CoreResult, Tool, ToolCall, ToolSchema, tool::ParameterSchema};

use crate::error::{Result, ToolsError};

/// Lists one folder below `root`. Paths may not escape the root.
pub struct ListDirectoryTool {
    root: PathBuf,
}

impl ListDirectoryTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `~/Desktop`, falling back to the working directory
    pub fn desktop() -> Self {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        Self::new(home.map_or_else(|| PathBuf::from("."), |h| h.join("Desktop")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, folder: &str) -> Result<PathBuf> {
        let relative = Path::new(folder);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ToolsError::InvalidInput(format!(
                "'{folder}' must be a folder name below the root"
            )));
        }
        Ok(self.root.join(relative))
    }

    async fn list(&self, folder: &str) -> Result<(PathBuf, Vec<String>)> {
        let target = self.resolve(folder)?;
        if !tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Err(ToolsError::NotFound(format!("folder '{}'", target.display())));
        }

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&target).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_dir() {
                entries.push(format!("[DIR] {name}"));
            } else {
                entries.push(name);
            }
        }
        entries.sort();
        Ok((target, entries))
    }
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_directory".into(),
            description: "List the files in a folder. Folders are marked with [DIR]. Leave 'folder' empty for the top level.".into(),
            parameters: vec![ParameterSchema::optional(
                "folder",
                "string",
                "Folder name below the root",
                Some(json!("")),
            )],
            category: Some("files".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<Value> {
        let folder = call.arguments.get("folder").and_then(Value::as_str).unwrap_or_default();
        let (path, entries) = self.list(folder).await?;
        Ok(json!({ "path": path.display().to_string(), "entries": entries }))
    }
}
