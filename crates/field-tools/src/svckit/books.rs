//! Book by theme

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use agent_core::{Result as CoreResult, Tool, ToolCall, ToolSchema, tool::ParameterSchema};

use crate::source::BookCatalog;

/// Picks a random book for a subject
pub struct BookByThemeTool {
    catalog: Arc<dyn BookCatalog>,
}

impl BookByThemeTool {
    pub fn new(catalog: Arc<dyn BookCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for BookByThemeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "book_by_theme".into(),
            description: "Find a book about a theme or subject. Returns title, author and up to five subjects.".into(),
            parameters: vec![ParameterSchema::required(
                "theme",
                "string",
                "Theme, e.g. 'identity' or 'historical fiction'",
            )],
            category: Some("books".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<Value> {
        let theme = call.arguments.get("theme").and_then(Value::as_str).unwrap_or_default();
        tracing::debug!(theme, source = self.catalog.name(), "Searching books");
        let book = self.catalog.book_by_theme(theme).await?;
        Ok(serde_json::to_value(book)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockBookCatalog;
    use serde_json::json;

    #[tokio::test]
    async fn test_book_by_theme() {
        let tool = BookByThemeTool::new(Arc::new(MockBookCatalog));
        let book = tool
            .execute(&ToolCall::new("book_by_theme", json!({"theme": "mountains"})))
            .await
            .unwrap();
        assert_eq!(book["author"], "Jon Krakauer");

        assert!(tool
            .execute(&ToolCall::new("book_by_theme", json!({"theme": "nothing at all"})))
            .await
            .is_err());
    }
}
