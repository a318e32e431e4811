//! Notion report archive

use async_trait::async_trait;
use mia_core::{DeliveryError, Settings};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const NOTION_API_BASE: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

/// Notion rejects rich text longer than this
pub const MAX_BLOCK_CHARS: usize = 2000;

/// Notion accepts at most this many children on page creation
pub const MAX_BLOCKS: usize = 100;

/// Stores finished reports
#[async_trait]
pub trait PageArchive: Send + Sync + std::fmt::Debug {
    /// Create a page titled `title` holding `content`
    async fn archive(&self, title: &str, content: &str) -> Result<(), DeliveryError>;
}

/// Creates one page per report in a Notion database
#[derive(Debug, Clone)]
pub struct NotionArchive {
    client: Client,
    api_key: Option<String>,
    database_id: Option<String>,
    base_url: String,
}

impl NotionArchive {
    #[must_use]
    pub fn new(api_key: Option<String>, database_id: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            database_id,
            base_url: NOTION_API_BASE.to_string(),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let database_id = settings
            .notion_database_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        Self::new(settings.notion_key().map(str::to_string), database_id)
    }

    /// Override API base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Whether both key and database are present
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.database_id.is_some()
    }

    fn page_body(database_id: &str, title: &str, content: &str) -> Value {
        json!({
            "parent": { "database_id": database_id },
            "properties": {
                "Name": { "title": [{ "text": { "content": truncate(title, MAX_BLOCK_CHARS) } }] }
            },
            "children": markdown_blocks(content),
        })
    }
}

#[async_trait]
impl PageArchive for NotionArchive {
    async fn archive(&self, title: &str, content: &str) -> Result<(), DeliveryError> {
        let (Some(api_key), Some(database_id)) = (&self.api_key, &self.database_id) else {
            tracing::warn!("Notion is not configured, skipping archive");
            return Err(DeliveryError::NotConfigured("Notion"));
        };

        let url = format!("{}/pages", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .header("Notion-Version", NOTION_VERSION)
            .timeout(Duration::from_secs(30))
            .json(&Self::page_body(database_id, title, content))
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), %message, "Notion rejected page");
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(title, "Report archived to Notion");
        Ok(())
    }
}

/// Convert markdown-ish text into Notion blocks
///
/// Headings (`#`, `##`, `###`) and bullets (`-`, `*`) map to their block
/// types; everything else becomes paragraphs. Long lines are split.
#[must_use]
pub fn markdown_blocks(content: &str) -> Vec<Value> {
    let mut blocks = Vec::new();
    for line in content.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        let (kind, text) = classify(line);
        for piece in split_chars(text, MAX_BLOCK_CHARS) {
            if blocks.len() == MAX_BLOCKS {
                tracing::warn!("Report truncated to {MAX_BLOCKS} Notion blocks");
                return blocks;
            }
            blocks.push(block(kind, &piece));
        }
    }
    blocks
}

fn classify(line: &str) -> (&'static str, &str) {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix("### ") {
        ("heading_3", rest)
    } else if let Some(rest) = trimmed.strip_prefix("## ") {
        ("heading_2", rest)
    } else if let Some(rest) = trimmed.strip_prefix("# ") {
        ("heading_1", rest)
    } else if let Some(rest) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
    {
        ("bulleted_list_item", rest)
    } else {
        ("paragraph", line)
    }
}

fn block(kind: &str, text: &str) -> Value {
    json!({
        "object": "block",
        "type": kind,
        kind: { "rich_text": [{ "type": "text", "text": { "content": text } }] }
    })
}

fn split_chars(text: &str, max: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(max.max(1)).map(|c| c.iter().collect()).collect()
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
