//! Core data structures for the notozen application.
//!
//! This module contains the Note and Folder records as they are stored,
//! plus the partial update applied by the store.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title given to freshly created notes and shown for empty titles.
pub const UNTITLED_NOTE: &str = "Untitled Note";

/// Placeholder shown for notes without content.
pub const NO_CONTENT: &str = "No content";

/// Represents a single note in our system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier for the note
    pub id: String,
    /// Note title, may be empty
    pub title: String,
    /// Note body, may be empty
    pub content: String,
    /// Lowercase tags in insertion order
    pub tags: Vec<String>,
    /// When the note was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Folder this note is filed under, if any
    #[serde(default)]
    pub folder_id: Option<String>,
}

impl Note {
    /// Creates a new, empty note filed under `folder_id`
    pub fn new(id: String, folder_id: Option<String>, now: DateTime<Utc>) -> Self {
        Note {
            id,
            title: UNTITLED_NOTE.to_string(),
            content: String::new(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            folder_id,
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            UNTITLED_NOTE
        } else {
            &self.title
        }
    }

    pub fn display_content(&self) -> &str {
        if self.content.is_empty() {
            NO_CONTENT
        } else {
            &self.content
        }
    }

    /// First non-blank line of the content, cut to `max_chars` characters
    pub fn preview(&self, max_chars: usize) -> String {
        let first_line = self
            .content
            .lines()
            .find(|line| !line.trim().is_empty())
            .unwrap_or(NO_CONTENT);

        if first_line.chars().count() <= max_chars {
            first_line.to_string()
        } else {
            let cut: String = first_line.chars().take(max_chars).collect();
            format!("{}...", cut)
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A named bucket notes can optionally be filed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// Unique identifier for the folder
    pub id: String,
    /// Trimmed, non-empty name
    pub name: String,
    /// When the folder was created
    pub created_at: DateTime<Utc>,
}

/// Partial update of a note; `None` fields are left untouched.
///
/// `folder_id` is doubly optional: `Some(None)` unfiles the note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub id: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub folder_id: Option<Option<String>>,
}

impl NotePatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn folder(mut self, folder_id: Option<String>) -> Self {
        self.folder_id = Some(folder_id);
        self
    }
}
