//! Error types for the notozen application.
//!
//! This module defines custom error types that categorize the failures
//! that can occur while loading, editing and saving notes.

use std::{io, path::PathBuf};

use thiserror::Error;

/// The main error type for the notozen application.
#[derive(Error, Debug)]
pub enum NotesError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored data under a key could not be read or deserialized.
    #[error("Failed to load {key}: {message}")]
    LoadFailed { key: String, message: String },

    /// In-memory data could not be serialized or written under a key.
    #[error("Failed to save {key}: {message}")]
    SaveFailed { key: String, message: String },

    /// Note was not found when performing an operation.
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// Folder was not found when performing an operation.
    #[error("Folder not found: {id}")]
    FolderNotFound { id: String },

    /// Folder names must contain something other than whitespace.
    #[error("Folder name cannot be empty")]
    EmptyFolderName,

    /// The assistant needs note content to work with.
    #[error("Note {id} has no content; add some content to the note first")]
    EmptyContent { id: String },

    /// The assistant request failed or returned something unusable.
    #[error("Assistant error: {message}")]
    Assistant { message: String },

    /// Transport-level failure talking to the assistant.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The same assistant action is already running for this note.
    #[error("{action} is already in progress for note {note_id}")]
    AssistantBusy { action: String, note_id: String },

    /// No assistant endpoint is configured.
    #[error("No assistant configured; set assistant_url or NOTOZEN_ASSISTANT_URL")]
    AssistantUnavailable,

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// file not found
    #[error("File not found: {file_path}")]
    FileNotFound { file_path: String },

    #[error("{message}")]
    EditorError { message: String },

    /// Generic application error with a custom message.
    #[error("{message}")]
    ApplicationError { message: String },
}
