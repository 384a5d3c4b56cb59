//! Shared types for the notozen application.
//!
//! This module contains the crate-wide Result alias and the subcommands
//! understood by the command-line interface.
use std::path::PathBuf;

use clap::Subcommand;

use crate::NotesError;

/// A specialized Result type for notozen operations.
pub type Result<T> = std::result::Result<T, NotesError>;

/// Available subcommands for the notozen application
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new note
    New {
        /// Title of the note
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// Content of the note
        #[clap(short, long)]
        content: Option<String>,

        /// Tags to associate with the note (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,

        /// Folder to file the note under
        #[clap(short, long)]
        folder: Option<String>,
    },

    /// List notes, most recently updated first
    List {
        /// Only show notes with this tag
        #[clap(short, long, conflicts_with = "folder")]
        tag: Option<String>,

        /// Only show notes in this folder
        #[clap(short, long)]
        folder: Option<String>,

        /// Limit the number of notes shown (0 shows all)
        #[clap(short = 'n', long, default_value_t = 0)]
        limit: usize,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Show a note; defaults to the most recently updated one
    Show {
        /// ID of the note to show
        id: Option<String>,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Edit an existing note
    Edit {
        /// ID of the note to edit
        id: String,

        /// New title for the note
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// New content for the note
        #[clap(short, long, conflicts_with_all = ["file", "editor"])]
        content: Option<String>,

        /// Path to a file containing the new note content
        #[clap(long, conflicts_with = "editor")]
        file: Option<PathBuf>,

        /// Open the content in an editor
        #[clap(short, long)]
        editor: bool,

        /// Move the note into this folder
        #[clap(short, long, conflicts_with = "unfile")]
        folder: Option<String>,

        /// Take the note out of its folder
        #[clap(short, long)]
        unfile: bool,
    },

    /// Delete a note by ID
    Delete {
        /// ID of the note to delete
        id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Tag operations on a single note
    Tag {
        /// ID of the note to modify
        id: String,

        /// Tags to add (comma-separated)
        #[clap(short, long)]
        add: Option<String>,

        /// Tags to remove (comma-separated)
        #[clap(short, long)]
        remove: Option<String>,

        /// Remove the most recently added tag
        #[clap(short, long)]
        pop: bool,
    },

    /// List every tag in use
    Tags,

    /// Folder operations
    #[clap(subcommand)]
    Folder(FolderCommands),

    /// Ask the assistant for tags and add the new ones to the note
    SuggestTags {
        /// ID of the note
        id: String,
    },

    /// Ask the assistant for a summary of the note
    Summarize {
        /// ID of the note
        id: String,
    },

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,
    },
}

/// Folder subcommands
#[derive(Subcommand, Debug)]
pub enum FolderCommands {
    /// Create a folder
    New {
        /// Name of the folder
        name: String,
    },

    /// List folders with their note counts
    List,

    /// Delete a folder; its notes become unfiled
    Delete {
        /// ID of the folder
        id: String,
    },
}
