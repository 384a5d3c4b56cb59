//! CLI module for the notozen application
//!
//! This module handles the command-line interface for interacting with the
//! note store.
use std::{
    fs::{read_to_string, OpenOptions},
    io::{stdin, stdout, Write},
    path::Path,
    process::Command,
    sync::Arc,
};

use log::{debug, info, warn};
use shell_words::split;
use tempfile::Builder;
use tokio::sync::Mutex;

use crate::{
    parse_tags, summarize_note, suggest_tags_for_note, Commands, Config, FileStore,
    FolderCommands, HttpAssistant, InFlight, Note, NotePatch, NoteStore, NotesError, Result,
};

/// Prints a non-fatal problem for the user.
pub fn notice(message: impl std::fmt::Display) {
    warn!("{}", message);
    eprintln!("{} {}", console::style("notice:").yellow().bold(), message);
}

/// CLI Application handler - processes CLI commands against the note store
pub struct App {
    /// The note store, hydrated on open
    store: Arc<Mutex<NoteStore<FileStore>>>,

    /// Application configuration
    config: Config,

    /// Outstanding assistant requests
    in_flight: InFlight,

    /// Whether to display verbose output
    verbose: bool,
}

impl App {
    /// Opens the store described by `config` and hydrates it.
    ///
    /// A store that fails to load is reported and replaced by an empty one.
    pub fn open(config: Config, verbose: bool) -> Self {
        let backend = FileStore::new(&config.data_dir);
        let mut store = NoteStore::from_config(backend, &config);

        if let Err(e) = store.hydrate() {
            notice(format!("Could not load saved notes, starting empty: {}", e));
        }

        Self {
            store: Arc::new(Mutex::new(store)),
            config,
            in_flight: InFlight::new(),
            verbose,
        }
    }

    /// Run the CLI application with the given command, then save changes
    pub async fn run(&self, command: Commands) -> Result<()> {
        let outcome = self.dispatch(command).await;
        let saved = self.flush().await;
        outcome.and(saved)
    }

    async fn dispatch(&self, command: Commands) -> Result<()> {
        match command {
            Commands::New {
                title,
                content,
                tags,
                folder,
            } => self.create_note(title, content, tags, folder).await,

            Commands::List {
                tag,
                folder,
                limit,
                json,
            } => self.list_notes(tag, folder, limit, json).await,

            Commands::Show { id, json } => self.show_note(id, json).await,

            Commands::Edit {
                id,
                title,
                content,
                file,
                editor,
                folder,
                unfile,
            } => {
                self.handle_edit(id, title, content, file.as_deref(), editor, folder, unfile)
                    .await
            }

            Commands::Delete { id, force } => self.handle_delete(id, force).await,

            Commands::Tag {
                id,
                add,
                remove,
                pop,
            } => self.handle_tag(id, add, remove, pop).await,

            Commands::Tags => self.list_tags().await,

            Commands::Folder(command) => self.handle_folder(command).await,

            Commands::SuggestTags { id } => self.handle_suggest_tags(id).await,

            Commands::Summarize { id } => self.handle_summarize(id).await,

            Commands::Config { show } => self.handle_config(show),
        }
    }

    /// Writes pending changes, reporting a failed save as a notice.
    async fn flush(&self) -> Result<()> {
        let mut store = self.store.lock().await;
        if let Err(e) = store.persist() {
            notice(format!("Changes could not be saved: {}", e));
            return Err(e);
        }
        Ok(())
    }

    async fn create_note(
        &self,
        title: Option<String>,
        content: Option<String>,
        tags: Option<String>,
        folder: Option<String>,
    ) -> Result<()> {
        let mut store = self.store.lock().await;

        if let Some(folder_id) = &folder {
            if !store.select_folder(Some(folder_id.as_str())) {
                return Err(NotesError::FolderNotFound {
                    id: folder_id.clone(),
                });
            }
        }

        let id = store.create_note().id.clone();

        let mut patch = NotePatch::new(&id);
        patch.title = title;
        patch.content = content;
        if tags.is_some() {
            patch.tags = Some(parse_tags(tags));
        }
        if patch != NotePatch::new(&id) {
            store.update_note(patch);
        }

        println!("Note created with ID: {}", id);
        Ok(())
    }

    /// List notes under the requested filter
    async fn list_notes(
        &self,
        tag: Option<String>,
        folder: Option<String>,
        limit: usize,
        json: bool,
    ) -> Result<()> {
        let mut store = self.store.lock().await;

        if let Some(folder_id) = &folder {
            if !store.select_folder(Some(folder_id.as_str())) {
                return Err(NotesError::FolderNotFound {
                    id: folder_id.clone(),
                });
            }
        } else if let Some(tag) = &tag {
            let tag = crate::normalize_tag(tag).unwrap_or_default();
            store.select_tag(Some(tag.as_str()));
        }

        let mut notes = store.visible_notes();
        if limit > 0 && notes.len() > limit {
            notes.truncate(limit);
        }

        if json {
            println!("{}", serde_json::to_string_pretty(&notes)?);
            return Ok(());
        }

        if notes.is_empty() {
            println!("No notes found matching the criteria.");
            return Ok(());
        }

        self.display_notes_text(&store, &notes);
        println!(
            "\nFound {} note{}",
            notes.len(),
            if notes.len() == 1 { "" } else { "s" }
        );
        Ok(())
    }

    /// Display notes in text format
    fn display_notes_text(&self, store: &NoteStore<FileStore>, notes: &[&Note]) {
        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, note) in notes.iter().enumerate() {
            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }

            let marker = if store.active_note_id() == Some(note.id.as_str()) {
                "*"
            } else {
                " "
            };
            let folder = note
                .folder_id
                .as_deref()
                .and_then(|id| store.folder(id))
                .map(|f| format!(" | Folder: {}", f.name))
                .unwrap_or_default();

            println!(
                "{} ID: {} | Updated: {}{}",
                marker,
                note.id,
                note.updated_at.format("%b %-d"),
                folder
            );
            println!("  {}", console::style(note.display_title()).bold());
            if !note.tags.is_empty() {
                let tags = note
                    .tags
                    .iter()
                    .map(|tag| format!("#{}", tag))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("  {}", console::style(tags).cyan());
            }
            println!("  {}", note.preview(term_width.saturating_sub(6).max(20)));
        }
    }

    async fn show_note(&self, id: Option<String>, json: bool) -> Result<()> {
        let store = self.store.lock().await;

        let note = match &id {
            Some(id) => store
                .note(id)
                .ok_or_else(|| NotesError::NoteNotFound { id: id.clone() })?,
            None => match store.active_note() {
                Some(note) => note,
                None => {
                    println!("No notes yet. Create one with `notozen new`.");
                    return Ok(());
                }
            },
        };

        if json {
            println!("{}", serde_json::to_string_pretty(note)?);
            return Ok(());
        }

        println!("{}", console::style(note.display_title()).bold());
        println!(
            "ID: {} | Created: {} | Updated: {}",
            note.id,
            note.created_at.format("%Y-%m-%d %H:%M"),
            note.updated_at.format("%Y-%m-%d %H:%M")
        );
        if let Some(folder) = note.folder_id.as_deref().and_then(|id| store.folder(id)) {
            println!("Folder: {} ({})", folder.name, folder.id);
        }
        if !note.tags.is_empty() {
            println!("Tags: {}", console::style(note.tags.join(", ")).cyan());
        }
        println!("\n{}", note.display_content());
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_edit(
        &self,
        id: String,
        title: Option<String>,
        content: Option<String>,
        file: Option<&Path>,
        open_editor: bool,
        folder: Option<String>,
        unfile: bool,
    ) -> Result<()> {
        let (current_title, current_content) = {
            let store = self.store.lock().await;
            let note = store
                .note(&id)
                .ok_or_else(|| NotesError::NoteNotFound { id: id.clone() })?;
            if let Some(folder_id) = &folder {
                if store.folder(folder_id).is_none() {
                    return Err(NotesError::FolderNotFound {
                        id: folder_id.clone(),
                    });
                }
            }
            (note.title.clone(), note.content.clone())
        };

        let mut patch = NotePatch::new(&id);
        patch.title = title;

        if let Some(new_content) = content {
            patch.content = Some(new_content);
        } else if let Some(file_path) = file {
            patch.content = Some(self.read_content_from_file(file_path)?);
            println!("Content updated from file: {}", file_path.display());
        } else if open_editor {
            let title = patch.title.as_deref().unwrap_or(&current_title);
            patch.content = Some(self.open_editor_with_content(title, &current_content)?);
            println!("Content updated from editor");
        }

        if unfile {
            patch.folder_id = Some(None);
        } else if folder.is_some() {
            patch.folder_id = Some(folder);
        }

        if patch == NotePatch::new(&id) {
            println!("Nothing to change for note {}", id);
            return Ok(());
        }

        self.store.lock().await.update_note(patch);
        println!("Note {} updated successfully", id);
        Ok(())
    }

    fn read_content_from_file(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(NotesError::FileNotFound {
                file_path: path.display().to_string(),
            });
        }
        read_to_string(path).map_err(NotesError::Io)
    }

    fn open_editor_with_content(&self, title: &str, existing_content: &str) -> Result<String> {
        let temp_file = Builder::new().suffix(".md").tempfile()?;
        let temp_path = temp_file.path().to_path_buf();

        {
            let mut file = OpenOptions::new().write(true).open(&temp_path)?;
            writeln!(
                file,
                "<!-- Editing \"{}\". Lines like this one are ignored. Save and exit when done. -->",
                title
            )?;
            write!(file, "{}", existing_content)?;
        }

        let editor_cmd = self.config.get_editor_command();
        info!("Opening editor to write note content. Save and exit when done...");
        self.launch_editor(&editor_cmd, &temp_path)?;

        let content = read_to_string(&temp_path)?;
        Ok(process_editor_content(&content))
    }

    fn launch_editor(&self, editor_cmd: &str, file_path: &Path) -> Result<()> {
        let args = split(editor_cmd).map_err(|e| NotesError::EditorError {
            message: format!("Failed to parse editor command: {}", e),
        })?;

        let Some((program, rest)) = args.split_first() else {
            return Err(NotesError::EditorError {
                message: "Empty editor command".to_string(),
            });
        };

        debug!("Launching editor {} {:?}", program, rest);
        let status = Command::new(program)
            .args(rest)
            .arg(file_path)
            .status()
            .map_err(|e| NotesError::EditorError {
                message: format!("Failed to execute editor command: {}", e),
            })?;

        if !status.success() {
            return Err(NotesError::EditorError {
                message: "Editor exited with non-zero status".to_string(),
            });
        }
        Ok(())
    }

    async fn handle_delete(&self, id: String, force: bool) -> Result<()> {
        let title = {
            let store = self.store.lock().await;
            let note = store
                .note(&id)
                .ok_or_else(|| NotesError::NoteNotFound { id: id.clone() })?;

            if !force {
                println!("You are about to delete the following note:");
                println!("ID:      {}", note.id);
                println!("Title:   {}", note.display_title());
                println!("Tags:    {}", note.tags.join(", "));
                println!("Updated: {}", note.updated_at.format("%Y-%m-%d %H:%M:%S"));
            }
            note.display_title().to_string()
        };

        if !force {
            println!("\nThis action cannot be undone!");
            print!("Are you sure you want to delete this note? [y/N]: ");
            stdout().flush().map_err(NotesError::Io)?;

            let mut input = String::new();
            stdin().read_line(&mut input).map_err(NotesError::Io)?;

            let input = input.trim().to_lowercase();
            if input != "y" && input != "yes" {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        let mut store = self.store.lock().await;
        store.delete_note(&id);
        println!("Note '{}' ({}) has been permanently deleted.", title, id);
        if self.verbose {
            match store.active_note() {
                Some(note) => println!("Active note is now {} ({})", note.display_title(), note.id),
                None => println!("No notes left."),
            }
        }
        Ok(())
    }

    async fn handle_tag(
        &self,
        id: String,
        add: Option<String>,
        remove: Option<String>,
        pop: bool,
    ) -> Result<()> {
        let mut store = self.store.lock().await;
        if store.note(&id).is_none() {
            return Err(NotesError::NoteNotFound { id });
        }

        for tag in parse_tags(add) {
            if !store.add_tag(&id, &tag) {
                println!("Tag '{}' is already on the note", tag);
            }
        }
        for tag in parse_tags(remove) {
            if !store.remove_tag(&id, &tag) {
                println!("Tag '{}' is not on the note", tag);
            }
        }
        if pop {
            match store.pop_tag(&id) {
                Some(tag) => println!("Removed tag '{}'", tag),
                None => println!("The note has no tags"),
            }
        }

        let tags = store.note(&id).map(|n| n.tags.join(", ")).unwrap_or_default();
        if tags.is_empty() {
            println!("No tags");
        } else {
            println!("Tags: {}", console::style(tags).cyan());
        }
        Ok(())
    }

    async fn list_tags(&self) -> Result<()> {
        let store = self.store.lock().await;
        let tags = store.all_tags();
        if tags.is_empty() {
            println!("No tags yet.");
        }
        for tag in tags {
            let count = store.notes().iter().filter(|n| n.has_tag(&tag)).count();
            println!("{} ({})", tag, count);
        }
        Ok(())
    }

    async fn handle_folder(&self, command: FolderCommands) -> Result<()> {
        let mut store = self.store.lock().await;
        match command {
            FolderCommands::New { name } => {
                let folder = store.create_folder(&name).ok_or(NotesError::EmptyFolderName)?;
                println!("Folder '{}' created with ID: {}", folder.name, folder.id);
            }
            FolderCommands::List => {
                if store.folders().is_empty() {
                    println!("No folders yet.");
                }
                for folder in store.folders() {
                    let count = store
                        .notes()
                        .iter()
                        .filter(|n| n.folder_id.as_deref() == Some(folder.id.as_str()))
                        .count();
                    println!(
                        "{}  {} ({} note{})",
                        folder.id,
                        console::style(&folder.name).bold(),
                        count,
                        if count == 1 { "" } else { "s" }
                    );
                }
            }
            FolderCommands::Delete { id } => {
                if !store.delete_folder(&id) {
                    return Err(NotesError::FolderNotFound { id });
                }
                println!("Folder {} deleted; its notes are now unfiled.", id);
            }
        }
        Ok(())
    }

    fn assistant(&self) -> Result<HttpAssistant> {
        self.config
            .assistant_url
            .as_deref()
            .map(HttpAssistant::new)
            .ok_or(NotesError::AssistantUnavailable)
    }

    async fn handle_suggest_tags(&self, id: String) -> Result<()> {
        let assistant = self.assistant()?;
        let added = suggest_tags_for_note(&*self.store, &assistant, &self.in_flight, &id).await?;

        if added.is_empty() {
            println!("No new tags suggested.");
        } else {
            println!("Tags suggested! Added: {}", console::style(added.join(", ")).cyan());
        }
        Ok(())
    }

    async fn handle_summarize(&self, id: String) -> Result<()> {
        let assistant = self.assistant()?;
        let summary = summarize_note(&*self.store, &assistant, &self.in_flight, &id).await?;

        println!("{}", console::style("Note Summary").bold());
        println!("\n{}", summary);
        Ok(())
    }

    fn handle_config(&self, show: bool) -> Result<()> {
        if show {
            println!("{}", serde_json::to_string_pretty(&self.config)?);
        } else if let Some(path) = Config::default_path() {
            println!("Configuration file: {}", path.display());
        }
        Ok(())
    }
}

/// Drops single-line `<!-- ... -->` comments the editor template adds.
fn process_editor_content(content: &str) -> String {
    content
        .lines()
        .filter(|line| {
            let line = line.trim();
            !(line.starts_with("<!--") && line.ends_with("-->"))
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editor_comments_are_stripped() {
        let raw = "<!-- Editing \"x\". -->\nfirst\n  <!-- inline -->\nsecond <!-- kept -->";
        assert_eq!(process_editor_content(raw), "first\nsecond <!-- kept -->");
    }
}
