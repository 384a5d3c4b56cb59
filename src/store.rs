//! The Note/Folder store.
//!
//! `NoteStore` owns the authoritative collections of notes and folders, the
//! selection state (active note, tag filter, folder filter) and the
//! key-value backend they are hydrated from and flushed to. Every mutation is
//! synchronous and leaves the store consistent: no note ever points at a
//! deleted folder and tags are always normalized.

use chrono::{DateTime, Utc};
use log::{debug, info, trace, warn};

use crate::{
    helper, Config, Folder, KeyValueStore, Note, NotePatch, NotesError, Result, DEFAULT_NAMESPACE,
};

pub struct NoteStore<S: KeyValueStore> {
    backend: S,
    notes_key: String,
    folders_key: String,

    notes: Vec<Note>,
    folders: Vec<Folder>,
    active_note_id: Option<String>,
    selected_tag: Option<String>,
    selected_folder_id: Option<String>,

    /// Set once `hydrate` has run, successfully or not
    hydrated: bool,
    /// Collections changed since the last successful flush
    dirty: bool,
    /// Last id handed out, in milliseconds
    last_id: i64,
}

/// Orders notes most-recently-updated first; the sort is stable so equal
/// timestamps keep collection order.
fn sort_by_recency(notes: &mut [&Note]) {
    notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

fn most_recent<'a>(notes: impl Iterator<Item = &'a Note>) -> Option<&'a Note> {
    let mut notes: Vec<&Note> = notes.collect();
    sort_by_recency(&mut notes);
    notes.first().copied()
}

impl<S: KeyValueStore> NoteStore<S> {
    /// Creates an empty, not yet hydrated store using the default keys.
    pub fn new(backend: S) -> Self {
        Self::with_keys(
            backend,
            format!("{}-notes", DEFAULT_NAMESPACE),
            format!("{}-folders", DEFAULT_NAMESPACE),
        )
    }

    /// Creates a store using the keys of `config`.
    pub fn from_config(backend: S, config: &Config) -> Self {
        Self::with_keys(backend, config.notes_key(), config.folders_key())
    }

    fn with_keys(backend: S, notes_key: String, folders_key: String) -> Self {
        Self {
            backend,
            notes_key,
            folders_key,
            notes: Vec::new(),
            folders: Vec::new(),
            active_note_id: None,
            selected_tag: None,
            selected_folder_id: None,
            hydrated: false,
            dirty: false,
            last_id: 0,
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn into_backend(self) -> S {
        self.backend
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Whether there are changes a `persist` call would write.
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    // ---- hydrate / persist ------------------------------------------------

    /// Loads notes and folders from the backend.
    ///
    /// On failure the store carries on with empty collections and the error
    /// is handed back so the caller can tell the user.
    pub fn hydrate(&mut self) -> Result<()> {
        info!("Hydrating store from {} / {}", self.notes_key, self.folders_key);

        let loaded = self
            .load_collection::<Note>(&self.notes_key)
            .and_then(|notes| Ok((notes, self.load_collection::<Folder>(&self.folders_key)?)));

        self.hydrated = true;
        self.dirty = false;
        self.active_note_id = None;
        self.selected_tag = None;
        self.selected_folder_id = None;

        match loaded {
            Ok((notes, folders)) => {
                self.notes = notes;
                self.folders = folders;
                self.repair_loaded();
                self.last_id = self.max_numeric_id();
                self.active_note_id = most_recent(self.notes.iter()).map(|n| n.id.clone());
                info!(
                    "Loaded {} notes and {} folders",
                    self.notes.len(),
                    self.folders.len()
                );
                Ok(())
            }
            Err(e) => {
                warn!("Starting with empty collections: {}", e);
                self.notes.clear();
                self.folders.clear();
                Err(e)
            }
        }
    }

    /// Brings loaded data in line with what mutations guarantee: tags are
    /// normalized and no note is filed under a folder that was not loaded.
    fn repair_loaded(&mut self) {
        let folders = &self.folders;
        for note in &mut self.notes {
            let tags = helper::normalize_tags(&note.tags);
            if tags != note.tags {
                debug!("Normalized stored tags of note {}", note.id);
                note.tags = tags;
            }

            let dangling = note
                .folder_id
                .as_deref()
                .is_some_and(|id| !folders.iter().any(|f| f.id == id));
            if dangling {
                warn!(
                    "Note {} refers to missing folder {:?}, unfiling it",
                    note.id, note.folder_id
                );
                note.folder_id = None;
            }
        }
    }

    fn load_collection<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let raw = self.backend.get(key).map_err(|e| NotesError::LoadFailed {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        match raw {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| NotesError::LoadFailed {
                key: key.to_string(),
                message: e.to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }

    /// Writes both collections to the backend if they changed.
    ///
    /// Does nothing before `hydrate` has run. On failure the in-memory state
    /// is kept as is and stays marked as unsaved.
    pub fn persist(&mut self) -> Result<()> {
        if !self.hydrated {
            debug!("Skipping persist: store not hydrated yet");
            return Ok(());
        }
        if !self.dirty {
            trace!("Skipping persist: nothing changed");
            return Ok(());
        }

        let notes = serde_json::to_string(&self.notes).map_err(|e| NotesError::SaveFailed {
            key: self.notes_key.clone(),
            message: e.to_string(),
        })?;
        let folders = serde_json::to_string(&self.folders).map_err(|e| NotesError::SaveFailed {
            key: self.folders_key.clone(),
            message: e.to_string(),
        })?;

        // Folders go first so saved notes never name an unsaved folder
        self.backend
            .set(&self.folders_key, &folders)
            .map_err(|e| NotesError::SaveFailed {
                key: self.folders_key.clone(),
                message: e.to_string(),
            })?;
        self.backend
            .set(&self.notes_key, &notes)
            .map_err(|e| NotesError::SaveFailed {
                key: self.notes_key.clone(),
                message: e.to_string(),
            })?;

        self.dirty = false;
        debug!(
            "Persisted {} notes and {} folders",
            self.notes.len(),
            self.folders.len()
        );
        Ok(())
    }

    // ---- id and clock -----------------------------------------------------

    fn max_numeric_id(&self) -> i64 {
        self.notes
            .iter()
            .map(|n| n.id.as_str())
            .chain(self.folders.iter().map(|f| f.id.as_str()))
            .filter_map(|id| id.parse::<i64>().ok())
            .max()
            .unwrap_or(0)
    }

    /// Millisecond timestamp ids, bumped so they never repeat.
    fn next_id(&mut self, now: DateTime<Utc>) -> String {
        let millis = now.timestamp_millis();
        match self.last_id.checked_add(1) {
            Some(bumped) => {
                let id = millis.max(bumped);
                self.last_id = id;
                id.to_string()
            }
            None => {
                // Numeric ids are exhausted by loaded data
                warn!("Numeric ids exhausted, using a suffixed id");
                (1u64..)
                    .map(|n| format!("{}-{}", millis, n))
                    .find(|id| self.note(id).is_none() && self.folder(id).is_none())
                    .unwrap_or_default()
            }
        }
    }

    // ---- read access ------------------------------------------------------

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn folder(&self, id: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.id == id)
    }

    pub fn active_note_id(&self) -> Option<&str> {
        self.active_note_id.as_deref()
    }

    pub fn active_note(&self) -> Option<&Note> {
        self.active_note_id.as_deref().and_then(|id| self.note(id))
    }

    pub fn selected_tag(&self) -> Option<&str> {
        self.selected_tag.as_deref()
    }

    pub fn selected_folder_id(&self) -> Option<&str> {
        self.selected_folder_id.as_deref()
    }

    /// Notes passing the current folder or tag filter, most recently
    /// updated first.
    pub fn visible_notes(&self) -> Vec<&Note> {
        let mut notes: Vec<&Note> = if let Some(folder_id) = &self.selected_folder_id {
            self.notes
                .iter()
                .filter(|n| n.folder_id.as_ref() == Some(folder_id))
                .collect()
        } else if let Some(tag) = &self.selected_tag {
            self.notes.iter().filter(|n| n.has_tag(tag)).collect()
        } else {
            self.notes.iter().collect()
        };
        sort_by_recency(&mut notes);
        notes
    }

    /// Every tag in use, deduplicated and sorted.
    pub fn all_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .notes
            .iter()
            .flat_map(|n| n.tags.iter().cloned())
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    // ---- mutations --------------------------------------------------------

    /// Creates an empty note in the selected folder and makes it active.
    pub fn create_note(&mut self) -> &Note {
        let now = Utc::now();
        let id = self.next_id(now);
        let note = Note::new(id.clone(), self.selected_folder_id.clone(), now);
        debug!("Created note {}", id);

        self.notes.insert(0, note);
        self.active_note_id = Some(id);
        self.selected_tag = None;
        self.dirty = true;
        &self.notes[0]
    }

    /// Creates a folder and selects it. Blank names are ignored.
    pub fn create_folder(&mut self, name: &str) -> Option<&Folder> {
        let name = name.trim();
        if name.is_empty() {
            debug!("Ignoring folder with empty name");
            return None;
        }

        let now = Utc::now();
        let id = self.next_id(now);
        self.folders.push(Folder {
            id: id.clone(),
            name: name.to_string(),
            created_at: now,
        });
        debug!("Created folder {} ({})", id, name);
        self.dirty = true;
        self.select_folder(Some(id.as_str()));
        self.folders.last()
    }

    /// Removes a note. If it was active, the most recently updated remaining
    /// note becomes active regardless of the current filters.
    pub fn delete_note(&mut self, id: &str) -> bool {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        if self.notes.len() == before {
            debug!("delete_note: no note {}", id);
            return false;
        }

        if self.active_note_id.as_deref() == Some(id) {
            self.active_note_id = most_recent(self.notes.iter()).map(|n| n.id.clone());
        }
        self.dirty = true;
        info!("Deleted note {}", id);
        true
    }

    /// Removes a folder and unfiles its notes. The notes keep their
    /// `updated_at`.
    pub fn delete_folder(&mut self, id: &str) -> bool {
        let before = self.folders.len();
        self.folders.retain(|f| f.id != id);
        if self.folders.len() == before {
            debug!("delete_folder: no folder {}", id);
            return false;
        }

        let mut unfiled = 0;
        for note in self
            .notes
            .iter_mut()
            .filter(|n| n.folder_id.as_deref() == Some(id))
        {
            note.folder_id = None;
            unfiled += 1;
        }

        if self.selected_folder_id.as_deref() == Some(id) {
            self.selected_folder_id = None;
        }
        self.dirty = true;
        info!("Deleted folder {} ({} notes unfiled)", id, unfiled);
        true
    }

    /// Merges `patch` into its note and stamps `updated_at`.
    ///
    /// Returns false when no note has `patch.id`. A folder id naming no
    /// existing folder is ignored.
    pub fn update_note(&mut self, patch: NotePatch) -> bool {
        let folder_id = match patch.folder_id {
            Some(Some(folder_id)) if self.folder(&folder_id).is_none() => {
                warn!(
                    "Ignoring unknown folder {} in update of note {}",
                    folder_id, patch.id
                );
                None
            }
            other => other,
        };

        let Some(note) = self.notes.iter_mut().find(|n| n.id == patch.id) else {
            debug!("update_note: no note {}", patch.id);
            return false;
        };

        if let Some(title) = patch.title {
            note.title = title;
        }
        if let Some(content) = patch.content {
            note.content = content;
        }
        if let Some(tags) = patch.tags {
            note.tags = helper::normalize_tags(tags);
        }
        if let Some(folder_id) = folder_id {
            note.folder_id = folder_id;
        }
        note.updated_at = Utc::now().max(note.updated_at);

        trace!("Updated note {}", note.id);
        self.dirty = true;
        true
    }

    /// Makes an existing note active.
    pub fn select_note(&mut self, id: &str) -> bool {
        if self.note(id).is_none() {
            return false;
        }
        self.active_note_id = Some(id.to_string());
        true
    }

    /// Sets the tag filter (clearing the folder filter) and activates the
    /// most recently updated note under it.
    pub fn select_tag(&mut self, tag: Option<&str>) {
        self.selected_tag = tag.map(str::to_string);
        self.selected_folder_id = None;
        self.active_note_id = most_recent(
            self.notes
                .iter()
                .filter(|n| tag.map_or(true, |tag| n.has_tag(tag))),
        )
        .map(|n| n.id.clone());
    }

    /// Sets the folder filter and clears the tag filter. Unknown folder ids
    /// are ignored.
    pub fn select_folder(&mut self, id: Option<&str>) -> bool {
        if let Some(id) = id {
            if self.folder(id).is_none() {
                debug!("select_folder: no folder {}", id);
                return false;
            }
        }
        self.selected_folder_id = id.map(str::to_string);
        self.selected_tag = None;
        true
    }

    // ---- tag editing ------------------------------------------------------

    /// Adds a normalized tag to a note; duplicates and blanks are no-ops.
    pub fn add_tag(&mut self, note_id: &str, tag: &str) -> bool {
        let Some(mut tags) = self.note(note_id).map(|n| n.tags.clone()) else {
            return false;
        };
        helper::add_tag(&mut tags, tag) && self.update_note(NotePatch::new(note_id).tags(tags))
    }

    pub fn remove_tag(&mut self, note_id: &str, tag: &str) -> bool {
        let Some(mut tags) = self.note(note_id).map(|n| n.tags.clone()) else {
            return false;
        };
        helper::remove_tag(&mut tags, tag) && self.update_note(NotePatch::new(note_id).tags(tags))
    }

    /// Removes the last tag of a note.
    pub fn pop_tag(&mut self, note_id: &str) -> Option<String> {
        let mut tags = self.note(note_id)?.tags.clone();
        let popped = helper::pop_tag(&mut tags)?;
        self.update_note(NotePatch::new(note_id).tags(tags));
        Some(popped)
    }

    /// Appends assistant-suggested tags the note does not have yet.
    ///
    /// Returns `None` if the note no longer exists, otherwise the tags that
    /// were added.
    pub fn apply_suggested_tags(
        &mut self,
        note_id: &str,
        suggested: &[String],
    ) -> Option<Vec<String>> {
        let mut tags = self.note(note_id)?.tags.clone();
        let added = helper::merge_suggested_tags(&mut tags, suggested);
        if !added.is_empty() {
            self.update_note(NotePatch::new(note_id).tags(tags));
        }
        Some(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn note(id: &str, updated: i64, tags: &[&str], folder: Option<&str>) -> Note {
        Note {
            id: id.to_string(),
            title: format!("note {}", id),
            content: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: at(0),
            updated_at: at(updated),
            folder_id: folder.map(str::to_string),
        }
    }

    fn folder(id: &str) -> Folder {
        Folder {
            id: id.to_string(),
            name: format!("folder {}", id),
            created_at: at(0),
        }
    }

    fn hydrated(notes: Vec<Note>, folders: Vec<Folder>) -> NoteStore<MemoryStore> {
        let backend = MemoryStore::new()
            .with_value("notozen-notes", &serde_json::to_string(&notes).unwrap())
            .with_value("notozen-folders", &serde_json::to_string(&folders).unwrap());
        let mut store = NoteStore::new(backend);
        store.hydrate().unwrap();
        store
    }

    fn ids(notes: &[&Note]) -> Vec<String> {
        notes.iter().map(|n| n.id.clone()).collect()
    }

    #[test]
    fn hydrate_activates_most_recently_updated() {
        let store = hydrated(
            vec![note("a", 1, &[], None), note("b", 5, &[], None), note("c", 3, &[], None)],
            vec![],
        );

        assert_eq!(store.active_note_id(), Some("b"));
        assert_eq!(store.notes().len(), 3);
        assert!(!store.has_unsaved_changes());
    }

    #[test]
    fn hydrate_of_empty_backend_starts_empty() {
        let mut store = NoteStore::new(MemoryStore::new());
        store.hydrate().unwrap();

        assert!(store.notes().is_empty());
        assert!(store.folders().is_empty());
        assert_eq!(store.active_note_id(), None);
    }

    #[test]
    fn hydrate_failure_leaves_empty_usable_store() {
        let backend = MemoryStore::new()
            .with_value("notozen-notes", "[{\"id\": 1")
            .with_value("notozen-folders", "[]");
        let mut store = NoteStore::new(backend);

        let err = store.hydrate().unwrap_err();
        assert!(matches!(err, NotesError::LoadFailed { ref key, .. } if key == "notozen-notes"));
        assert!(store.is_hydrated());
        assert!(store.notes().is_empty());

        // Nothing is written back until something actually changes
        store.persist().unwrap();
        assert_eq!(
            store.backend().get("notozen-notes").unwrap().as_deref(),
            Some("[{\"id\": 1")
        );

        store.create_note();
        store.persist().unwrap();
        let saved: Vec<Note> =
            serde_json::from_str(&store.backend().get("notozen-notes").unwrap().unwrap()).unwrap();
        assert_eq!(saved.len(), 1);
    }

    #[test]
    fn corrupt_folders_also_empty_notes() {
        let backend = MemoryStore::new()
            .with_value(
                "notozen-notes",
                &serde_json::to_string(&vec![note("a", 1, &[], None)]).unwrap(),
            )
            .with_value("notozen-folders", "nope");
        let mut store = NoteStore::new(backend);

        assert!(store.hydrate().is_err());
        assert!(store.notes().is_empty());
        assert_eq!(store.active_note_id(), None);
    }

    #[test]
    fn persist_is_skipped_before_hydrate() {
        let mut store = NoteStore::new(MemoryStore::new().with_value("notozen-notes", "[]"));
        store.create_note();

        store.persist().unwrap();
        assert_eq!(store.backend().get("notozen-notes").unwrap().as_deref(), Some("[]"));
        assert_eq!(store.backend().get("notozen-folders").unwrap(), None);
    }

    #[test]
    fn persist_then_hydrate_reproduces_state() {
        let mut store = hydrated(vec![], vec![]);
        store.create_folder("Work");
        let first = store.create_note().id.clone();
        store.update_note(
            NotePatch::new(&first)
                .title("Plan")
                .content("ship it")
                .tags(vec!["zeta".into(), "alpha".into(), "mid".into()]),
        );
        store.select_folder(None);
        let second = store.create_note().id.clone();
        store.persist().unwrap();

        let mut reloaded = NoteStore::new(store.backend().clone());
        reloaded.hydrate().unwrap();

        assert_eq!(reloaded.notes(), store.notes());
        assert_eq!(reloaded.folders(), store.folders());
        assert_eq!(reloaded.note(&first).unwrap().tags, vec!["zeta", "alpha", "mid"]);
        assert_eq!(reloaded.note(&second).unwrap().folder_id, None);
    }

    #[test]
    fn create_note_goes_first_and_clears_tag_filter() {
        let mut store = hydrated(vec![note("a", 1, &["work"], None)], vec![]);
        store.select_tag(Some("work"));

        let id = store.create_note().id.clone();

        assert_eq!(store.selected_tag(), None);
        assert_eq!(store.active_note_id(), Some(id.as_str()));
        assert_eq!(store.notes()[0].id, id);
        let created = store.note(&id).unwrap();
        assert_eq!(created.title, "Untitled Note");
        assert_eq!(created.created_at, created.updated_at);
        assert!(store.has_unsaved_changes());
    }

    #[test]
    fn create_note_files_into_selected_folder() {
        let mut store = hydrated(vec![], vec![folder("f1")]);
        store.select_folder(Some("f1"));

        let id = store.create_note().id.clone();

        assert_eq!(store.note(&id).unwrap().folder_id.as_deref(), Some("f1"));
        assert_eq!(store.selected_folder_id(), Some("f1"));
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut store = hydrated(vec![], vec![]);
        let a: i64 = store.create_note().id.parse().unwrap();
        let b: i64 = store.create_note().id.parse().unwrap();
        let f: i64 = store.create_folder("x").unwrap().id.parse().unwrap();

        assert!(a < b && b < f);
    }

    #[test]
    fn ids_continue_after_loaded_ids() {
        let far_future = (Utc::now().timestamp_millis() + 1_000_000).to_string();
        let mut store = hydrated(vec![note(&far_future, 1, &[], None)], vec![]);

        let id: i64 = store.create_note().id.parse().unwrap();
        assert!(id > far_future.parse::<i64>().unwrap());
    }

    #[test]
    fn create_folder_ignores_blank_names() {
        let mut store = hydrated(vec![], vec![]);

        assert!(store.create_folder("   ").is_none());
        assert!(store.folders().is_empty());
        assert!(!store.has_unsaved_changes());
    }

    #[test]
    fn create_folder_trims_appends_and_selects() {
        let mut store = hydrated(vec![note("a", 1, &["x"], None)], vec![folder("f0")]);
        store.select_tag(Some("x"));

        let id = store.create_folder("  Projects ").unwrap().id.clone();

        assert_eq!(store.folders().last().unwrap().name, "Projects");
        assert_eq!(store.selected_folder_id(), Some(id.as_str()));
        assert_eq!(store.selected_tag(), None);
    }

    #[test]
    fn deleting_active_note_activates_most_recent_globally() {
        let mut store = hydrated(
            vec![
                note("a", 3, &["t"], None),
                note("b", 2, &[], None),
                note("c", 1, &["t"], None),
            ],
            vec![],
        );
        store.select_tag(Some("t"));
        assert_eq!(store.active_note_id(), Some("a"));

        assert!(store.delete_note("a"));
        // b is outside the tag filter but still wins
        assert_eq!(store.active_note_id(), Some("b"));

        store.delete_note("b");
        store.delete_note("c");
        assert_eq!(store.active_note_id(), None);
    }

    #[test]
    fn deleting_other_note_keeps_active() {
        let mut store = hydrated(vec![note("a", 3, &[], None), note("b", 2, &[], None)], vec![]);

        assert!(store.delete_note("b"));
        assert_eq!(store.active_note_id(), Some("a"));
        assert!(!store.delete_note("missing"));
    }

    #[test]
    fn deleting_folder_unfiles_without_touching_timestamps() {
        let mut store = hydrated(
            vec![
                note("a", 3, &[], Some("f1")),
                note("b", 2, &[], Some("f2")),
                note("c", 1, &[], Some("f1")),
            ],
            vec![folder("f1"), folder("f2")],
        );
        store.select_folder(Some("f1"));

        assert!(store.delete_folder("f1"));

        assert_eq!(store.notes().len(), 3);
        assert_eq!(store.note("a").unwrap().folder_id, None);
        assert_eq!(store.note("c").unwrap().folder_id, None);
        assert_eq!(store.note("b").unwrap().folder_id.as_deref(), Some("f2"));
        assert_eq!(store.note("a").unwrap().updated_at, at(3));
        assert_eq!(store.selected_folder_id(), None);
        assert!(store.folder("f1").is_none());
        assert!(!store.delete_folder("f1"));
    }

    #[test]
    fn update_merges_fields_and_refreshes_timestamp() {
        let mut store = hydrated(vec![note("a", 1, &[], None)], vec![folder("f1")]);
        let before = store.note("a").unwrap().updated_at;

        assert!(store.update_note(NotePatch::new("a").content("body")));
        let after_content = store.note("a").unwrap().clone();
        assert_eq!(after_content.title, "note a");
        assert_eq!(after_content.content, "body");
        assert!(after_content.updated_at > before);

        assert!(store.update_note(NotePatch::new("a").folder(Some("f1".into()))));
        let after_folder = store.note("a").unwrap();
        assert_eq!(after_folder.folder_id.as_deref(), Some("f1"));
        assert!(after_folder.updated_at >= after_content.updated_at);

        assert!(store.update_note(NotePatch::new("a").folder(None)));
        assert_eq!(store.note("a").unwrap().folder_id, None);
    }

    #[test]
    fn update_never_moves_timestamp_backwards() {
        let future = Utc::now() + chrono::Duration::days(365);
        let mut n = note("a", 0, &[], None);
        n.updated_at = future;
        let mut store = hydrated(vec![n], vec![]);

        store.update_note(NotePatch::new("a").title("x"));
        assert_eq!(store.note("a").unwrap().updated_at, future);
    }

    #[test]
    fn update_of_unknown_note_is_noop() {
        let mut store = hydrated(vec![note("a", 1, &[], None)], vec![]);

        assert!(!store.update_note(NotePatch::new("zzz").title("x")));
        assert!(!store.has_unsaved_changes());
    }

    #[test]
    fn update_ignores_unknown_folder_but_applies_rest() {
        let mut store = hydrated(vec![note("a", 1, &[], None)], vec![]);

        assert!(store.update_note(NotePatch::new("a").title("t").folder(Some("ghost".into()))));
        assert_eq!(store.note("a").unwrap().folder_id, None);
        assert_eq!(store.note("a").unwrap().title, "t");
    }

    #[test]
    fn update_normalizes_tags() {
        let mut store = hydrated(vec![note("a", 1, &[], None)], vec![]);

        store.update_note(NotePatch::new("a").tags(vec!["B".into(), " a ".into(), "b".into()]));
        assert_eq!(store.note("a").unwrap().tags, vec!["b", "a"]);
    }

    #[test]
    fn select_tag_filters_and_picks_active() {
        let mut store = hydrated(
            vec![
                note("a", 5, &["x"], Some("f1")),
                note("b", 4, &["y"], None),
                note("c", 3, &["y"], None),
            ],
            vec![folder("f1")],
        );
        store.select_folder(Some("f1"));

        store.select_tag(Some("y"));
        assert_eq!(store.selected_folder_id(), None);
        assert_eq!(store.active_note_id(), Some("b"));
        assert_eq!(ids(&store.visible_notes()), vec!["b", "c"]);

        store.select_tag(Some("nothing"));
        assert_eq!(store.active_note_id(), None);
        assert!(store.visible_notes().is_empty());

        store.select_tag(None);
        assert_eq!(store.active_note_id(), Some("a"));
        assert_eq!(store.visible_notes().len(), 3);
    }

    #[test]
    fn select_folder_clears_tag_and_filters() {
        let mut store = hydrated(
            vec![note("a", 1, &["x"], Some("f1")), note("b", 2, &["x"], None)],
            vec![folder("f1")],
        );
        store.select_tag(Some("x"));

        assert!(store.select_folder(Some("f1")));
        assert_eq!(store.selected_tag(), None);
        assert_eq!(ids(&store.visible_notes()), vec!["a"]);

        assert!(!store.select_folder(Some("ghost")));
        assert_eq!(store.selected_folder_id(), Some("f1"));

        assert!(store.select_folder(None));
        assert_eq!(ids(&store.visible_notes()), vec!["b", "a"]);
    }

    #[test]
    fn visible_notes_sorted_by_recency_stably() {
        let store = hydrated(
            vec![
                note("old", 1, &[], None),
                note("tie1", 5, &[], None),
                note("new", 9, &[], None),
                note("tie2", 5, &[], None),
            ],
            vec![],
        );

        assert_eq!(ids(&store.visible_notes()), vec!["new", "tie1", "tie2", "old"]);
    }

    #[test]
    fn all_tags_deduplicated_and_sorted() {
        let store = hydrated(
            vec![note("1", 1, &["a", "b"], None), note("2", 2, &["b", "c"], None)],
            vec![],
        );

        assert_eq!(store.all_tags(), vec!["a", "b", "c"]);
    }

    #[test]
    fn tag_editing_through_store() {
        let mut store = hydrated(vec![note("a", 1, &[], None)], vec![]);

        assert!(store.add_tag("a", "  Work "));
        assert!(!store.add_tag("a", "work"));
        assert!(store.add_tag("a", "home"));
        assert_eq!(store.note("a").unwrap().tags, vec!["work", "home"]);

        assert!(store.remove_tag("a", "WORK"));
        assert_eq!(store.pop_tag("a"), Some("home".to_string()));
        assert_eq!(store.pop_tag("a"), None);
        assert!(!store.add_tag("missing", "x"));
    }

    #[test]
    fn suggested_tags_are_not_duplicated() {
        let mut store = hydrated(vec![note("a", 1, &["rust"], None)], vec![]);

        let added = store
            .apply_suggested_tags("a", &["Rust".into(), "CLI".into()])
            .unwrap();
        assert_eq!(added, vec!["cli"]);
        assert_eq!(store.note("a").unwrap().tags, vec!["rust", "cli"]);

        assert_eq!(store.apply_suggested_tags("gone", &["x".into()]), None);
    }

    #[test]
    fn select_note_requires_existing_note() {
        let mut store = hydrated(vec![note("a", 2, &[], None), note("b", 1, &[], None)], vec![]);

        assert!(store.select_note("b"));
        assert_eq!(store.active_note().unwrap().id, "b");
        assert!(!store.select_note("zzz"));
        assert_eq!(store.active_note_id(), Some("b"));
    }

    /// Backend whose writes to one key fail until `fail_key` is cleared.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_key: Option<String>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            if self.fail_key.as_deref() == Some(key) {
                return Err(NotesError::ApplicationError {
                    message: "disk full".to_string(),
                });
            }
            self.inner.set(key, value)
        }
    }

    #[test]
    fn ids_stay_unique_when_loaded_id_is_max() {
        let max = i64::MAX.to_string();
        let mut store = hydrated(vec![note(&max, 1, &[], None)], vec![]);

        let first = store.create_note().id.clone();
        let second = store.create_note().id.clone();
        let folder = store.create_folder("Work").unwrap().id.clone();

        assert_ne!(first, max);
        assert_ne!(first, second);
        assert_ne!(folder, first);
        assert_ne!(folder, second);
        assert_eq!(store.notes().len(), 3);
    }

    #[test]
    fn failed_write_keeps_changes_pending() {
        let mut store = NoteStore::new(FlakyStore {
            fail_key: Some("notozen-notes".to_string()),
            ..FlakyStore::default()
        });
        store.hydrate().unwrap();
        let id = store.create_note().id.clone();

        let err = store.persist().unwrap_err();
        assert!(matches!(err, NotesError::SaveFailed { ref key, .. } if key == "notozen-notes"));
        assert_eq!(store.notes().len(), 1);
        assert_eq!(store.active_note_id(), Some(id.as_str()));
        assert!(store.has_unsaved_changes());

        store.backend.fail_key = None;
        store.persist().unwrap();
        assert!(!store.has_unsaved_changes());
        let saved: Vec<Note> =
            serde_json::from_str(&store.backend().get("notozen-notes").unwrap().unwrap()).unwrap();
        assert_eq!(saved[0].id, id);
    }

    #[test]
    fn failed_folder_write_leaves_no_dangling_reference() {
        let mut store = NoteStore::new(FlakyStore {
            fail_key: Some("notozen-folders".to_string()),
            ..FlakyStore::default()
        });
        store.hydrate().unwrap();
        store.create_folder("Work");
        store.create_note();

        let err = store.persist().unwrap_err();
        assert!(matches!(err, NotesError::SaveFailed { ref key, .. } if key == "notozen-folders"));
        assert_eq!(store.backend().get("notozen-notes").unwrap(), None);

        let mut reloaded = NoteStore::new(store.into_backend().inner);
        reloaded.hydrate().unwrap();
        assert!(reloaded.notes().is_empty());
    }

    #[test]
    fn hydrate_unfiles_notes_of_missing_folders() {
        let store = hydrated(
            vec![note("a", 2, &[], Some("gone")), note("b", 1, &[], Some("f1"))],
            vec![folder("f1")],
        );

        assert_eq!(store.note("a").unwrap().folder_id, None);
        assert_eq!(store.note("b").unwrap().folder_id.as_deref(), Some("f1"));
    }

    #[test]
    fn hydrate_normalizes_stored_tags() {
        let mut store = hydrated(vec![note("a", 1, &["Rust", " web ", "rust"], None)], vec![]);

        assert_eq!(store.note("a").unwrap().tags, vec!["rust", "web"]);
        assert!(!store.add_tag("a", "rust"));
        assert_eq!(store.note("a").unwrap().tags, vec!["rust", "web"]);
    }
}
