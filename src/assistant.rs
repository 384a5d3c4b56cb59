//! Tag suggestion and summarization through an external assistant service.
//!
//! The service is a black box reached through the [`Assistant`] trait. The
//! orchestration functions never hold the store lock while a request is
//! outstanding, so the store can change underneath a request; results are
//! applied to the note they were requested for, by id, and discarded if
//! that note is gone.

use std::{
    collections::HashSet,
    fmt,
    future::Future,
    sync::{Arc, Mutex as StdMutex},
};

use log::{debug, info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{KeyValueStore, NoteStore, NotesError, Result};

/// The external collaborator.
pub trait Assistant {
    /// Suggests tags for a note body, in order of relevance.
    fn suggest_tags(&self, content: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Produces a short summary of a note body.
    fn summarize(&self, content: &str) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssistantAction {
    SuggestTags,
    Summarize,
}

impl fmt::Display for AssistantAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssistantAction::SuggestTags => write!(f, "Tag suggestion"),
            AssistantAction::Summarize => write!(f, "Summarization"),
        }
    }
}

type PendingSet = Arc<StdMutex<HashSet<(AssistantAction, String)>>>;

/// Tracks which (action, note) pairs have a request outstanding.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    pending: PendingSet,
}

/// Marks a request as outstanding until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    pending: PendingSet,
    key: (AssistantAction, String),
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a request, failing if the same action is already running
    /// for the same note.
    pub fn begin(&self, action: AssistantAction, note_id: &str) -> Result<InFlightGuard> {
        let key = (action, note_id.to_string());
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| NotesError::ApplicationError {
                message: "Failed to acquire lock on pending assistant requests".to_string(),
            })?;

        if !pending.insert(key.clone()) {
            return Err(NotesError::AssistantBusy {
                action: action.to_string(),
                note_id: note_id.to_string(),
            });
        }

        Ok(InFlightGuard {
            pending: Arc::clone(&self.pending),
            key,
        })
    }

    pub fn is_pending(&self, action: AssistantAction, note_id: &str) -> bool {
        self.pending
            .lock()
            .map(|pending| pending.contains(&(action, note_id.to_string())))
            .unwrap_or(false)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&self.key);
        }
    }
}

async fn content_for<S: KeyValueStore>(
    store: &Mutex<NoteStore<S>>,
    note_id: &str,
) -> Result<String> {
    let store = store.lock().await;
    let note = store.note(note_id).ok_or_else(|| NotesError::NoteNotFound {
        id: note_id.to_string(),
    })?;

    if note.content.is_empty() {
        return Err(NotesError::EmptyContent {
            id: note_id.to_string(),
        });
    }
    Ok(note.content.clone())
}

/// Asks the assistant for tags and appends the ones the note lacks.
///
/// Returns the tags that were added.
pub async fn suggest_tags_for_note<S, A>(
    store: &Mutex<NoteStore<S>>,
    assistant: &A,
    in_flight: &InFlight,
    note_id: &str,
) -> Result<Vec<String>>
where
    S: KeyValueStore,
    A: Assistant,
{
    let content = content_for(store, note_id).await?;
    let _guard = in_flight.begin(AssistantAction::SuggestTags, note_id)?;

    debug!("Requesting tag suggestions for note {}", note_id);
    let suggested = assistant.suggest_tags(&content).await.map_err(|e| {
        warn!("Tag suggestion failed for note {}: {}", note_id, e);
        e
    })?;

    let mut store = store.lock().await;
    match store.apply_suggested_tags(note_id, &suggested) {
        Some(added) => {
            info!("Added {} suggested tags to note {}", added.len(), note_id);
            Ok(added)
        }
        None => {
            warn!("Note {} was deleted before suggestions arrived; discarding", note_id);
            Err(NotesError::NoteNotFound {
                id: note_id.to_string(),
            })
        }
    }
}

/// Asks the assistant for a summary. The note itself is left unchanged.
pub async fn summarize_note<S, A>(
    store: &Mutex<NoteStore<S>>,
    assistant: &A,
    in_flight: &InFlight,
    note_id: &str,
) -> Result<String>
where
    S: KeyValueStore,
    A: Assistant,
{
    let content = content_for(store, note_id).await?;
    let _guard = in_flight.begin(AssistantAction::Summarize, note_id)?;

    debug!("Requesting summary for note {}", note_id);
    assistant.summarize(&content).await.map_err(|e| {
        warn!("Summarization failed for note {}: {}", note_id, e);
        e
    })
}

// HTTP collaborator

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssistantRequest<'a> {
    note_content: &'a str,
}

#[derive(Debug, Deserialize)]
struct SuggestTagsResponse {
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    summary: String,
}

/// Talks to an assistant service over JSON/HTTP.
#[derive(Debug, Clone)]
pub struct HttpAssistant {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAssistant {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, content: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .json(&AssistantRequest {
                note_content: content,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotesError::Assistant {
                message: format!("{} returned HTTP {}: {}", url, status, body),
            });
        }

        resp.json::<T>().await.map_err(|e| NotesError::Assistant {
            message: format!("Unexpected response from {}: {}", url, e),
        })
    }
}

impl Assistant for HttpAssistant {
    async fn suggest_tags(&self, content: &str) -> Result<Vec<String>> {
        let resp: SuggestTagsResponse = self.post("suggest-tags", content).await?;
        Ok(resp.tags)
    }

    async fn summarize(&self, content: &str) -> Result<String> {
        let resp: SummaryResponse = self.post("summarize", content).await?;
        Ok(resp.summary)
    }
}
