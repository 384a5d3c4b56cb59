//! Tag normalization and editing helpers shared by the store, the CLI and
//! the assistant.

/// Normalizes raw tag input: trims, lowercases and strips commas.
///
/// Returns `None` when nothing is left.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().to_lowercase().replace(',', "");
    let tag = tag.trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}

/// Normalizes a whole tag list, dropping empties and later duplicates.
pub fn normalize_tags<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tags: Vec<String> = Vec::new();
    for tag in raw {
        if let Some(tag) = normalize_tag(tag.as_ref()) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}

/// Appends `raw` to `tags` after normalization.
///
/// Returns false when the input is empty or already present.
pub fn add_tag(tags: &mut Vec<String>, raw: &str) -> bool {
    match normalize_tag(raw) {
        Some(tag) if !tags.contains(&tag) => {
            tags.push(tag);
            true
        }
        _ => false,
    }
}

/// Removes `tag`, keeping the order of the rest.
pub fn remove_tag(tags: &mut Vec<String>, tag: &str) -> bool {
    let tag = normalize_tag(tag).unwrap_or_default();
    let before = tags.len();
    tags.retain(|t| *t != tag);
    tags.len() != before
}

/// Drops the most recently added tag.
pub fn pop_tag(tags: &mut Vec<String>) -> Option<String> {
    tags.pop()
}

/// Appends assistant suggestions that are not already on the note.
///
/// Returns the tags that were actually added, in suggestion order.
pub fn merge_suggested_tags(tags: &mut Vec<String>, suggested: &[String]) -> Vec<String> {
    let mut added = Vec::new();
    for raw in suggested {
        let Some(tag) = normalize_tag(raw) else {
            continue;
        };
        if !tags.contains(&tag) {
            tags.push(tag.clone());
            added.push(tag);
        }
    }
    added
}

// Helper method for parsing comma-separated tags from the command line
pub fn parse_tags(tags: Option<String>) -> Vec<String> {
    tags.map(|t| normalize_tags(t.split(',')))
        .unwrap_or_default()
}
