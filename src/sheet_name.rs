//! Worksheet name sanitization

use std::collections::HashSet;

use crate::types::UNKNOWN_COUNTRY;

/// Longest sheet name the xlsx format accepts
pub const MAX_SHEET_NAME_LEN: usize = 31;

const INVALID_CHARS: &[char] = &['\\', '/', '*', '?', ':', '[', ']'];

/// Names already handed out for one workbook.
///
/// Lookups ignore case, as sheet names in a workbook do.
#[derive(Debug, Default)]
pub struct SheetNameRegistry {
    used: HashSet<String>,
}

impl SheetNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.used.contains(&name.to_lowercase())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.used.len()
    }

    /// Sanitize `name` and reserve a unique variant of it
    pub fn assign(&mut self, name: &str) -> String {
        sanitize_sheet_name(name, self)
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// Excel rejects names that begin or end with an apostrophe
fn trim_edges(s: &str) -> &str {
    s.trim_matches(|c: char| c == '\'' || c.is_whitespace())
}

/// Strip characters that are invalid in sheet names and collapse whitespace
fn clean(name: &str) -> String {
    let stripped: String = name.chars().filter(|c| !INVALID_CHARS.contains(c)).collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated = truncate_chars(trim_edges(&collapsed), MAX_SHEET_NAME_LEN);
    // the cut can expose a new trailing apostrophe or space
    let trimmed = trim_edges(&truncated);
    if trimmed.is_empty() {
        UNKNOWN_COUNTRY.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Produce a valid sheet name not yet present in `registry`, and register it.
///
/// Collisions get `_1`, `_2`, ... appended, cutting the base short so the
/// result still fits in 31 characters.
pub fn sanitize_sheet_name(name: &str, registry: &mut SheetNameRegistry) -> String {
    let base = clean(name);
    let mut candidate = base.clone();
    let mut counter = 1usize;

    while registry.contains(&candidate) {
        let suffix = format!("_{}", counter);
        let room = MAX_SHEET_NAME_LEN.saturating_sub(suffix.chars().count());
        candidate = format!("{}{}", truncate_chars(&base, room), suffix);
        counter += 1;
    }

    registry.used.insert(candidate.to_lowercase());
    candidate
}
