//! Validation summary: the current error of every invalid field.
//!
//! One entry per field name. Writing an empty message removes the entry, so
//! the summary only ever lists fields that are currently failing. Per-form
//! views are computed from the single list and can never drift from it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One failing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    /// Field name.
    pub field: String,
    /// Display name.
    pub friendly_name: String,
    /// Current error message, never empty.
    pub message: String,
    /// Owning form.
    pub form_name: Option<String>,
}

/// Failing fields in first-failure order.
#[derive(Debug, Clone, Default)]
pub struct ValidationSummary {
    entries: IndexMap<String, SummaryEntry>,
}

impl ValidationSummary {
    /// Creates an empty summary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the message of `field`; an empty message clears the entry.
    pub fn upsert(
        &mut self,
        field: &str,
        message: &str,
        friendly_name: &str,
        form_name: Option<&str>,
    ) {
        if message.trim().is_empty() {
            self.clear(field);
            return;
        }

        if let Some(entry) = self.entries.get_mut(field) {
            entry.message = message.to_owned();
            entry.friendly_name = friendly_name.to_owned();
            entry.form_name = form_name.map(str::to_owned);
            return;
        }

        self.entries.insert(
            field.to_owned(),
            SummaryEntry {
                field: field.to_owned(),
                friendly_name: friendly_name.to_owned(),
                message: message.to_owned(),
                form_name: form_name.map(str::to_owned),
            },
        );
    }

    /// Removes the entry of `field`.
    pub fn clear(&mut self, field: &str) -> Option<SummaryEntry> {
        self.entries.shift_remove(field)
    }

    /// Entry of `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&SummaryEntry> {
        self.entries.get(field)
    }

    /// Whether `field` is failing.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    /// Every entry.
    pub fn all(&self) -> impl Iterator<Item = &SummaryEntry> {
        self.entries.values()
    }

    /// Entries of fields in `form`.
    pub fn for_form<'a>(&'a self, form: &'a str) -> impl Iterator<Item = &'a SummaryEntry> + 'a {
        self.entries
            .values()
            .filter(move |e| e.form_name.as_deref() == Some(form))
    }

    /// Drops every entry.
    pub fn reset_all(&mut self) {
        self.entries.clear();
    }

    /// Number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is failing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Owned copy of the entries, e.g. for serialization.
    #[must_use]
    pub fn to_vec(&self) -> Vec<SummaryEntry> {
        self.entries.values().cloned().collect()
    }
}
