// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Full-text search over a collection's text fields.
//!
//! Terms and document text are split on non-alphanumeric characters and
//! lowercased; a document matches when any term equals any word.

use serde_json::Value;

use super::schema::CollectionSchema;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSearch {
    terms: Vec<String>,
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

impl TextSearch {
    /// `None` for a missing or blank search, meaning "no text predicate".
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let terms: Vec<String> = words(raw?).collect();
        (!terms.is_empty()).then_some(Self { terms })
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn matches(&self, document: &Value, schema: &CollectionSchema) -> bool {
        schema
            .text_fields
            .iter()
            .filter_map(|field| document.get(*field).and_then(Value::as_str))
            .any(|text| words(text).any(|word| self.terms.contains(&word)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::schema::NOTES;
    use serde_json::json;

    #[test]
    fn blank_search_is_no_search() {
        assert_eq!(TextSearch::parse(None), None);
        assert_eq!(TextSearch::parse(Some("   ")), None);
        assert_eq!(TextSearch::parse(Some(" -- ")), None);
    }

    #[test]
    fn matches_any_whole_word_case_insensitively() {
        let search = TextSearch::parse(Some("Rust  tokio")).unwrap();
        assert_eq!(search.terms(), &["rust".to_string(), "tokio".to_string()]);

        assert!(search.matches(&json!({"content": "Learning RUST today"}), &NOTES));
        assert!(search.matches(&json!({"content": "async with tokio, again"}), &NOTES));
        assert!(!search.matches(&json!({"content": "rusty nails"}), &NOTES));
        assert!(!search.matches(&json!({"title": "rust"}), &NOTES));
    }
}
