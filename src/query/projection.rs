// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Field selection (`fields=title,content` or `fields=-content`).
//!
//! `id` is always kept. Names the collection does not declare are ignored;
//! if nothing usable is left the full public document is returned.

use serde_json::Value;

use super::schema::CollectionSchema;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    #[default]
    All,
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl Projection {
    pub fn parse(raw: Option<&str>, schema: &CollectionSchema) -> Self {
        let Some(raw) = raw else {
            return Projection::All;
        };
        let names: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect();

        let included: Vec<String> = names
            .iter()
            .filter(|name| !name.starts_with('-') && schema.declares(name))
            .map(|name| name.to_string())
            .collect();
        if !included.is_empty() {
            return Projection::Include(included);
        }
        if names.iter().any(|name| !name.starts_with('-')) {
            return Projection::All;
        }

        let excluded: Vec<String> = names
            .iter()
            .filter_map(|name| name.strip_prefix('-'))
            .filter(|name| *name != "id" && schema.declares(name))
            .map(str::to_string)
            .collect();
        if excluded.is_empty() {
            Projection::All
        } else {
            Projection::Exclude(excluded)
        }
    }

    pub fn apply(&self, document: Value) -> Value {
        let Value::Object(mut map) = document else {
            return document;
        };
        match self {
            Projection::All => {}
            Projection::Include(fields) => {
                map.retain(|key, _| key == "id" || fields.iter().any(|f| f == key));
            }
            Projection::Exclude(fields) => {
                map.retain(|key, _| !fields.iter().any(|f| f == key));
            }
        }
        Value::Object(map)
    }
}

/// Remove bookkeeping fields from a stored document.
pub fn strip_internal(document: Value, schema: &CollectionSchema) -> Value {
    let Value::Object(mut map) = document else {
        return document;
    };
    map.retain(|key, _| !schema.is_internal(key));
    Value::Object(map)
}
