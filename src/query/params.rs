// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Raw list-request parameters.
//!
//! `page`, `sort`, `limit`, `fields` and `search` are control keys. Every
//! other key is a filter: `field=value` for equality, or
//! `field[gte|lte|gt|lt]=value` for a comparison. A bracket suffix that is
//! not one of those operators is kept as part of the field name. When a key
//! repeats, the last value wins.

use super::filter::CompareOp;

/// One client-supplied filter condition, not yet typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCondition {
    pub field: String,
    pub op: CompareOp,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub conditions: Vec<RawCondition>,
    pub sort: Option<String>,
    pub fields: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

impl QueryParams {
    /// Parse a URL query string (without the leading `?`).
    pub fn parse(query: &str) -> Self {
        Self::from_pairs(
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(key, value)| (key.into_owned(), value.into_owned())),
        )
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "sort" => params.sort = Some(value),
                "fields" => params.fields = Some(value),
                "page" => params.page = Some(value),
                "limit" => params.limit = Some(value),
                "search" => params.search = Some(value),
                _ => {
                    let (field, op) = split_operator(&key);
                    params.set_condition(field, op, value);
                }
            }
        }
        params
    }

    /// Add or replace the condition for `(field, op)`.
    pub fn set_condition(&mut self, field: impl Into<String>, op: CompareOp, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        match self
            .conditions
            .iter_mut()
            .find(|c| c.field == field && c.op == op)
        {
            Some(existing) => existing.value = value,
            None => self.conditions.push(RawCondition { field, op, value }),
        }
    }
}

fn split_operator(key: &str) -> (&str, CompareOp) {
    if let Some(open) = key.find('[') {
        if let Some(name) = key[open + 1..].strip_suffix(']') {
            if let Some(op) = CompareOp::from_token(name) {
                return (&key[..open], op);
            }
        }
    }
    (key, CompareOp::Eq)
}
