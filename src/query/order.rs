// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sorting.
//!
//! `sort=-createdAt,title` sorts by `createdAt` descending, then `title`
//! ascending. Every sort ends with `id` ascending so that equal keys keep
//! a fixed order across pages.

use std::cmp::Ordering;

use serde_json::Value;

use super::filter::parse_datetime;

pub const DEFAULT_SORT: &str = "-createdAt";
const TIE_BREAK_FIELD: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    /// Parse a `sort` parameter; missing or blank means [`DEFAULT_SORT`].
    pub fn parse(raw: Option<&str>) -> Self {
        let keys = parse_keys(raw.unwrap_or(DEFAULT_SORT));
        if keys.is_empty() {
            return Self {
                keys: parse_keys(DEFAULT_SORT),
            };
        }
        Self { keys }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        self.keys
            .iter()
            .map(|key| {
                let ordering = compare_values(a.get(&key.field), b.get(&key.field));
                match key.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| {
                compare_values(a.get(TIE_BREAK_FIELD), b.get(TIE_BREAK_FIELD))
            })
    }
}

fn parse_keys(raw: &str) -> Vec<SortKey> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let (field, direction) = match part.strip_prefix('-') {
                Some(field) => (field, SortDirection::Desc),
                None => (part.strip_prefix('+').unwrap_or(part), SortDirection::Asc),
            };
            (!field.is_empty()).then(|| SortKey {
                field: field.to_string(),
                direction,
            })
        })
        .collect()
}

fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Total order over JSON values. Missing values sort first; strings that
/// both parse as timestamps compare chronologically.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (parse_datetime(x), parse_datetime(y)) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        _ => rank(a).cmp(&rank(b)),
    }
}
