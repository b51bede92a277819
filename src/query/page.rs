// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

/// Page size when the request does not name one.
pub const DEFAULT_LIMIT: usize = 100;

/// Resolved pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub limit: usize,
}

impl Page {
    /// Missing, unparsable or zero values fall back to page 1 and the
    /// default size; the size is capped at `max_limit`.
    pub fn resolve(page: Option<&str>, limit: Option<&str>, max_limit: usize) -> Self {
        let max_limit = max_limit.max(1);
        let number = positive(page).unwrap_or(1);
        let limit = positive(limit)
            .unwrap_or(DEFAULT_LIMIT)
            .min(max_limit);
        Self { number, limit }
    }

    pub fn skip(&self) -> usize {
        (self.number - 1).saturating_mul(self.limit)
    }
}

fn positive(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
}
