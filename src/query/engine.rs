// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Query execution.
//!
//! Steps run in a fixed order over the documents the store returns:
//! ownership, internal-field stripping, filter, text search, sort,
//! pagination, projection.

use serde_json::Value;

use super::{
    filter::{CompareOp, Filter, FilterPolicy, Operand, Predicate},
    order::SortSpec,
    page::Page,
    params::QueryParams,
    projection::{strip_internal, Projection},
    schema::CollectionSchema,
    scope::OwnershipPredicate,
    search::TextSearch,
    QueryError,
};
use crate::config::QuerySettings;

#[derive(Debug, Clone)]
pub struct ScopedQuery {
    schema: &'static CollectionSchema,
    scope: OwnershipPredicate,
    filter: Filter,
    search: Option<TextSearch>,
    sort: SortSpec,
    projection: Projection,
    page: Page,
}

impl ScopedQuery {
    /// Compile request parameters under a mandatory ownership predicate.
    pub fn build(
        schema: &'static CollectionSchema,
        scope: OwnershipPredicate,
        params: &QueryParams,
        settings: &QuerySettings,
    ) -> Result<Self, QueryError> {
        let policy = if settings.strict_filters {
            FilterPolicy::AllowList
        } else {
            FilterPolicy::Permissive
        };
        Ok(Self {
            schema,
            scope,
            filter: Filter::compile(&params.conditions, schema, policy)?,
            search: None,
            sort: SortSpec::parse(params.sort.as_deref()),
            projection: Projection::parse(params.fields.as_deref(), schema),
            page: Page::resolve(
                params.page.as_deref(),
                params.limit.as_deref(),
                settings.max_page_size,
            ),
        })
    }

    /// Enable full-text matching. Only the search endpoint calls this; on
    /// plain listings a `search` parameter is ignored.
    pub fn with_text_search(mut self, raw: Option<&str>) -> Self {
        if !self.schema.text_fields.is_empty() {
            self.search = TextSearch::parse(raw);
        }
        self
    }

    /// Add a server-side equality condition on a boolean field.
    pub fn require_flag(mut self, field: &str, value: bool) -> Self {
        self.filter = self
            .filter
            .and(Predicate::new(field, CompareOp::Eq, Operand::Bool(value)));
        self
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn scope(&self) -> &OwnershipPredicate {
        &self.scope
    }

    /// Run the query over `documents` and return the requested page.
    pub fn execute<I>(&self, documents: I) -> Vec<Value>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut rows: Vec<Value> = documents
            .into_iter()
            .filter(|document| self.scope.matches(document, self.schema))
            .map(|document| strip_internal(document, self.schema))
            .filter(|document| self.filter.matches(document))
            .filter(|document| {
                self.search
                    .as_ref()
                    .is_none_or(|search| search.matches(document, self.schema))
            })
            .collect();

        rows.sort_by(|a, b| self.sort.compare(a, b));

        rows.into_iter()
            .skip(self.page.skip())
            .take(self.page.limit)
            .map(|document| self.projection.apply(document))
            .collect()
    }
}
