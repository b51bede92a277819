// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Scoped Query Engine
//!
//! Turns list-request parameters into a bounded, ownership-scoped read:
//!
//! ```text
//! ?title=x&createdAt[gte]=2024-01-01&sort=-createdAt&fields=title&page=2&limit=10
//!     │
//!     ▼
//! QueryParams ──build(schema, OwnershipPredicate, settings)──▶ ScopedQuery
//!                                                                │
//!                                 documents from the store ──execute──▶ page
//! ```
//!
//! The ownership predicate comes from the authenticated context and is
//! always applied first; client filters can only narrow it.

pub mod analytics;
pub mod engine;
pub mod error;
pub mod filter;
pub mod order;
pub mod page;
pub mod params;
pub mod projection;
pub mod schema;
pub mod scope;
pub mod search;

pub use analytics::{NoteStats, NotebookNoteCount};
pub use engine::ScopedQuery;
pub use error::QueryError;
pub use filter::{CompareOp, FilterPolicy};
pub use params::QueryParams;
pub use projection::strip_internal;
pub use schema::{CollectionSchema, NOTEBOOKS, NOTES, USERS};
pub use scope::OwnershipPredicate;
