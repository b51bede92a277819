// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mindful - Notebook & Note API Service
//!
//! Users own notebooks, notebooks own notes. Sessions are HS256 tokens sent
//! as a bearer header or an http-only cookie, and every list endpoint runs
//! through an ownership-scoped query engine.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Sessions, password hashing, password recovery, role checks
//! - `query` - Filter, sort, projection, pagination and search over owned documents
//! - `storage` - Document store (in-memory or JSON files)
//! - `mail` - Outbound email

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod mail;
pub mod models;
pub mod query;
pub mod state;
pub mod storage;
