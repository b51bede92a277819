// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Declared attributes of each queryable collection.

/// How filter values for a field are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Bool,
    Number,
    DateTime,
    /// Structured value; not filterable.
    Object,
}

#[derive(Debug)]
pub struct CollectionSchema {
    pub name: &'static str,
    pub fields: &'static [(&'static str, FieldKind)],
    /// Field holding the owning user's id.
    pub owner_field: &'static str,
    /// Fields covered by full-text search.
    pub text_fields: &'static [&'static str],
    /// Bookkeeping fields never returned, filtered or sorted on.
    pub internal_fields: &'static [&'static str],
}

impl CollectionSchema {
    /// Kind of a public field, `None` for undeclared or internal ones.
    pub fn kind(&self, field: &str) -> Option<FieldKind> {
        if self.is_internal(field) {
            return None;
        }
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, kind)| *kind)
    }

    pub fn declares(&self, field: &str) -> bool {
        self.kind(field).is_some()
    }

    pub fn is_internal(&self, field: &str) -> bool {
        self.internal_fields.contains(&field)
    }
}

pub static NOTES: CollectionSchema = CollectionSchema {
    name: "notes",
    fields: &[
        ("id", FieldKind::Text),
        ("title", FieldKind::Text),
        ("description", FieldKind::Text),
        ("content", FieldKind::Text),
        ("location", FieldKind::Object),
        ("favorite", FieldKind::Bool),
        ("createdAt", FieldKind::DateTime),
        ("updatedAt", FieldKind::DateTime),
        ("notebook", FieldKind::Text),
        ("user", FieldKind::Text),
        ("active", FieldKind::Bool),
    ],
    owner_field: "user",
    text_fields: &["content"],
    internal_fields: &["active"],
};

pub static NOTEBOOKS: CollectionSchema = CollectionSchema {
    name: "notebooks",
    fields: &[
        ("id", FieldKind::Text),
        ("title", FieldKind::Text),
        ("color", FieldKind::Text),
        ("createdAt", FieldKind::DateTime),
        ("user", FieldKind::Text),
        ("active", FieldKind::Bool),
    ],
    owner_field: "user",
    text_fields: &[],
    internal_fields: &["active"],
};

/// Public account representation. Credentials are not part of it, so they
/// can never be filtered or sorted on.
pub static USERS: CollectionSchema = CollectionSchema {
    name: "users",
    fields: &[
        ("id", FieldKind::Text),
        ("name", FieldKind::Text),
        ("email", FieldKind::Text),
        ("photo", FieldKind::Text),
        ("role", FieldKind::Text),
        ("createdAt", FieldKind::DateTime),
    ],
    owner_field: "id",
    text_fields: &[],
    internal_fields: &[],
};
