// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership predicates.
//!
//! Every list query carries one. It is derived from the authenticated
//! context, never from request parameters, and is checked before any
//! client-supplied filter.

use serde_json::Value;

use super::schema::CollectionSchema;
use crate::auth::{AuthenticatedUser, Authorized};

/// Restriction to documents under a parent resource, e.g. the notes of one
/// notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentScope {
    pub field: &'static str,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipPredicate {
    Owner {
        owner_id: String,
        parent: Option<ParentScope>,
    },
    /// Every document of the collection. Only an admin grant produces it.
    Unrestricted,
}

impl OwnershipPredicate {
    /// Documents owned by `user`.
    pub fn owner(user: &AuthenticatedUser) -> Self {
        OwnershipPredicate::Owner {
            owner_id: user.user_id.clone(),
            parent: None,
        }
    }

    /// Documents owned by `user` whose `field` references `parent_id`.
    pub fn owner_within(user: &AuthenticatedUser, field: &'static str, parent_id: &str) -> Self {
        OwnershipPredicate::Owner {
            owner_id: user.user_id.clone(),
            parent: Some(ParentScope {
                field,
                id: parent_id.to_string(),
            }),
        }
    }

    /// Collection-wide access for an admin grant; any other grant stays
    /// scoped to its own documents.
    pub fn for_grant(authorized: &Authorized) -> Self {
        if authorized.granted().is_admin() {
            OwnershipPredicate::Unrestricted
        } else {
            Self::owner(authorized.user())
        }
    }

    pub fn matches(&self, document: &Value, schema: &CollectionSchema) -> bool {
        match self {
            OwnershipPredicate::Unrestricted => true,
            OwnershipPredicate::Owner { owner_id, parent } => {
                field_is(document, schema.owner_field, owner_id)
                    && parent
                        .as_ref()
                        .is_none_or(|parent| field_is(document, parent.field, &parent.id))
            }
        }
    }
}

fn field_is(document: &Value, field: &str, expected: &str) -> bool {
    document.get(field).and_then(Value::as_str) == Some(expected)
}
