// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A filter value could not be read as the field's declared type.
    #[error("Invalid {field}: {value}.")]
    InvalidValue { field: String, value: String },

    /// Filter on a field outside the collection's allow-list.
    #[error("Filtering on '{0}' is not allowed")]
    FieldNotFilterable(String),
}
