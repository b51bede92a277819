// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed filter predicates.
//!
//! Values for declared fields are read as the field's kind, so
//! `favorite=yes` is an error instead of a silent empty result. Fields the
//! collection does not declare are compared loosely against whatever the
//! document holds (and usually match nothing), unless the policy is
//! [`FilterPolicy::AllowList`].

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use super::{
    params::RawCondition,
    schema::{CollectionSchema, FieldKind},
    QueryError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    /// Operator named inside `field[...]`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "gt" => Some(CompareOp::Gt),
            "gte" => Some(CompareOp::Gte),
            "lt" => Some(CompareOp::Lt),
            "lte" => Some(CompareOp::Lte),
            _ => None,
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
        }
    }
}

/// What to do with filters on undeclared fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterPolicy {
    /// Undeclared fields become literal equality filters.
    #[default]
    Permissive,
    /// Undeclared fields are rejected.
    AllowList,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Text(String),
    Bool(bool),
    Number(f64),
    DateTime(DateTime<Utc>),
    /// Undeclared field; compared against whatever the document holds.
    Loose(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: CompareOp,
    pub operand: Operand,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: CompareOp, operand: Operand) -> Self {
        Self {
            field: field.into(),
            op,
            operand,
        }
    }

    pub fn matches(&self, document: &Value) -> bool {
        let Some(value) = document.get(&self.field).filter(|v| !v.is_null()) else {
            return false;
        };
        compare_operand(value, &self.operand).is_some_and(|ordering| self.op.accepts(ordering))
    }
}

/// Conjunction of predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn compile(
        conditions: &[RawCondition],
        schema: &CollectionSchema,
        policy: FilterPolicy,
    ) -> Result<Self, QueryError> {
        let predicates = conditions
            .iter()
            .map(|condition| {
                let operand = match schema.kind(&condition.field) {
                    Some(kind) => typed_operand(&condition.field, kind, &condition.value)?,
                    None if policy == FilterPolicy::AllowList => {
                        return Err(QueryError::FieldNotFilterable(condition.field.clone()))
                    }
                    None => Operand::Loose(condition.value.clone()),
                };
                Ok(Predicate::new(condition.field.clone(), condition.op, operand))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { predicates })
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.predicates.iter().all(|p| p.matches(document))
    }
}

fn typed_operand(field: &str, kind: FieldKind, raw: &str) -> Result<Operand, QueryError> {
    let invalid = || QueryError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
    };
    match kind {
        FieldKind::Text => Ok(Operand::Text(raw.to_string())),
        FieldKind::Bool => match raw {
            "true" => Ok(Operand::Bool(true)),
            "false" => Ok(Operand::Bool(false)),
            _ => Err(invalid()),
        },
        FieldKind::Number => raw.trim().parse().map(Operand::Number).map_err(|_| invalid()),
        FieldKind::DateTime => parse_datetime(raw).map(Operand::DateTime).ok_or_else(invalid),
        FieldKind::Object => Err(invalid()),
    }
}

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` date at midnight UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Ordering of the document value relative to the operand.
fn compare_operand(value: &Value, operand: &Operand) -> Option<Ordering> {
    match operand {
        Operand::Text(expected) => value.as_str().map(|actual| actual.cmp(expected.as_str())),
        Operand::Bool(expected) => value.as_bool().map(|actual| actual.cmp(expected)),
        Operand::Number(expected) => value.as_f64().and_then(|actual| actual.partial_cmp(expected)),
        Operand::DateTime(expected) => value
            .as_str()
            .and_then(parse_datetime)
            .map(|actual| actual.cmp(expected)),
        Operand::Loose(raw) => match value {
            Value::String(actual) => Some(actual.as_str().cmp(raw.as_str())),
            Value::Number(actual) => {
                let expected: f64 = raw.trim().parse().ok()?;
                actual.as_f64()?.partial_cmp(&expected)
            }
            Value::Bool(actual) => match raw.as_str() {
                "true" => Some(actual.cmp(&true)),
                "false" => Some(actual.cmp(&false)),
                _ => None,
            },
            _ => None,
        },
    }
}
