// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Note counts per notebook for one account.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthenticatedUser;
use crate::storage::{Note, Notebook, OwnedResource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotebookNoteCount {
    pub notebook_title: String,
    pub number_of_notes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteStats {
    /// Every note the account owns
    pub total_num_notes: usize,
    /// Owned notes grouped by the title of their notebook, ordered by title.
    /// Notes whose notebook no longer exists are not counted here.
    pub stats: Vec<NotebookNoteCount>,
}

impl NoteStats {
    pub fn compute(owner: &AuthenticatedUser, notes: &[Note], notebooks: &[Notebook]) -> Self {
        let titles: HashMap<&str, &str> = notebooks
            .iter()
            .map(|notebook| (notebook.id.as_str(), notebook.title.as_str()))
            .collect();

        let owned: Vec<&Note> = notes.iter().filter(|note| note.is_owned_by(owner)).collect();

        let mut groups: BTreeMap<&str, usize> = BTreeMap::new();
        for note in &owned {
            if let Some(title) = titles.get(note.notebook.as_str()) {
                *groups.entry(title).or_default() += 1;
            }
        }

        Self {
            total_num_notes: owned.len(),
            stats: groups
                .into_iter()
                .map(|(title, count)| NotebookNoteCount {
                    notebook_title: title.to_string(),
                    number_of_notes: count,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::models::{CreateNoteRequest, CreateNotebookRequest};
    use chrono::Utc;

    fn owner(id: &str) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: id.into(),
            name: "n".into(),
            email: format!("{id}@x.com"),
            photo: None,
            role: Role::User,
        }
    }

    fn notebook(title: &str, user: &str) -> Notebook {
        Notebook::create(
            CreateNotebookRequest {
                title: Some(title.into()),
                color: None,
            },
            user,
            Utc::now(),
        )
        .unwrap()
    }

    fn note(notebook: &str, user: &str) -> Note {
        Note::create(CreateNoteRequest::default(), user, notebook, Utc::now()).unwrap()
    }

    #[test]
    fn groups_owned_notes_by_notebook_title() {
        let work = notebook("Work", "u1");
        let home = notebook("Home", "u1");
        let other = notebook("Theirs", "u2");
        let notes = vec![
            note(&work.id, "u1"),
            note(&work.id, "u1"),
            note(&home.id, "u1"),
            note("deleted-notebook", "u1"),
            note(&other.id, "u2"),
        ];

        let stats = NoteStats::compute(&owner("u1"), &notes, &[work, home, other]);
        assert_eq!(stats.total_num_notes, 4);
        assert_eq!(
            stats.stats,
            vec![
                NotebookNoteCount {
                    notebook_title: "Home".into(),
                    number_of_notes: 1
                },
                NotebookNoteCount {
                    notebook_title: "Work".into(),
                    number_of_notes: 2
                },
            ]
        );
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let stats = NoteStats::compute(&owner("u1"), &[], &[]);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalNumNotes"], 0);
        assert!(json["stats"].as_array().unwrap().is_empty());
    }
}
