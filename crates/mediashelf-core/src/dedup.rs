//! Duplicate detection over the collection.
//!
//! Items are grouped by exact `(title, format)` match. Case, whitespace
//! and punctuation are NOT normalized: "Alien" on Blu-ray and "alien" on
//! Blu-ray are different keys. Fuzzy matching is a deliberate non-feature
//! until someone asks for it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{CollectionItem, MediaFormat};
use crate::scoring;

/// Grouping key: exact title + format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub title: String,
    pub format: MediaFormat,
}

impl GroupKey {
    pub fn of(item: &CollectionItem) -> Self {
        Self {
            title: item.title.clone(),
            format: item.format,
        }
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.title, self.format)
    }
}

/// A set of items considered the same title for consolidation.
/// Derived on demand, never persisted. Always has at least two members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub key: GroupKey,
    pub items: Vec<CollectionItem>,
}

impl DuplicateGroup {
    /// The item the merge view pre-selects: highest completeness score,
    /// earliest-seen on ties.
    pub fn suggested_keeper(&self) -> Option<&CollectionItem> {
        scoring::suggested_keeper(&self.items)
    }
}

/// Partition the collection into duplicate groups.
///
/// Pure over its input. Groups appear in order of their first occurrence
/// in the input; items keep their original relative order within a group.
/// Singleton keys are dropped — one copy of a title is not a duplicate.
pub fn find_duplicate_groups(items: &[CollectionItem]) -> Vec<DuplicateGroup> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<DuplicateGroup> = Vec::new();

    for item in items {
        let key = GroupKey::of(item);
        match index.get(&key) {
            Some(&i) => groups[i].items.push(item.clone()),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(DuplicateGroup {
                    key,
                    items: vec![item.clone()],
                });
            }
        }
    }

    groups.retain(|g| g.items.len() >= 2);
    groups
}
