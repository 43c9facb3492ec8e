//! Merge resolution for duplicate groups.
//!
//! The operator picks one keeper per group; every other member is deleted
//! from storage. The keeper record is never touched — whole-record
//! selection, no field-by-field reconciliation. Deletes are issued one at
//! a time with no surrounding transaction, so a failure mid-run leaves
//! earlier deletions committed (at-least-once; re-running the grouper
//! shows the true state, and retrying an already-consolidated group is a
//! no-op because no duplicates remain).

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::dedup::{self, DuplicateGroup};
use crate::error::{MergeError, Result, ShelfError};
use crate::models::CollectionItem;

// ─── Storage seam ───────────────────────────────────────────

/// The one storage capability a merge needs. `Database` implements this;
/// tests substitute fakes.
pub trait ItemStore {
    /// Delete an item. `Ok(false)` means the row was already gone.
    fn delete_item(&self, id: &Uuid) -> Result<bool>;
}

// ─── Decisions ──────────────────────────────────────────────

/// One group's worth of operator intent: the full member list and the id
/// that survives.
#[derive(Debug, Clone)]
pub struct MergeDecision {
    /// Label used in error messages, usually the group key.
    pub group: String,
    pub item_ids: Vec<Uuid>,
    pub keep_id: Uuid,
}

impl MergeDecision {
    pub fn for_group(group: &DuplicateGroup, keep_id: Uuid) -> Self {
        Self {
            group: group.key.to_string(),
            item_ids: group.items.iter().map(|i| i.id).collect(),
            keep_id,
        }
    }
}

// ─── Resolver ───────────────────────────────────────────────

/// Consolidate every decided group, returning the total number of items
/// removed. Keeper membership is checked before any deletion for that
/// group. An empty decision list is a no-op returning 0.
pub fn resolve_merges(
    store: &impl ItemStore,
    decisions: &[MergeDecision],
) -> std::result::Result<usize, MergeError> {
    let mut removed = 0usize;

    for decision in decisions {
        if !decision.item_ids.contains(&decision.keep_id) {
            return Err(MergeError {
                removed,
                source: ShelfError::KeeperNotInGroup {
                    keeper: decision.keep_id.to_string(),
                    group: decision.group.clone(),
                },
            });
        }

        for id in &decision.item_ids {
            if *id == decision.keep_id {
                continue;
            }
            match store.delete_item(id) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(source) => return Err(MergeError { removed, source }),
            }
        }
    }

    Ok(removed)
}

// ─── Operator session ───────────────────────────────────────

/// Where the duplicate-resolution workflow stands.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    GroupsLoaded,
    DecisionsPending,
    Merging,
    Merged { removed: usize },
    Failed { message: String },
}

/// Drives one operator pass over the duplicate view: load groups, record
/// keep-decisions (explicit or auto-selected), execute the merge, refresh.
/// Single merge in flight at a time.
#[derive(Debug)]
pub struct MergeSession {
    groups: Vec<DuplicateGroup>,
    decisions: BTreeMap<usize, Uuid>,
    state: SessionState,
}

impl Default for MergeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeSession {
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            decisions: BTreeMap::new(),
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    pub fn decisions(&self) -> &BTreeMap<usize, Uuid> {
        &self.decisions
    }

    /// Run the grouper over a fresh item list. Clears any previous
    /// decisions. Also the refresh step after a merge.
    pub fn load_groups(&mut self, items: &[CollectionItem]) -> Result<()> {
        if self.state == SessionState::Merging {
            return Err(ShelfError::ValidationError(
                "cannot reload groups while a merge is in flight".into(),
            ));
        }
        self.groups = dedup::find_duplicate_groups(items);
        self.decisions.clear();
        self.state = SessionState::GroupsLoaded;
        Ok(())
    }

    /// Record the operator's keeper choice for one group.
    pub fn select_keeper(&mut self, group_idx: usize, keep_id: Uuid) -> Result<()> {
        if self.state == SessionState::Merging {
            return Err(ShelfError::ValidationError(
                "cannot change decisions while a merge is in flight".into(),
            ));
        }
        let group = self.groups.get(group_idx).ok_or_else(|| {
            ShelfError::ValidationError(format!("no duplicate group at index {group_idx}"))
        })?;
        if !group.items.iter().any(|i| i.id == keep_id) {
            return Err(ShelfError::KeeperNotInGroup {
                keeper: keep_id.to_string(),
                group: group.key.to_string(),
            });
        }
        self.decisions.insert(group_idx, keep_id);
        self.state = SessionState::DecisionsPending;
        Ok(())
    }

    /// Apply the scoring heuristic to every group at once.
    pub fn auto_select_best(&mut self) -> Result<()> {
        if self.state == SessionState::Merging {
            return Err(ShelfError::ValidationError(
                "cannot change decisions while a merge is in flight".into(),
            ));
        }
        for (idx, group) in self.groups.iter().enumerate() {
            if let Some(keeper) = group.suggested_keeper() {
                self.decisions.insert(idx, keeper.id);
            }
        }
        if !self.decisions.is_empty() {
            self.state = SessionState::DecisionsPending;
        }
        Ok(())
    }

    /// Execute the merge for every decided group. Requires groups to have
    /// been loaded first. With zero decisions this is a no-op that still
    /// lands in `Merged { removed: 0 }`. On failure the session records
    /// the error message and the operator may retry after a refresh.
    pub fn merge(&mut self, store: &impl ItemStore) -> std::result::Result<usize, MergeError> {
        if self.state == SessionState::Idle {
            return Err(MergeError {
                removed: 0,
                source: ShelfError::ValidationError("no duplicate groups loaded".into()),
            });
        }
        if self.state == SessionState::Merging {
            return Err(MergeError {
                removed: 0,
                source: ShelfError::ValidationError("a merge is already in flight".into()),
            });
        }

        let decisions: Vec<MergeDecision> = self
            .decisions
            .iter()
            .map(|(&idx, &keep_id)| MergeDecision::for_group(&self.groups[idx], keep_id))
            .collect();

        self.state = SessionState::Merging;
        match resolve_merges(store, &decisions) {
            Ok(removed) => {
                self.state = SessionState::Merged { removed };
                Ok(removed)
            }
            Err(err) => {
                self.state = SessionState::Failed {
                    message: err.to_string(),
                };
                Err(err)
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaFormat;
    use std::cell::RefCell;

    /// In-memory store recording deletions, optionally failing on one id.
    struct FakeStore {
        existing: RefCell<Vec<Uuid>>,
        deleted: RefCell<Vec<Uuid>>,
        fail_on: Option<Uuid>,
    }

    impl FakeStore {
        fn with_items(items: &[CollectionItem]) -> Self {
            Self {
                existing: RefCell::new(items.iter().map(|i| i.id).collect()),
                deleted: RefCell::new(Vec::new()),
                fail_on: None,
            }
        }
    }

    impl ItemStore for FakeStore {
        fn delete_item(&self, id: &Uuid) -> Result<bool> {
            if self.fail_on == Some(*id) {
                return Err(ShelfError::ItemNotFound("storage unavailable".into()));
            }
            let mut existing = self.existing.borrow_mut();
            match existing.iter().position(|e| e == id) {
                Some(pos) => {
                    existing.remove(pos);
                    self.deleted.borrow_mut().push(*id);
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    fn dupes(title: &str, n: usize) -> Vec<CollectionItem> {
        (0..n)
            .map(|_| CollectionItem::new(title, MediaFormat::BluRay))
            .collect()
    }

    #[test]
    fn test_merge_removes_all_but_keeper() {
        let items = dupes("Inception", 3);
        let store = FakeStore::with_items(&items);
        let groups = dedup::find_duplicate_groups(&items);
        let keep = items[1].id;

        let decisions = vec![MergeDecision::for_group(&groups[0], keep)];
        let removed = resolve_merges(&store, &decisions).unwrap();

        assert_eq!(removed, 2);
        assert!(!store.deleted.borrow().contains(&keep));
        assert_eq!(*store.existing.borrow(), vec![keep]);
    }

    #[test]
    fn test_total_sums_across_groups() {
        let mut items = dupes("A", 4);
        items.extend(dupes("B", 2));
        let store = FakeStore::with_items(&items);
        let groups = dedup::find_duplicate_groups(&items);
        assert_eq!(groups.len(), 2);

        let decisions: Vec<_> = groups
            .iter()
            .map(|g| MergeDecision::for_group(g, g.items[0].id))
            .collect();
        let removed = resolve_merges(&store, &decisions).unwrap();

        // (4 - 1) + (2 - 1)
        assert_eq!(removed, 4);
    }

    #[test]
    fn test_empty_decisions_is_noop() {
        let store = FakeStore::with_items(&[]);
        assert_eq!(resolve_merges(&store, &[]).unwrap(), 0);
    }

    #[test]
    fn test_keeper_outside_group_rejected_before_deleting() {
        let items = dupes("A", 2);
        let store = FakeStore::with_items(&items);
        let groups = dedup::find_duplicate_groups(&items);

        let decisions = vec![MergeDecision::for_group(&groups[0], Uuid::now_v7())];
        let err = resolve_merges(&store, &decisions).unwrap_err();

        assert_eq!(err.removed, 0);
        assert!(matches!(err.source, ShelfError::KeeperNotInGroup { .. }));
        assert!(store.deleted.borrow().is_empty());
    }

    #[test]
    fn test_partial_failure_reports_committed_count() {
        let items = dupes("A", 3);
        let mut store = FakeStore::with_items(&items);
        // First non-keeper delete succeeds, second blows up.
        store.fail_on = Some(items[2].id);
        let groups = dedup::find_duplicate_groups(&items);

        let decisions = vec![MergeDecision::for_group(&groups[0], items[0].id)];
        let err = resolve_merges(&store, &decisions).unwrap_err();

        assert_eq!(err.removed, 1);
        assert_eq!(*store.deleted.borrow(), vec![items[1].id]);
    }

    #[test]
    fn test_already_deleted_member_does_not_count() {
        let items = dupes("A", 3);
        let store = FakeStore::with_items(&items[..2]);
        let groups = dedup::find_duplicate_groups(&items);

        // items[2] never existed in the store.
        let decisions = vec![MergeDecision::for_group(&groups[0], items[0].id)];
        let removed = resolve_merges(&store, &decisions).unwrap();
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_session_happy_path_transitions() {
        let items = dupes("Inception", 2);
        let store = FakeStore::with_items(&items);

        let mut session = MergeSession::new();
        assert_eq!(*session.state(), SessionState::Idle);

        session.load_groups(&items).unwrap();
        assert_eq!(*session.state(), SessionState::GroupsLoaded);
        assert_eq!(session.groups().len(), 1);

        session.select_keeper(0, items[0].id).unwrap();
        assert_eq!(*session.state(), SessionState::DecisionsPending);

        let removed = session.merge(&store).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(*session.state(), SessionState::Merged { removed: 1 });

        // Refresh: grouper over the post-merge collection converges.
        let remaining: Vec<_> = items
            .iter()
            .filter(|i| store.existing.borrow().contains(&i.id))
            .cloned()
            .collect();
        session.load_groups(&remaining).unwrap();
        assert_eq!(*session.state(), SessionState::GroupsLoaded);
        assert!(session.groups().is_empty());
    }

    #[test]
    fn test_session_auto_select_best() {
        let mut rich = CollectionItem::new("Inception", MediaFormat::BluRay);
        rich.personal_rating = Some(9);
        rich.technical_specs_id = Some("bd-1".into());
        let poor = CollectionItem::new("Inception", MediaFormat::BluRay);
        let items = vec![poor.clone(), rich.clone()];
        let store = FakeStore::with_items(&items);

        let mut session = MergeSession::new();
        session.load_groups(&items).unwrap();
        session.auto_select_best().unwrap();
        assert_eq!(*session.state(), SessionState::DecisionsPending);
        assert_eq!(session.decisions()[&0], rich.id);

        let removed = session.merge(&store).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(*store.deleted.borrow(), vec![poor.id]);
    }

    #[test]
    fn test_session_merge_with_no_decisions_is_noop() {
        let items = dupes("A", 2);
        let store = FakeStore::with_items(&items);
        let mut session = MergeSession::new();
        session.load_groups(&items).unwrap();

        let removed = session.merge(&store).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(*session.state(), SessionState::Merged { removed: 0 });
        assert!(store.deleted.borrow().is_empty());
    }

    #[test]
    fn test_session_failure_state_and_retry() {
        let items = dupes("A", 2);
        let mut store = FakeStore::with_items(&items);
        store.fail_on = Some(items[1].id);

        let mut session = MergeSession::new();
        session.load_groups(&items).unwrap();
        session.select_keeper(0, items[0].id).unwrap();

        assert!(session.merge(&store).is_err());
        assert!(matches!(*session.state(), SessionState::Failed { .. }));

        // Operator retries after the storage hiccup clears.
        store.fail_on = None;
        session.load_groups(&items).unwrap();
        session.select_keeper(0, items[0].id).unwrap();
        assert_eq!(session.merge(&store).unwrap(), 1);
    }

    #[test]
    fn test_session_rejects_merge_before_groups_loaded() {
        let items = dupes("A", 2);
        let store = FakeStore::with_items(&items);
        let mut session = MergeSession::new();

        let err = session.merge(&store).unwrap_err();
        assert_eq!(err.removed, 0);
        assert!(matches!(err.source, ShelfError::ValidationError(_)));
        assert_eq!(*session.state(), SessionState::Idle);
        assert!(store.deleted.borrow().is_empty());
    }

    #[test]
    fn test_session_rejects_reentrant_merge() {
        let items = dupes("A", 2);
        let store = FakeStore::with_items(&items);
        let mut session = MergeSession::new();
        session.load_groups(&items).unwrap();
        session.state = SessionState::Merging;

        assert!(session.merge(&store).is_err());
        assert!(session.load_groups(&items).is_err());
        assert!(session.select_keeper(0, items[0].id).is_err());
        assert!(session.auto_select_best().is_err());
    }

    #[test]
    fn test_session_select_keeper_validates_membership() {
        let items = dupes("A", 2);
        let mut session = MergeSession::new();
        session.load_groups(&items).unwrap();

        let err = session.select_keeper(0, Uuid::now_v7()).unwrap_err();
        assert!(matches!(err, ShelfError::KeeperNotInGroup { .. }));
        assert!(session.select_keeper(7, items[0].id).is_err());
    }
}
