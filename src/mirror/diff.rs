use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Result of matching two unordered lists by key.
#[derive(Debug, Clone, PartialEq)]
pub struct ListDiff<E, D> {
    /// Existing items no desired item claimed.
    pub to_delete: Vec<E>,
    pub matched: Vec<(E, D)>,
    /// Desired items with no existing counterpart.
    pub to_add: Vec<D>,
}

/// Partition `existing` and `desired` into deletions, matched pairs and
/// additions by comparing the keys each side yields.
///
/// Keys need not be unique: each desired item claims the earliest unclaimed
/// existing item with the same key. `to_delete` keeps the input order of
/// `existing`; `matched` and `to_add` follow the order of `desired`.
pub fn diff_unsorted<E, D, K, FE, FD>(
    existing: impl IntoIterator<Item = E>,
    desired: impl IntoIterator<Item = D>,
    existing_key: FE,
    desired_key: FD,
) -> ListDiff<E, D>
where
    K: Eq + Hash,
    FE: Fn(&E) -> K,
    FD: Fn(&D) -> K,
{
    let mut slots: Vec<Option<E>> = Vec::new();
    let mut by_key: HashMap<K, VecDeque<usize>> = HashMap::new();
    for (idx, item) in existing.into_iter().enumerate() {
        by_key.entry(existing_key(&item)).or_default().push_back(idx);
        slots.push(Some(item));
    }

    let mut matched = Vec::new();
    let mut to_add = Vec::new();
    for item in desired {
        let claimed = by_key
            .get_mut(&desired_key(&item))
            .and_then(VecDeque::pop_front)
            .and_then(|idx| slots[idx].take());
        match claimed {
            Some(existing) => matched.push((existing, item)),
            None => to_add.push(item),
        }
    }

    ListDiff {
        to_delete: slots.into_iter().flatten().collect(),
        matched,
        to_add,
    }
}
