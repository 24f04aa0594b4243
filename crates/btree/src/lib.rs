//! Disk-resident B+Tree secondary index: key is a single [`Value`],
//! value is a [`RecordId`]. Index pages live in the same table file as
//! the heap's DATA pages and are reached through the same buffer pool,
//! so the tree never owns a file of its own.
//!
//! Deletion and rebalancing are not implemented: removing a row leaves
//! its index entry in place.

mod node;

pub use node::{BTreeNode, NO_PAGE};

use std::cmp::Ordering;

use buffer::BufferPool;
use common::{DbError, DbResult, RecordId};
use node::{decode_node, encode_node, MAX_ENTRIES};
use storage::PageType;
use types::Value;

/// A handle onto a tree's root page. All operations take the
/// [`BufferPool`] backing the table explicitly, since the tree itself
/// holds no pages pinned between calls.
#[derive(Clone, Copy, Debug)]
pub struct BPlusTree {
    root_page_id: u32,
}

impl BPlusTree {
    /// Allocates a fresh, empty leaf as the root.
    pub fn create(pool: &mut BufferPool) -> DbResult<Self> {
        let root_page_id = pool.new_page(PageType::BTreeLeaf)?;
        let root = BTreeNode::Leaf {
            parent_page_id: NO_PAGE,
            next_page_id: NO_PAGE,
            entries: vec![],
        };
        store_and_unpin(pool, root_page_id, &root)?;
        Ok(BPlusTree { root_page_id })
    }

    /// Rebinds a tree to an already-populated root page (e.g. after
    /// reopening the database from the catalog's stored root id).
    pub fn open(root_page_id: u32) -> Self {
        BPlusTree { root_page_id }
    }

    pub fn root_page_id(&self) -> u32 {
        self.root_page_id
    }

    pub fn search(&self, pool: &mut BufferPool, key: &Value) -> DbResult<Option<RecordId>> {
        let leaf_id = self.find_leaf(pool, Some(key))?;
        let node = load(pool, leaf_id)?;
        release(pool, leaf_id)?;
        let BTreeNode::Leaf { entries, .. } = node else {
            return Err(DbError::Storage("find_leaf returned a non-leaf".into()));
        };
        for (k, rid) in &entries {
            if matches!(k.eq_same_type(key), Some(true)) {
                return Ok(Some(*rid));
            }
        }
        Ok(None)
    }

    /// Positions a cursor at the first entry with `key ≤ entry_key`, or
    /// at the leftmost entry of the leftmost leaf if `key` is `None`.
    pub fn range_start(&self, pool: &mut BufferPool, key: Option<&Value>) -> DbResult<Cursor> {
        let mut leaf_id = self.find_leaf(pool, key)?;
        loop {
            let node = load(pool, leaf_id)?;
            release(pool, leaf_id)?;
            let BTreeNode::Leaf {
                entries,
                next_page_id,
                ..
            } = node
            else {
                return Err(DbError::Storage("find_leaf returned a non-leaf".into()));
            };

            let idx = match key {
                None => 0,
                Some(k) => entries.partition_point(|(ek, _)| less_than(ek, k)),
            };
            if idx < entries.len() {
                return Ok(Cursor {
                    entries,
                    idx,
                    next_page_id,
                    done: false,
                });
            }
            if next_page_id == NO_PAGE {
                return Ok(Cursor {
                    entries: vec![],
                    idx: 0,
                    next_page_id: NO_PAGE,
                    done: true,
                });
            }
            leaf_id = next_page_id;
        }
    }

    pub fn insert(&mut self, pool: &mut BufferPool, key: Value, rid: RecordId) -> DbResult<()> {
        // Validate the key fits before touching any pages.
        node::encode_key(&key)?;

        if let Some((rising_key, new_child_page)) = insert_recursive(pool, self.root_page_id, key, rid)? {
            let old_root = self.root_page_id;
            let new_root_page = pool.new_page(PageType::BTreeInternal)?;
            let new_root = BTreeNode::Internal {
                parent_page_id: NO_PAGE,
                entries: vec![(Value::Null, old_root), (rising_key, new_child_page)],
            };
            store_and_unpin(pool, new_root_page, &new_root)?;
            reparent(pool, old_root, new_root_page)?;
            reparent(pool, new_child_page, new_root_page)?;
            self.root_page_id = new_root_page;
        }
        Ok(())
    }

    fn find_leaf(&self, pool: &mut BufferPool, key: Option<&Value>) -> DbResult<u32> {
        let mut current = self.root_page_id;
        loop {
            let node = load(pool, current)?;
            match node {
                BTreeNode::Leaf { .. } => {
                    release(pool, current)?;
                    return Ok(current);
                }
                BTreeNode::Internal { entries, .. } => {
                    let idx = match key {
                        None => 0,
                        Some(k) => child_index(&entries, k),
                    };
                    let next = entries[idx].1;
                    release(pool, current)?;
                    current = next;
                }
            }
        }
    }
}

/// A single-pass, forward-only position within a leaf chain. Holds no
/// pinned page between calls — each `next` pins only the leaf it reads
/// and releases it before returning.
pub struct Cursor {
    entries: Vec<(Value, RecordId)>,
    idx: usize,
    next_page_id: u32,
    done: bool,
}

impl Cursor {
    pub fn is_end(&self) -> bool {
        self.done
    }

    pub fn key(&self) -> Option<&Value> {
        if self.done {
            None
        } else {
            self.entries.get(self.idx).map(|(k, _)| k)
        }
    }

    pub fn rid(&self) -> Option<RecordId> {
        if self.done {
            None
        } else {
            self.entries.get(self.idx).map(|(_, r)| *r)
        }
    }

    pub fn next(&mut self, pool: &mut BufferPool) -> DbResult<()> {
        if self.done {
            return Ok(());
        }
        self.idx += 1;
        while self.idx >= self.entries.len() {
            if self.next_page_id == NO_PAGE {
                self.done = true;
                return Ok(());
            }
            let leaf_id = self.next_page_id;
            let node = load(pool, leaf_id)?;
            release(pool, leaf_id)?;
            let BTreeNode::Leaf {
                entries,
                next_page_id,
                ..
            } = node
            else {
                return Err(DbError::Storage("leaf chain points at a non-leaf".into()));
            };
            self.entries = entries;
            self.next_page_id = next_page_id;
            self.idx = 0;
        }
        Ok(())
    }
}

fn less_than(a: &Value, b: &Value) -> bool {
    matches!(a.cmp_same_type(b), Some(Ordering::Less))
}

fn less_or_equal(a: &Value, b: &Value) -> bool {
    matches!(a.cmp_same_type(b), Some(Ordering::Less) | Some(Ordering::Equal))
}

/// For an internal node, the index of the child whose range covers
/// `key`. Entry 0's key is a sentinel and is always a valid fallback.
fn child_index(entries: &[(Value, u32)], key: &Value) -> usize {
    if entries.len() <= 1 {
        return 0;
    }
    entries[1..].partition_point(|(k, _)| less_or_equal(k, key))
}

fn load(pool: &mut BufferPool, page_id: u32) -> DbResult<BTreeNode> {
    if page_id == 0 || page_id == NO_PAGE {
        return Err(DbError::Storage(format!(
            "corrupt btree: invalid page id {page_id}"
        )));
    }
    let page = pool.get(page_id)?;
    decode_node(page)
}

fn release(pool: &mut BufferPool, page_id: u32) -> DbResult<()> {
    pool.unpin(page_id, false)
}

fn store_and_unpin(pool: &mut BufferPool, page_id: u32, node: &BTreeNode) -> DbResult<()> {
    {
        let page = pool.get_mut(page_id)?;
        encode_node(page, node)?;
    }
    pool.unpin(page_id, true)
}

fn reparent(pool: &mut BufferPool, child_page_id: u32, new_parent: u32) -> DbResult<()> {
    let mut node = load(pool, child_page_id)?;
    node.set_parent_page_id(new_parent);
    store_and_unpin(pool, child_page_id, &node)
}

fn split_internal(
    parent_page_id: u32,
    entries: Vec<(Value, u32)>,
) -> (BTreeNode, Value, BTreeNode) {
    let mid = entries.len() / 2;
    let rising_key = entries[mid].0.clone();
    let left_entries = entries[..mid].to_vec();
    let mut right_entries = Vec::with_capacity(entries.len() - mid);
    right_entries.push((Value::Null, entries[mid].1));
    right_entries.extend(entries[mid + 1..].iter().cloned());

    (
        BTreeNode::Internal {
            parent_page_id,
            entries: left_entries,
        },
        rising_key,
        BTreeNode::Internal {
            parent_page_id,
            entries: right_entries,
        },
    )
}

/// Inserts into the subtree rooted at `page_id`. Returns `Some((rising_key,
/// new_sibling_page))` if `page_id`'s node split and the caller (or
/// `insert`, for the root) must link the new sibling in.
fn insert_recursive(
    pool: &mut BufferPool,
    page_id: u32,
    key: Value,
    rid: RecordId,
) -> DbResult<Option<(Value, u32)>> {
    let node = load(pool, page_id)?;

    match node {
        BTreeNode::Internal {
            parent_page_id,
            entries,
        } => {
            let idx = child_index(&entries, &key);
            let child_id = entries[idx].1;
            release(pool, page_id)?;

            let Some((rising_key, new_child_page)) = insert_recursive(pool, child_id, key, rid)?
            else {
                return Ok(None);
            };

            let node = load(pool, page_id)?;
            let BTreeNode::Internal { entries, .. } = node else {
                return Err(DbError::Storage("node changed type under us".into()));
            };
            let mut entries = entries;
            entries.insert(idx + 1, (rising_key, new_child_page));

            if (entries.len() as u16) < MAX_ENTRIES {
                store_and_unpin(
                    pool,
                    page_id,
                    &BTreeNode::Internal {
                        parent_page_id,
                        entries,
                    },
                )?;
                Ok(None)
            } else {
                tracing::debug!(page_id, "splitting internal node");
                let (left, split_key, right) = split_internal(parent_page_id, entries);
                store_and_unpin(pool, page_id, &left)?;

                let right_page_id = pool.new_page(PageType::BTreeInternal)?;
                if let BTreeNode::Internal {
                    entries: right_entries,
                    ..
                } = &right
                {
                    for (_, child) in right_entries {
                        reparent(pool, *child, right_page_id)?;
                    }
                }
                store_and_unpin(pool, right_page_id, &right)?;
                Ok(Some((split_key, right_page_id)))
            }
        }
        BTreeNode::Leaf {
            parent_page_id,
            next_page_id,
            entries,
        } => {
            let mut entries = entries;
            let pos = entries.partition_point(|(k, _)| less_or_equal(k, &key));
            entries.insert(pos, (key, rid));

            if (entries.len() as u16) < MAX_ENTRIES {
                store_and_unpin(
                    pool,
                    page_id,
                    &BTreeNode::Leaf {
                        parent_page_id,
                        next_page_id,
                        entries,
                    },
                )?;
                Ok(None)
            } else {
                tracing::debug!(page_id, "splitting leaf node");
                let mid = entries.len() / 2;
                let right_entries = entries.split_off(mid);
                let split_key = right_entries[0].0.clone();

                let right_page_id = pool.new_page(PageType::BTreeLeaf)?;
                let left = BTreeNode::Leaf {
                    parent_page_id,
                    next_page_id: right_page_id,
                    entries,
                };
                let right = BTreeNode::Leaf {
                    parent_page_id,
                    next_page_id,
                    entries: right_entries,
                };
                store_and_unpin(pool, page_id, &left)?;
                store_and_unpin(pool, right_page_id, &right)?;
                Ok(Some((split_key, right_page_id)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use storage::PageManager;
    use tempfile::tempdir;

    fn pool() -> (tempfile::TempDir, BufferPool) {
        let dir = tempdir().unwrap();
        let manager = PageManager::open(dir.path().join("idx.db")).unwrap();
        (dir, BufferPool::new(manager, 64))
    }

    #[test]
    fn search_on_empty_tree_returns_none() {
        let (_dir, mut pool) = pool();
        let tree = BPlusTree::create(&mut pool).unwrap();
        assert_eq!(tree.search(&mut pool, &Value::Int(1)).unwrap(), None);
    }

    #[test]
    fn insert_then_search_round_trips() {
        let (_dir, mut pool) = pool();
        let mut tree = BPlusTree::create(&mut pool).unwrap();
        let rid = RecordId { page_id: 1, slot: 0 };
        tree.insert(&mut pool, Value::Int(42), rid).unwrap();
        assert_eq!(tree.search(&mut pool, &Value::Int(42)).unwrap(), Some(rid));
        assert_eq!(tree.search(&mut pool, &Value::Int(7)).unwrap(), None);
    }

    #[test]
    fn many_inserts_force_splits_and_cursor_stays_sorted() {
        let (_dir, mut pool) = pool();
        let mut tree = BPlusTree::create(&mut pool).unwrap();
        let n = 2000;
        for i in 0..n {
            tree.insert(
                &mut pool,
                Value::Int(i),
                RecordId {
                    page_id: 1,
                    slot: (i % 1000) as u16,
                },
            )
            .unwrap();
        }

        let mut cursor = tree.range_start(&mut pool, None).unwrap();
        let mut seen = vec![];
        while !cursor.is_end() {
            seen.push(match cursor.key().unwrap() {
                Value::Int(v) => *v,
                _ => panic!("expected int key"),
            });
            cursor.next(&mut pool).unwrap();
        }
        let expected: Vec<i32> = (0..n).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn range_start_skips_keys_below_the_bound() {
        let (_dir, mut pool) = pool();
        let mut tree = BPlusTree::create(&mut pool).unwrap();
        for i in 0..50 {
            tree.insert(&mut pool, Value::Int(i), RecordId { page_id: 1, slot: i as u16 })
                .unwrap();
        }
        let mut cursor = tree.range_start(&mut pool, Some(&Value::Int(25))).unwrap();
        assert_eq!(cursor.key().unwrap(), &Value::Int(25));
        let mut count = 0;
        while !cursor.is_end() {
            count += 1;
            cursor.next(&mut pool).unwrap();
        }
        assert_eq!(count, 25);
    }

    #[test]
    fn leaf_exactly_at_capacity_does_not_split_one_more_does() {
        let (_dir, mut pool) = pool();
        let mut tree = BPlusTree::create(&mut pool).unwrap();
        for i in 0..(MAX_ENTRIES - 1) {
            tree.insert(
                &mut pool,
                Value::Int(i as i32),
                RecordId { page_id: 1, slot: i },
            )
            .unwrap();
        }
        let root_before = tree.root_page_id();

        tree.insert(
            &mut pool,
            Value::Int(MAX_ENTRIES as i32),
            RecordId { page_id: 1, slot: MAX_ENTRIES },
        )
        .unwrap();
        assert_ne!(tree.root_page_id(), root_before, "root should become internal after the split");
    }

    proptest! {
        #[test]
        fn cursor_visits_distinct_keys_in_ascending_order(mut keys in proptest::collection::hash_set(0i32..5000, 1..200)) {
            let (_dir, mut pool) = pool();
            let mut tree = BPlusTree::create(&mut pool).unwrap();
            let mut ordered: Vec<i32> = keys.drain().collect();
            for (i, &k) in ordered.iter().enumerate() {
                tree.insert(&mut pool, Value::Int(k), RecordId { page_id: 1, slot: (i % 65535) as u16 }).unwrap();
            }
            ordered.sort_unstable();

            let mut cursor = tree.range_start(&mut pool, None).unwrap();
            let mut seen = vec![];
            while !cursor.is_end() {
                match cursor.key().unwrap() {
                    Value::Int(v) => seen.push(*v),
                    _ => panic!("expected int key"),
                }
                cursor.next(&mut pool).unwrap();
            }
            prop_assert_eq!(seen, ordered);
        }
    }
}
