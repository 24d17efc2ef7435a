//! The owned-arena facade: `RbMap` wraps the free functions in [`super`] with
//! a header (root, cached leftmost, black height, length) and presents the
//! map-like surface (lookup, insert, remove, iteration, split/join).
//!
//! Each `RbMap` owns its `Arena` by value rather than sharing one behind
//! `Rc<RefCell<_>>`: that is what lets `get_mut`/`Index`/`IndexMut` hand back
//! a plain `&mut V` instead of a runtime-borrow-checked guard. The price is
//! that `split_by_key`/`join_with_pivot`, which each combine or divide two
//! independently-owned arenas, must physically relocate one side's nodes
//! into the other's arena via [`super::migrate_subtree`].

use std::cmp::Ordering;
use std::mem::ManuallyDrop;
use std::ops::{Index, IndexMut};

use crate::arena::{Arena, SENTINEL};
use crate::augment::{MetadataUpdater, NodeMeta, NoopUpdater, OrderStatisticUpdater};
use crate::comparator::{Comparator, DefaultComparator};
use crate::error::InvariantResult;
use crate::link::{
    self, count_nodes, find, find_equal_or_insert_pos, free_subtree, lower_bound, predecessor,
    successor, tree_max, tree_min, Dir, InsertPos, NodeKey, NodeLinks,
};

use super::{alloc_node, check_invariants, fix_insert_and_black_height, migrate_subtree, RbNode};

/// An ordered map backed by a red-black tree, generic over an optional
/// per-subtree augmentation `M` (driven by updater `U`) and an optional
/// custom key ordering `C`.
pub struct RbMap<K, V, M = (), U = NoopUpdater, C = DefaultComparator<K>> {
    arena: Arena<RbNode<K, V, M>>,
    root: u32,
    begin: u32,
    black_height: u32,
    len: usize,
    updater: U,
    cmp: C,
}

impl<K: Ord, V> Default for RbMap<K, V, (), NoopUpdater, DefaultComparator<K>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> RbMap<K, V, (), NoopUpdater, DefaultComparator<K>> {
    pub fn new() -> Self {
        RbMap {
            arena: Arena::new(),
            root: SENTINEL,
            begin: SENTINEL,
            black_height: 0,
            len: 0,
            updater: NoopUpdater,
            cmp: DefaultComparator::default(),
        }
    }
}

impl<K, V, M, U, C> RbMap<K, V, M, U, C>
where
    M: Clone,
    U: MetadataUpdater<K, M>,
    C: Comparator<K>,
{
    /// Builds an empty map with an explicit updater and comparator, e.g.
    /// `RbMap::with_updater(OrderStatisticUpdater, DefaultComparator::default())`.
    pub fn with_updater(updater: U, cmp: C) -> Self {
        RbMap {
            arena: Arena::new(),
            root: SENTINEL,
            begin: SENTINEL,
            black_height: 0,
            len: 0,
            updater,
            cmp,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, k: &K) -> Option<&V> {
        let n = find(&self.arena, self.root, k, &self.cmp);
        (n != SENTINEL).then(|| self.arena.get(n).value())
    }

    pub fn get_mut(&mut self, k: &K) -> Option<&mut V> {
        let n = find(&self.arena, self.root, k, &self.cmp);
        if n == SENTINEL {
            None
        } else {
            Some(self.arena.get_mut(n).value_mut())
        }
    }

    pub fn contains_key(&self, k: &K) -> bool {
        find(&self.arena, self.root, k, &self.cmp) != SENTINEL
    }

    /// The entry whose key is the least one `>= k`, if any.
    pub fn lower_bound(&self, k: &K) -> Option<(&K, &V)> {
        let n = lower_bound(&self.arena, self.root, k, &self.cmp);
        (n != SENTINEL).then(|| {
            let node = self.arena.get(n);
            (node.key(), node.value())
        })
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        (self.begin != SENTINEL).then(|| {
            let node = self.arena.get(self.begin);
            (node.key(), node.value())
        })
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        (self.root != SENTINEL).then(|| {
            let n = tree_max(&self.arena, self.root);
            let node = self.arena.get(n);
            (node.key(), node.value())
        })
    }

    /// Inserts `key`/`value` if `key` is absent, otherwise overwrites the
    /// existing entry's value (the key itself, and any augmentation derived
    /// only from keys, is unaffected). Returns whether a new entry was
    /// created, plus a reference to the (new or updated) value.
    pub fn try_emplace(&mut self, key: K, value: V) -> (bool, &mut V) {
        match find_equal_or_insert_pos(&self.arena, self.root, &key, &self.cmp) {
            InsertPos::Found(n) => {
                self.arena.get_mut(n).value = value;
                (false, self.arena.get_mut(n).value_mut())
            }
            InsertPos::Empty => {
                let n = alloc_node(&mut self.arena, key, value, &self.updater);
                self.arena.get_mut(n).is_black = true;
                self.root = n;
                self.begin = n;
                self.black_height = 1;
                self.len += 1;
                (true, self.arena.get_mut(n).value_mut())
            }
            InsertPos::At(parent, dir) => {
                let n = alloc_node(&mut self.arena, key, value, &self.updater);
                link::set_child(&mut self.arena, parent, dir, n);
                if dir == Dir::Left && parent == self.begin {
                    self.begin = n;
                }
                self.black_height = fix_insert_and_black_height(
                    &mut self.arena,
                    &mut self.root,
                    n,
                    self.black_height,
                    &self.updater,
                );
                self.len += 1;
                (true, self.arena.get_mut(n).value_mut())
            }
        }
    }

    /// Inserts `key` with a lazily-computed default if absent, returning a
    /// reference to the (new or existing) value either way.
    pub fn get_or_insert_with(&mut self, key: K, default: impl FnOnce() -> V) -> &mut V {
        if self.contains_key(&key) {
            self.get_mut(&key).unwrap()
        } else {
            self.try_emplace(key, default()).1
        }
    }

    /// Removes `k`, returning its value if present. Implemented as split
    /// around `k` followed by rejoining the two halves.
    pub fn remove(&mut self, k: &K) -> Option<V> {
        let (new_root, new_bh, removed) =
            super::remove(&mut self.arena, self.root, self.black_height, k, &self.cmp, &self.updater);
        self.root = new_root;
        self.black_height = new_bh;
        self.begin = if self.root == SENTINEL {
            SENTINEL
        } else {
            tree_min(&self.arena, self.root)
        };
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    pub fn iter(&self) -> Iter<'_, K, V, M> {
        let back = if self.root == SENTINEL {
            SENTINEL
        } else {
            tree_max(&self.arena, self.root)
        };
        Iter {
            arena: &self.arena,
            front: self.begin,
            back,
            done: self.root == SENTINEL,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, M> {
        let mut indices = Vec::with_capacity(self.len);
        let mut cur = self.begin;
        while cur != SENTINEL {
            indices.push(cur);
            cur = successor(&self.arena, cur);
        }
        IterMut {
            arena: &mut self.arena,
            order: indices,
            front: 0,
            back: None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    pub fn check_invariants(&self) -> InvariantResult
    where
        C: Comparator<K>,
        M: PartialEq,
    {
        check_invariants(&self.arena, self.root, self.black_height, &self.cmp, &self.updater)
    }

    /// Splits `self` around `k`: every key `< k` (plus `k` itself, if
    /// `equal_on_left`) ends up in the first map, every remaining key in the
    /// second. Consumes `self` and returns two fresh, independently-owned
    /// maps.
    pub fn split_by_key(self, k: &K, equal_on_left: bool) -> (Self, Self)
    where
        U: Clone,
        C: Clone,
    {
        let (mut arena, root, bh, len, updater, cmp) = into_raw_parts(self);
        let (l_root, l_bh, r_root, r_bh) =
            super::split_by_key(&mut arena, root, bh, k, equal_on_left, &cmp, &updater);
        let l_len = count_nodes(&arena, l_root);
        let r_len = len - l_len;

        let mut r_arena = Arena::new();
        let r_root = migrate_subtree(&mut arena, r_root, &mut r_arena);

        let l_begin = if l_root == SENTINEL {
            SENTINEL
        } else {
            tree_min(&arena, l_root)
        };
        let r_begin = if r_root == SENTINEL {
            SENTINEL
        } else {
            tree_min(&r_arena, r_root)
        };

        (
            RbMap {
                arena,
                root: l_root,
                begin: l_begin,
                black_height: l_bh,
                len: l_len,
                updater: updater.clone(),
                cmp: cmp.clone(),
            },
            RbMap {
                arena: r_arena,
                root: r_root,
                begin: r_begin,
                black_height: r_bh,
                len: r_len,
                updater,
                cmp,
            },
        )
    }

    /// Joins `l`, a new pivot entry, and `r` into one map. Every key in `l`
    /// must be less than `key`, which must be less than every key in `r`.
    /// Migrates the smaller side's nodes into the larger side's arena so the
    /// result owns a single, contiguous arena rather than two.
    pub fn join_with_pivot(l: Self, key: K, value: V, r: Self) -> Self
    where
        U: Clone,
        C: Clone,
    {
        let (mut l_arena, l_root, l_bh, l_len, updater, cmp) = into_raw_parts(l);
        let (mut r_arena, r_root, r_bh, r_len, _updater2, _cmp2) = into_raw_parts(r);

        if l_len >= r_len {
            let pivot = alloc_node(&mut l_arena, key, value, &updater);
            let migrated_r = migrate_subtree(&mut r_arena, r_root, &mut l_arena);
            let (root, bh) = super::join_with_pivot(
                &mut l_arena,
                (l_root, l_bh),
                pivot,
                (migrated_r, r_bh),
                &updater,
            );
            let begin = if root == SENTINEL {
                SENTINEL
            } else {
                tree_min(&l_arena, root)
            };
            RbMap {
                arena: l_arena,
                root,
                begin,
                black_height: bh,
                len: l_len + r_len + 1,
                updater,
                cmp,
            }
        } else {
            let pivot = alloc_node(&mut r_arena, key, value, &updater);
            let migrated_l = migrate_subtree(&mut l_arena, l_root, &mut r_arena);
            let (root, bh) = super::join_with_pivot(
                &mut r_arena,
                (migrated_l, l_bh),
                pivot,
                (r_root, r_bh),
                &updater,
            );
            let begin = if root == SENTINEL {
                SENTINEL
            } else {
                tree_min(&r_arena, root)
            };
            RbMap {
                arena: r_arena,
                root,
                begin,
                black_height: bh,
                len: l_len + r_len + 1,
                updater,
                cmp,
            }
        }
    }
}

impl<K, V, C> RbMap<K, V, usize, OrderStatisticUpdater, C>
where
    C: Comparator<K>,
{
    /// The number of entries in the map, read from the root's augmentation
    /// in O(1) rather than walked.
    pub fn size(&self) -> usize {
        if self.root == SENTINEL {
            0
        } else {
            *self.arena.get(self.root).metadata()
        }
    }

    /// The `i`th smallest entry (0-indexed), or `None` if `i >= size()`.
    pub fn find_by_order(&self, mut i: usize) -> Option<(&K, &V)> {
        let mut n = self.root;
        loop {
            if n == SENTINEL {
                return None;
            }
            let node = self.arena.get(n);
            let left = node.left();
            let left_size = if left == SENTINEL {
                0
            } else {
                *self.arena.get(left).metadata()
            };
            match i.cmp(&left_size) {
                Ordering::Less => n = left,
                Ordering::Equal => {
                    let node = self.arena.get(n);
                    return Some((node.key(), node.value()));
                }
                Ordering::Greater => {
                    i -= left_size + 1;
                    n = node.right();
                }
            }
        }
    }

    /// The number of keys strictly less than `k`. If `k` is absent, this is
    /// the rank it would have if inserted.
    pub fn order_of_key(&self, k: &K) -> usize {
        let mut n = self.root;
        let mut order = 0;
        loop {
            if n == SENTINEL {
                return order;
            }
            let node = self.arena.get(n);
            match self.cmp.compare(k, node.key()) {
                Ordering::Less => n = node.left(),
                Ordering::Greater => {
                    let left = node.left();
                    let left_size = if left == SENTINEL {
                        0
                    } else {
                        *self.arena.get(left).metadata()
                    };
                    order += left_size + 1;
                    n = node.right();
                }
                Ordering::Equal => {
                    let left = node.left();
                    let left_size = if left == SENTINEL {
                        0
                    } else {
                        *self.arena.get(left).metadata()
                    };
                    return order + left_size;
                }
            }
        }
    }
}

impl<K, V, M, U, C> Drop for RbMap<K, V, M, U, C> {
    fn drop(&mut self) {
        free_subtree(&mut self.arena, self.root);
    }
}

impl<K, V, M, U, C> Index<&K> for RbMap<K, V, M, U, C>
where
    M: Clone,
    U: MetadataUpdater<K, M>,
    C: Comparator<K>,
{
    type Output = V;

    fn index(&self, k: &K) -> &V {
        self.get(k).expect("no entry found for key")
    }
}

impl<K, V, M, U, C> IndexMut<&K> for RbMap<K, V, M, U, C>
where
    M: Clone,
    U: MetadataUpdater<K, M>,
    C: Comparator<K>,
{
    fn index_mut(&mut self, k: &K) -> &mut V {
        self.get_mut(k).expect("no entry found for key")
    }
}

impl<'a, K, V, M, U, C> IntoIterator for &'a RbMap<K, V, M, U, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, M>;

    fn into_iter(self) -> Iter<'a, K, V, M> {
        self.iter()
    }
}

impl<'a, K, V, M, U, C> IntoIterator for &'a mut RbMap<K, V, M, U, C> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V, M>;

    fn into_iter(self) -> IterMut<'a, K, V, M> {
        self.iter_mut()
    }
}

/// Destructures a map that implements `Drop` into its raw field values,
/// safely. `ManuallyDrop` suspends the automatic destructor; the arena field
/// is replaced with an empty placeholder and `root` is cleared before the
/// suspended value is reassembled and dropped, so that drop (which frees
/// `root`'s subtree out of `arena`) runs against an already-empty pair and is
/// a verified no-op, rather than a double free of the nodes this function
/// hands back to the caller.
fn into_raw_parts<K, V, M, U: Clone, C: Clone>(
    map: RbMap<K, V, M, U, C>,
) -> (Arena<RbNode<K, V, M>>, u32, u32, usize, U, C) {
    let mut this = ManuallyDrop::new(map);
    let arena = std::mem::replace(&mut this.arena, Arena::new());
    let root = this.root;
    let black_height = this.black_height;
    let len = this.len;
    let updater = this.updater.clone();
    let cmp = this.cmp.clone();
    this.root = SENTINEL;
    drop(ManuallyDrop::into_inner(this));
    (arena, root, black_height, len, updater, cmp)
}

pub struct Iter<'a, K, V, M> {
    arena: &'a Arena<RbNode<K, V, M>>,
    front: u32,
    back: u32,
    done: bool,
}

impl<'a, K, V, M> Iterator for Iter<'a, K, V, M> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let cur = self.front;
        if cur == self.back {
            self.done = true;
        } else {
            self.front = successor(self.arena, cur);
        }
        let node = self.arena.get(cur);
        Some((node.key(), node.value()))
    }
}

impl<'a, K, V, M> DoubleEndedIterator for Iter<'a, K, V, M> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let cur = self.back;
        if cur == self.front {
            self.done = true;
        } else {
            self.back = predecessor(self.arena, cur);
        }
        let node = self.arena.get(cur);
        Some((node.key(), node.value()))
    }
}

/// Iterates `(&K, &mut V)` pairs in key order. The in-order index sequence is
/// precomputed once via shared borrows of the arena; each call to `next`
/// then hands out a disjoint mutable reference into that fixed sequence, the
/// same approach the standard library's own slice/map `IterMut` types use to
/// offer a real `Iterator` impl (whose `Item` must outlive the `&mut self`
/// borrow of `next`) without re-deriving the traversal order on every step.
pub struct IterMut<'a, K, V, M> {
    arena: &'a mut Arena<RbNode<K, V, M>>,
    order: Vec<u32>,
    front: usize,
    back: Option<usize>,
}

impl<'a, K, V, M> Iterator for IterMut<'a, K, V, M> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let back = self.back.unwrap_or(self.order.len());
        if self.front >= back {
            return None;
        }
        let idx = self.order[self.front];
        self.front += 1;
        // SAFETY: `order` lists each live node's index exactly once, and
        // `front`/`back` only ever advance toward each other, so no two
        // calls to `next`/`next_back` on this iterator ever hand out
        // references to the same node.
        let node_ptr: *mut RbNode<K, V, M> = self.arena.get_mut(idx);
        unsafe { Some((&(*node_ptr).key, &mut (*node_ptr).value)) }
    }
}

impl<'a, K, V, M> DoubleEndedIterator for IterMut<'a, K, V, M> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let back = self.back.unwrap_or(self.order.len());
        if self.front >= back {
            return None;
        }
        let new_back = back - 1;
        self.back = Some(new_back);
        let idx = self.order[new_back];
        let node_ptr: *mut RbNode<K, V, M> = self.arena.get_mut(idx);
        unsafe { Some((&(*node_ptr).key, &mut (*node_ptr).value)) }
    }
}
