//! Red-black node type, insert fixup, join-with-pivot, join-based split, and
//! the join-based deletion built from split/join. The balance discipline
//! mirrors the canonical CLRS algorithm; the unified `rotate` (see
//! [`crate::link`]) collapses the guarded/root-adjacent rotation cases into
//! one function by exploiting the arena's sentinel-as-index-zero trick.

pub mod map;

use std::cmp::Ordering;

use crate::arena::{Arena, SENTINEL};
use crate::augment::{update_metadata, update_metadata_to_root, MetadataUpdater, NodeMeta};
use crate::comparator::Comparator;
use crate::error::{InvariantResult, InvariantViolation};
use crate::link::{child, child_dir, rotate, set_child, tree_max, tree_min, Dir, NodeKey, NodeLinks};

pub struct RbNode<K, V, M> {
    parent: u32,
    left: u32,
    right: u32,
    is_black: bool,
    key: K,
    value: V,
    metadata: M,
}

impl<K, V, M> RbNode<K, V, M> {
    fn new(key: K, value: V, metadata: M) -> Self {
        RbNode {
            parent: SENTINEL,
            left: SENTINEL,
            right: SENTINEL,
            is_black: false,
            key,
            value,
            metadata,
        }
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }
}

impl<K, V, M> NodeLinks for RbNode<K, V, M> {
    fn parent(&self) -> u32 {
        self.parent
    }
    fn set_parent(&mut self, p: u32) {
        self.parent = p;
    }
    fn left(&self) -> u32 {
        self.left
    }
    fn set_left(&mut self, l: u32) {
        self.left = l;
    }
    fn right(&self) -> u32 {
        self.right
    }
    fn set_right(&mut self, r: u32) {
        self.right = r;
    }
}

impl<K, V, M> NodeKey<K> for RbNode<K, V, M> {
    fn key(&self) -> &K {
        &self.key
    }
}

impl<K, V, M> NodeMeta<M> for RbNode<K, V, M> {
    fn metadata(&self) -> &M {
        &self.metadata
    }
    fn set_metadata(&mut self, m: M) {
        self.metadata = m;
    }
}

#[inline]
fn is_red<K, V, M>(arena: &Arena<RbNode<K, V, M>>, n: u32) -> bool {
    n != SENTINEL && !arena.get(n).is_black
}

#[inline]
fn is_black<K, V, M>(arena: &Arena<RbNode<K, V, M>>, n: u32) -> bool {
    !is_red(arena, n)
}

#[inline]
fn color_red<K, V, M>(arena: &mut Arena<RbNode<K, V, M>>, n: u32) {
    if n != SENTINEL {
        arena.get_mut(n).is_black = false;
    }
}

#[inline]
fn color_black<K, V, M>(arena: &mut Arena<RbNode<K, V, M>>, n: u32) {
    if n != SENTINEL {
        arena.get_mut(n).is_black = true;
    }
}

pub fn alloc_node<K, V, M, U>(
    arena: &mut Arena<RbNode<K, V, M>>,
    key: K,
    value: V,
    updater: &U,
) -> u32
where
    U: MetadataUpdater<K, M>,
{
    let metadata = updater.leaf_metadata(&key);
    arena.alloc(RbNode::new(key, value, metadata))
}

/// Red-black insert fixup. `leaf` is a freshly-inserted red node whose
/// metadata has already been set via `leaf_metadata`. Structural rebalancing
/// follows the canonical algorithm. A rotation can leave one of its
/// participants as a *child* of the new local subtree root instead of an
/// ancestor of `leaf`, so that participant's metadata is fixed explicitly,
/// children-before-parent, right after the rotation that settles its
/// children — the trailing `update_metadata_to_root(leaf, ..)` walk only
/// needs to cover the unaffected ancestors above the rotation site.
pub fn fix_insert<K, V, M, U>(
    arena: &mut Arena<RbNode<K, V, M>>,
    root: &mut u32,
    leaf: u32,
    updater: &U,
) where
    M: Clone,
    U: MetadataUpdater<K, M>,
{
    let mut node = leaf;
    while is_red(arena, arena.get(node).parent()) {
        let parent = arena.get(node).parent();
        let grandparent = arena.get(parent).parent();
        if grandparent == SENTINEL {
            break;
        }
        let dir = child_dir(arena, grandparent, parent);
        let uncle = child(arena, grandparent, dir.opposite());
        if is_red(arena, uncle) {
            color_black(arena, uncle);
            color_black(arena, parent);
            color_red(arena, grandparent);
            node = grandparent;
        } else {
            let mut low = node;
            if child_dir(arena, parent, low) == dir.opposite() {
                let was_root = parent == *root;
                let new_local = rotate(arena, parent, dir);
                if was_root {
                    *root = new_local;
                }
                // `parent`'s children are fully settled by this rotation (the
                // second rotation below never touches it again), so its
                // metadata can be fixed now, before it's read as a finalized
                // child of whatever becomes the new local root.
                update_metadata(arena, parent, updater);
                low = parent;
            }
            let p = arena.get(low).parent();
            let g = arena.get(p).parent();
            color_black(arena, p);
            color_red(arena, g);
            let was_root = g == *root;
            let new_local = rotate(arena, g, dir.opposite());
            if was_root {
                *root = new_local;
            }
            // `g`'s children are both finalized subtrees after this rotation;
            // `p` then becomes `g`'s new parent, so `g` must be fixed first.
            update_metadata(arena, g, updater);
            update_metadata(arena, p, updater);
            node = low;
            break;
        }
    }
    color_black(arena, *root);
    update_metadata_to_root(arena, leaf, updater);
}

pub fn fix_insert_and_black_height<K, V, M, U>(
    arena: &mut Arena<RbNode<K, V, M>>,
    root: &mut u32,
    leaf: u32,
    bh: u32,
    updater: &U,
) -> u32
where
    M: Clone,
    U: MetadataUpdater<K, M>,
{
    let root_was_red = is_red(arena, *root);
    fix_insert(arena, root, leaf, updater);
    if root_was_red {
        bh + 1
    } else {
        bh
    }
}

/// Joins `L`, a separating pivot, and `R` into one tree. Every key in `L`
/// must be less than `pivot`'s key, which must be less than every key in
/// `R`. `pivot` must be an allocated, unlinked node; its metadata is
/// (re)computed here. Returns the new `(root, black_height)`.
pub fn join_with_pivot<K, V, M, U>(
    arena: &mut Arena<RbNode<K, V, M>>,
    l: (u32, u32),
    pivot: u32,
    r: (u32, u32),
    updater: &U,
) -> (u32, u32)
where
    M: Clone,
    U: MetadataUpdater<K, M>,
{
    let (l_root, l_bh) = l;
    let (r_root, r_bh) = r;

    if l_root == SENTINEL && r_root == SENTINEL {
        arena.get_mut(pivot).set_parent(SENTINEL);
        color_black(arena, pivot);
        update_metadata(arena, pivot, updater);
        return (pivot, 1);
    }

    if l_root == SENTINEL {
        let min = tree_min(arena, r_root);
        set_child(arena, min, Dir::Left, pivot);
        color_red(arena, pivot);
        let mut root = r_root;
        let bh = fix_insert_and_black_height(arena, &mut root, pivot, r_bh, updater);
        return (root, bh);
    }

    if r_root == SENTINEL {
        let max = tree_max(arena, l_root);
        set_child(arena, max, Dir::Right, pivot);
        color_red(arena, pivot);
        let mut root = l_root;
        let bh = fix_insert_and_black_height(arena, &mut root, pivot, l_bh, updater);
        return (root, bh);
    }

    if l_bh == r_bh {
        set_child(arena, pivot, Dir::Left, l_root);
        set_child(arena, pivot, Dir::Right, r_root);
        arena.get_mut(pivot).set_parent(SENTINEL);
        color_black(arena, pivot);
        update_metadata(arena, pivot, updater);
        return (pivot, l_bh + 1);
    }

    if l_bh < r_bh {
        let mut p = r_root;
        let mut current_bh = r_bh;
        let mut parent_p = SENTINEL;
        loop {
            if current_bh == l_bh && is_black(arena, p) {
                break;
            }
            parent_p = p;
            if is_black(arena, p) {
                current_bh -= 1;
            }
            p = arena.get(p).left();
        }
        set_child(arena, parent_p, Dir::Left, pivot);
        set_child(arena, pivot, Dir::Left, l_root);
        set_child(arena, pivot, Dir::Right, p);
        color_red(arena, pivot);
        update_metadata(arena, pivot, updater);
        let mut root = r_root;
        let bh = fix_insert_and_black_height(arena, &mut root, pivot, r_bh, updater);
        (root, bh)
    } else {
        let mut p = l_root;
        let mut current_bh = l_bh;
        let mut parent_p = SENTINEL;
        loop {
            if current_bh == r_bh && is_black(arena, p) {
                break;
            }
            parent_p = p;
            if is_black(arena, p) {
                current_bh -= 1;
            }
            p = arena.get(p).right();
        }
        set_child(arena, parent_p, Dir::Right, pivot);
        set_child(arena, pivot, Dir::Right, r_root);
        set_child(arena, pivot, Dir::Left, p);
        color_red(arena, pivot);
        update_metadata(arena, pivot, updater);
        let mut root = l_root;
        let bh = fix_insert_and_black_height(arena, &mut root, pivot, l_bh, updater);
        (root, bh)
    }
}

/// Splits the tree rooted at `root` (with cached black height `bh`) around
/// `k`, returning `(left_root, left_bh, right_root, right_bh)`. When
/// `equal_on_left` is set, a node whose key equals `k` ends up in the left
/// partition; otherwise it ends up in the right one.
///
/// Recurses into the child on `k`'s side and rejoins the other side with
/// `join_with_pivot`, reusing join rather than re-deriving balance from
/// scratch.
pub fn split_by_key<K, V, M, U, C>(
    arena: &mut Arena<RbNode<K, V, M>>,
    root: u32,
    bh: u32,
    k: &K,
    equal_on_left: bool,
    cmp: &C,
    updater: &U,
) -> (u32, u32, u32, u32)
where
    M: Clone,
    U: MetadataUpdater<K, M>,
    C: Comparator<K>,
{
    if root == SENTINEL {
        return (SENTINEL, 0, SENTINEL, 0);
    }

    let left = arena.get(root).left();
    let right = arena.get(root).right();
    let was_black = arena.get(root).is_black;
    let child_bh = if was_black { bh - 1 } else { bh };
    let ordering = cmp.compare(arena.get(root).key(), k);

    if left != SENTINEL {
        arena.get_mut(left).set_parent(SENTINEL);
    }
    if right != SENTINEL {
        arena.get_mut(right).set_parent(SENTINEL);
    }
    arena.get_mut(root).set_left(SENTINEL);
    arena.get_mut(root).set_right(SENTINEL);
    arena.get_mut(root).set_parent(SENTINEL);

    match ordering {
        Ordering::Greater => {
            let (ll, ll_bh, lr, lr_bh) =
                split_by_key(arena, left, child_bh, k, equal_on_left, cmp, updater);
            let (new_right, new_right_bh) =
                join_with_pivot(arena, (lr, lr_bh), root, (right, child_bh), updater);
            (ll, ll_bh, new_right, new_right_bh)
        }
        Ordering::Less => {
            let (rl, rl_bh, rr, rr_bh) =
                split_by_key(arena, right, child_bh, k, equal_on_left, cmp, updater);
            let (new_left, new_left_bh) =
                join_with_pivot(arena, (left, child_bh), root, (rl, rl_bh), updater);
            (new_left, new_left_bh, rr, rr_bh)
        }
        Ordering::Equal => {
            if equal_on_left {
                let (new_left, new_left_bh) =
                    join_with_pivot(arena, (left, child_bh), root, (SENTINEL, 0), updater);
                (new_left, new_left_bh, right, child_bh)
            } else {
                let (new_right, new_right_bh) =
                    join_with_pivot(arena, (SENTINEL, 0), root, (right, child_bh), updater);
                (left, child_bh, new_right, new_right_bh)
            }
        }
    }
}

/// Detaches and returns the maximum node of the subtree rooted at `root`,
/// rejoining the remainder. Used by [`join2`] and by join-based deletion to
/// produce a pivot without a comparator-driven split.
fn split_off_max<K, V, M, U>(
    arena: &mut Arena<RbNode<K, V, M>>,
    root: u32,
    bh: u32,
    updater: &U,
) -> (u32, u32, u32)
where
    M: Clone,
    U: MetadataUpdater<K, M>,
{
    let left = arena.get(root).left();
    let right = arena.get(root).right();
    let was_black = arena.get(root).is_black;
    let child_bh = if was_black { bh - 1 } else { bh };

    if right == SENTINEL {
        if left != SENTINEL {
            arena.get_mut(left).set_parent(SENTINEL);
        }
        arena.get_mut(root).set_left(SENTINEL);
        arena.get_mut(root).set_parent(SENTINEL);
        return (left, child_bh, root);
    }

    let (new_right, new_right_bh, max_node) = split_off_max(arena, right, child_bh, updater);
    if left != SENTINEL {
        arena.get_mut(left).set_parent(SENTINEL);
    }
    arena.get_mut(root).set_left(SENTINEL);
    arena.get_mut(root).set_right(SENTINEL);
    arena.get_mut(root).set_parent(SENTINEL);
    let (joined_root, joined_bh) =
        join_with_pivot(arena, (left, child_bh), root, (new_right, new_right_bh), updater);
    (joined_root, joined_bh, max_node)
}

/// Concatenates two trees with no separating pivot of their own: every key
/// in `l` is less than every key in `r`.
fn join2<K, V, M, U>(
    arena: &mut Arena<RbNode<K, V, M>>,
    l: (u32, u32),
    r: (u32, u32),
    updater: &U,
) -> (u32, u32)
where
    M: Clone,
    U: MetadataUpdater<K, M>,
{
    if l.0 == SENTINEL {
        return r;
    }
    if r.0 == SENTINEL {
        return l;
    }
    let (l2_root, l2_bh, pivot) = split_off_max(arena, l.0, l.1, updater);
    join_with_pivot(arena, (l2_root, l2_bh), pivot, r, updater)
}

/// Moves every node reachable from `src_root` out of `src` and into `dst`,
/// preserving structure and color exactly (no rebalancing is needed: the
/// relocated subtree is structurally identical to the original). Used when
/// combining two maps that each own a separate arena. Returns the subtree's
/// new root index within `dst`.
pub fn migrate_subtree<K, V, M>(
    src: &mut Arena<RbNode<K, V, M>>,
    src_root: u32,
    dst: &mut Arena<RbNode<K, V, M>>,
) -> u32 {
    if src_root == SENTINEL {
        return SENTINEL;
    }
    let left = arena_left(src, src_root);
    let right = arena_right(src, src_root);
    let was_black = src.get(src_root).is_black;
    let node = src.dealloc(src_root);
    let new_left = migrate_subtree(src, left, dst);
    let new_right = migrate_subtree(src, right, dst);
    let new_idx = dst.alloc(RbNode {
        parent: SENTINEL,
        left: new_left,
        right: new_right,
        is_black: was_black,
        key: node.key,
        value: node.value,
        metadata: node.metadata,
    });
    if new_left != SENTINEL {
        dst.get_mut(new_left).set_parent(new_idx);
    }
    if new_right != SENTINEL {
        dst.get_mut(new_right).set_parent(new_idx);
    }
    new_idx
}

#[inline]
fn arena_left<K, V, M>(arena: &Arena<RbNode<K, V, M>>, n: u32) -> u32 {
    arena.get(n).left
}

#[inline]
fn arena_right<K, V, M>(arena: &Arena<RbNode<K, V, M>>, n: u32) -> u32 {
    arena.get(n).right
}

/// Removes `k` by splitting the tree around it and rejoining the halves,
/// rather than porting a dedicated deletion fixup. See the crate's design
/// notes for why.
pub fn remove<K, V, M, U, C>(
    arena: &mut Arena<RbNode<K, V, M>>,
    root: u32,
    bh: u32,
    k: &K,
    cmp: &C,
    updater: &U,
) -> (u32, u32, Option<V>)
where
    M: Clone,
    U: MetadataUpdater<K, M>,
    C: Comparator<K>,
{
    let (tl, tl_bh, tr, tr_bh) = split_by_key(arena, root, bh, k, true, cmp, updater);

    let found = tl != SENTINEL && cmp.compare(arena.get(tree_max(arena, tl)).key(), k) == Ordering::Equal;
    if !found {
        let (r, b) = join2(arena, (tl, tl_bh), (tr, tr_bh), updater);
        return (r, b, None);
    }

    let (tl2_root, tl2_bh, victim) = split_off_max(arena, tl, tl_bh, updater);
    let removed = arena.dealloc(victim);
    let (r, b) = join2(arena, (tl2_root, tl2_bh), (tr, tr_bh), updater);
    (r, b, Some(removed.value))
}

/// Checks the BST ordering, parent/child agreement, no-red-red, uniform
/// black-height, and augmentation invariants (every node's metadata equals
/// `updater.recompute` of its children's) against the cached `bh`. Used by
/// tests; not on any mutating path.
pub fn check_invariants<K, V, M, U, C>(
    arena: &Arena<RbNode<K, V, M>>,
    root: u32,
    bh: u32,
    cmp: &C,
    updater: &U,
) -> InvariantResult
where
    M: Clone + PartialEq,
    U: MetadataUpdater<K, M>,
    C: Comparator<K>,
{
    let found_bh = check_node(arena, root, cmp, updater, None, None)?;
    if found_bh != bh {
        return Err(InvariantViolation::BlackHeightMismatch {
            node: root,
            expected: bh,
            found: found_bh,
        });
    }
    Ok(())
}

fn check_node<K, V, M, U, C>(
    arena: &Arena<RbNode<K, V, M>>,
    n: u32,
    cmp: &C,
    updater: &U,
    lo: Option<&K>,
    hi: Option<&K>,
) -> InvariantResult<u32>
where
    M: Clone + PartialEq,
    U: MetadataUpdater<K, M>,
    C: Comparator<K>,
{
    if n == SENTINEL {
        return Ok(0);
    }
    let node = arena.get(n);
    if node.left() == n || node.right() == n {
        return Err(InvariantViolation::SelfReferentialChild(n));
    }
    if let Some(lo) = lo {
        if cmp.compare(node.key(), lo) != Ordering::Greater {
            return Err(InvariantViolation::OutOfOrder(n));
        }
    }
    if let Some(hi) = hi {
        if cmp.compare(node.key(), hi) != Ordering::Less {
            return Err(InvariantViolation::OutOfOrder(n));
        }
    }
    if node.left() != SENTINEL && arena.get(node.left()).parent() != n {
        return Err(InvariantViolation::ParentMismatch {
            parent: n,
            child: node.left(),
        });
    }
    if node.right() != SENTINEL && arena.get(node.right()).parent() != n {
        return Err(InvariantViolation::ParentMismatch {
            parent: n,
            child: node.right(),
        });
    }
    if !node.is_black && (is_red(arena, node.left()) || is_red(arena, node.right())) {
        return Err(InvariantViolation::RedRedViolation(n));
    }
    let left_bh = check_node(arena, node.left(), cmp, updater, lo, Some(node.key()))?;
    let right_bh = check_node(arena, node.right(), cmp, updater, Some(node.key()), hi)?;
    if left_bh != right_bh {
        return Err(InvariantViolation::BlackHeightMismatch {
            node: n,
            expected: left_bh,
            found: right_bh,
        });
    }
    let left_meta = (node.left() != SENTINEL).then(|| arena.get(node.left()).metadata().clone());
    let right_meta = (node.right() != SENTINEL).then(|| arena.get(node.right()).metadata().clone());
    let expected = updater.recompute(node.key(), left_meta.as_ref(), right_meta.as_ref());
    if *node.metadata() != expected {
        return Err(InvariantViolation::MetadataDrift(n));
    }
    Ok(if node.is_black { left_bh + 1 } else { left_bh })
}
