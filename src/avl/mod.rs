//! AVL node type, insert fixup, join-with-pivot, join-based split, and
//! join-based deletion. The balance discipline tracks a signed `height_diff`
//! (`right height - left height`, always in `{-1, 0, 1}`) per node rather
//! than recomputing subtree heights on the fly, and walks the inserted
//! leaf's ancestors exactly once, stopping as soon as a rotation (or a
//! height_diff that returns to zero) absorbs the height change. The two
//! double rotations are each built from two calls to the same unified
//! `rotate` primitive red-black uses (see [`crate::link`]), rather than
//! dedicated four-pointer rewiring code.

pub mod map;

use std::cmp::Ordering;

use crate::arena::{Arena, SENTINEL};
use crate::augment::{update_metadata, update_metadata_to_root, MetadataUpdater, NodeMeta};
use crate::comparator::Comparator;
use crate::error::{InvariantResult, InvariantViolation};
use crate::link::{rotate, set_child, tree_max, tree_min, Dir, NodeKey, NodeLinks};

pub struct AvlNode<K, V, M> {
    parent: u32,
    left: u32,
    right: u32,
    height_diff: i8,
    key: K,
    value: V,
    metadata: M,
}

impl<K, V, M> AvlNode<K, V, M> {
    fn new(key: K, value: V, metadata: M) -> Self {
        AvlNode {
            parent: SENTINEL,
            left: SENTINEL,
            right: SENTINEL,
            height_diff: 0,
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

impl<K, V, M> NodeLinks for AvlNode<K, V, M> {
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

impl<K, V, M> NodeKey<K> for AvlNode<K, V, M> {
    fn key(&self) -> &K {
        &self.key
    }
}

impl<K, V, M> NodeMeta<M> for AvlNode<K, V, M> {
    fn metadata(&self) -> &M {
        &self.metadata
    }
    fn set_metadata(&mut self, m: M) {
        self.metadata = m;
    }
}

pub fn alloc_node<K, V, M, U>(arena: &mut Arena<AvlNode<K, V, M>>, key: K, value: V, updater: &U) -> u32
where
    U: MetadataUpdater<K, M>,
{
    let metadata = updater.leaf_metadata(&key);
    arena.alloc(AvlNode::new(key, value, metadata))
}

/// Given a node's cached height `h` and its own `height_diff`, returns
/// `(left_height, right_height)`. `height_diff = right_height - left_height`
/// and `h = 1 + max(left_height, right_height)` together pin down both
/// children's heights from the node's own two fields, with no need to walk
/// down and recompute.
fn child_heights<K, V, M>(arena: &Arena<AvlNode<K, V, M>>, n: u32, h: u32) -> (u32, u32) {
    let d = arena.get(n).height_diff as i32;
    let h = h as i32;
    let (left, right) = if d < 0 { (h - 1, h - 1 + d) } else { (h - 1 - d, h - 1) };
    (left as u32, right as u32)
}

/// AVL insert fixup, climbing from `leaf` toward `*root`. Mirrors the
/// canonical single/double rotation case analysis directly. A rotation can
/// make a participant node (the old `x`, or `z` in the double-rotation case)
/// end up as a *child* of the new local subtree root rather than staying on
/// `leaf`'s ancestor chain, so its metadata is fixed explicitly right after
/// the rotation that settles its children, before the final
/// `update_metadata_to_root(leaf, ..)` walk covers the unaffected ancestors
/// above the rotation site.
/// Returns whether the subtree's height increased.
pub fn fix_insert<K, V, M, U>(arena: &mut Arena<AvlNode<K, V, M>>, root: &mut u32, leaf: u32, updater: &U) -> bool
where
    M: Clone,
    U: MetadataUpdater<K, M>,
{
    let mut z = leaf;
    loop {
        if z == *root {
            update_metadata_to_root(arena, leaf, updater);
            return true;
        }
        let x = arena.get(z).parent();
        if arena.get(x).right() == z {
            if arena.get(x).height_diff > 0 {
                if arena.get(z).height_diff < 0 {
                    let was_root = x == *root;
                    rotate(arena, z, Dir::Right);
                    // `z`'s children are both finalized subtrees after this
                    // first rotation (the second rotation below never
                    // touches `z` again).
                    update_metadata(arena, z, updater);
                    let y = rotate(arena, x, Dir::Left);
                    let y_diff = arena.get(y).height_diff;
                    if y_diff == 0 {
                        arena.get_mut(x).height_diff = 0;
                        arena.get_mut(z).height_diff = 0;
                    } else if y_diff > 0 {
                        arena.get_mut(x).height_diff = -1;
                        arena.get_mut(z).height_diff = 0;
                    } else {
                        arena.get_mut(x).height_diff = 0;
                        arena.get_mut(z).height_diff = 1;
                    }
                    arena.get_mut(y).height_diff = 0;
                    if was_root {
                        *root = y;
                    }
                    // `x`'s children are finalized after the second
                    // rotation; `y` then becomes the parent of both `x` and
                    // the already-fixed `z`, so `x` must be fixed first.
                    update_metadata(arena, x, updater);
                    update_metadata(arena, y, updater);
                } else {
                    let was_root = x == *root;
                    let y = rotate(arena, x, Dir::Left);
                    arena.get_mut(x).height_diff = 0;
                    arena.get_mut(z).height_diff = 0;
                    if was_root {
                        *root = y;
                    }
                    update_metadata(arena, x, updater);
                    update_metadata(arena, y, updater);
                }
                update_metadata_to_root(arena, leaf, updater);
                return false;
            } else {
                let height_diff = arena.get(x).height_diff;
                let stop = height_diff < 0;
                arena.get_mut(x).height_diff = if stop { 0 } else { 1 };
                z = x;
                if stop {
                    update_metadata_to_root(arena, leaf, updater);
                    return false;
                }
            }
        } else if arena.get(x).height_diff < 0 {
            if arena.get(z).height_diff > 0 {
                let was_root = x == *root;
                rotate(arena, z, Dir::Left);
                update_metadata(arena, z, updater);
                let y = rotate(arena, x, Dir::Right);
                let y_diff = arena.get(y).height_diff;
                if y_diff == 0 {
                    arena.get_mut(x).height_diff = 0;
                    arena.get_mut(z).height_diff = 0;
                } else if y_diff < 0 {
                    arena.get_mut(x).height_diff = 1;
                    arena.get_mut(z).height_diff = 0;
                } else {
                    arena.get_mut(x).height_diff = 0;
                    arena.get_mut(z).height_diff = -1;
                }
                arena.get_mut(y).height_diff = 0;
                if was_root {
                    *root = y;
                }
                update_metadata(arena, x, updater);
                update_metadata(arena, y, updater);
            } else {
                let was_root = x == *root;
                let y = rotate(arena, x, Dir::Right);
                arena.get_mut(x).height_diff = 0;
                arena.get_mut(z).height_diff = 0;
                if was_root {
                    *root = y;
                }
                update_metadata(arena, x, updater);
                update_metadata(arena, y, updater);
            }
            update_metadata_to_root(arena, leaf, updater);
            return false;
        } else {
            let height_diff = arena.get(x).height_diff;
            let stop = height_diff > 0;
            arena.get_mut(x).height_diff = if stop { 0 } else { -1 };
            z = x;
            if stop {
                update_metadata_to_root(arena, leaf, updater);
                return false;
            }
        }
    }
}

fn fix_insert_and_height<K, V, M, U>(
    arena: &mut Arena<AvlNode<K, V, M>>,
    root: &mut u32,
    leaf: u32,
    h: u32,
    updater: &U,
) -> u32
where
    M: Clone,
    U: MetadataUpdater<K, M>,
{
    if fix_insert(arena, root, leaf, updater) {
        h + 1
    } else {
        h
    }
}

/// Joins `L`, a separating pivot, and `R` into one tree. Every key in `L`
/// must be less than `pivot`'s key, which must be less than every key in
/// `R`. `pivot` must be an allocated, unlinked node. Returns the new
/// `(root, height)`.
pub fn join_with_pivot<K, V, M, U>(
    arena: &mut Arena<AvlNode<K, V, M>>,
    l: (u32, u32),
    pivot: u32,
    r: (u32, u32),
    updater: &U,
) -> (u32, u32)
where
    M: Clone,
    U: MetadataUpdater<K, M>,
{
    let (l_root, l_h) = l;
    let (r_root, r_h) = r;

    if l_root == SENTINEL && r_root == SENTINEL {
        arena.get_mut(pivot).set_parent(SENTINEL);
        arena.get_mut(pivot).height_diff = 0;
        update_metadata(arena, pivot, updater);
        return (pivot, 1);
    }

    if l_root == SENTINEL {
        let min = tree_min(arena, r_root);
        set_child(arena, min, Dir::Left, pivot);
        arena.get_mut(pivot).height_diff = 0;
        let mut root = r_root;
        let h = fix_insert_and_height(arena, &mut root, pivot, r_h, updater);
        return (root, h);
    }

    if r_root == SENTINEL {
        let max = tree_max(arena, l_root);
        set_child(arena, max, Dir::Right, pivot);
        arena.get_mut(pivot).height_diff = 0;
        let mut root = l_root;
        let h = fix_insert_and_height(arena, &mut root, pivot, l_h, updater);
        return (root, h);
    }

    if l_h > r_h + 1 {
        let mut ptr = l_root;
        let mut left_height = l_h;
        loop {
            left_height -= if arena.get(ptr).height_diff < 0 { 2 } else { 1 };
            if left_height <= r_h + 1 {
                break;
            }
            ptr = arena.get(ptr).right();
        }
        let carried = arena.get(ptr).right();
        set_child(arena, pivot, Dir::Left, carried);
        set_child(arena, pivot, Dir::Right, r_root);
        set_child(arena, ptr, Dir::Right, pivot);
        arena.get_mut(pivot).height_diff = match left_height.cmp(&r_h) {
            Ordering::Less => 1,
            Ordering::Equal => 0,
            Ordering::Greater => -1,
        };
        let mut root = l_root;
        let h = fix_insert_and_height(arena, &mut root, pivot, l_h, updater);
        (root, h)
    } else if r_h > l_h + 1 {
        let mut ptr = r_root;
        let mut right_height = r_h;
        loop {
            right_height -= if arena.get(ptr).height_diff > 0 { 2 } else { 1 };
            if right_height <= l_h + 1 {
                break;
            }
            ptr = arena.get(ptr).left();
        }
        let carried = arena.get(ptr).left();
        set_child(arena, pivot, Dir::Right, carried);
        set_child(arena, pivot, Dir::Left, l_root);
        set_child(arena, ptr, Dir::Left, pivot);
        arena.get_mut(pivot).height_diff = match l_h.cmp(&right_height) {
            Ordering::Less => 1,
            Ordering::Equal => 0,
            Ordering::Greater => -1,
        };
        let mut root = r_root;
        let h = fix_insert_and_height(arena, &mut root, pivot, r_h, updater);
        (root, h)
    } else {
        set_child(arena, pivot, Dir::Left, l_root);
        set_child(arena, pivot, Dir::Right, r_root);
        arena.get_mut(pivot).set_parent(SENTINEL);
        arena.get_mut(pivot).height_diff = match l_h.cmp(&r_h) {
            Ordering::Less => 1,
            Ordering::Equal => 0,
            Ordering::Greater => -1,
        };
        update_metadata(arena, pivot, updater);
        (pivot, l_h.max(r_h) + 1)
    }
}

/// Splits the tree rooted at `root` (with cached height `h`) around `k`,
/// returning `(left_root, left_h, right_root, right_h)`. See
/// [`super::rb::split_by_key`] for the shared join-based structure; only the
/// height bookkeeping differs.
pub fn split_by_key<K, V, M, U, C>(
    arena: &mut Arena<AvlNode<K, V, M>>,
    root: u32,
    h: u32,
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
    let (left_h, right_h) = child_heights(arena, root, h);
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
            let (ll, ll_h, lr, lr_h) = split_by_key(arena, left, left_h, k, equal_on_left, cmp, updater);
            let (new_right, new_right_h) = join_with_pivot(arena, (lr, lr_h), root, (right, right_h), updater);
            (ll, ll_h, new_right, new_right_h)
        }
        Ordering::Less => {
            let (rl, rl_h, rr, rr_h) = split_by_key(arena, right, right_h, k, equal_on_left, cmp, updater);
            let (new_left, new_left_h) = join_with_pivot(arena, (left, left_h), root, (rl, rl_h), updater);
            (new_left, new_left_h, rr, rr_h)
        }
        Ordering::Equal => {
            if equal_on_left {
                let (new_left, new_left_h) = join_with_pivot(arena, (left, left_h), root, (SENTINEL, 0), updater);
                (new_left, new_left_h, right, right_h)
            } else {
                let (new_right, new_right_h) = join_with_pivot(arena, (SENTINEL, 0), root, (right, right_h), updater);
                (left, left_h, new_right, new_right_h)
            }
        }
    }
}

/// Detaches and returns the maximum node of the subtree rooted at `root`,
/// rejoining the remainder.
fn split_off_max<K, V, M, U>(arena: &mut Arena<AvlNode<K, V, M>>, root: u32, h: u32, updater: &U) -> (u32, u32, u32)
where
    M: Clone,
    U: MetadataUpdater<K, M>,
{
    let left = arena.get(root).left();
    let right = arena.get(root).right();
    let (left_h, right_h) = child_heights(arena, root, h);

    if right == SENTINEL {
        if left != SENTINEL {
            arena.get_mut(left).set_parent(SENTINEL);
        }
        arena.get_mut(root).set_left(SENTINEL);
        arena.get_mut(root).set_parent(SENTINEL);
        return (left, left_h, root);
    }

    let (new_right, new_right_h, max_node) = split_off_max(arena, right, right_h, updater);
    if left != SENTINEL {
        arena.get_mut(left).set_parent(SENTINEL);
    }
    arena.get_mut(root).set_left(SENTINEL);
    arena.get_mut(root).set_right(SENTINEL);
    arena.get_mut(root).set_parent(SENTINEL);
    let (joined_root, joined_h) = join_with_pivot(arena, (left, left_h), root, (new_right, new_right_h), updater);
    (joined_root, joined_h, max_node)
}

/// Concatenates two trees with no separating pivot of their own.
fn join2<K, V, M, U>(
    arena: &mut Arena<AvlNode<K, V, M>>,
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
    let (l2_root, l2_h, pivot) = split_off_max(arena, l.0, l.1, updater);
    join_with_pivot(arena, (l2_root, l2_h), pivot, r, updater)
}

/// Moves every node reachable from `src_root` out of `src` and into `dst`,
/// preserving structure and balance factors exactly. Used when combining two
/// maps that each own a separate arena.
pub fn migrate_subtree<K, V, M>(
    src: &mut Arena<AvlNode<K, V, M>>,
    src_root: u32,
    dst: &mut Arena<AvlNode<K, V, M>>,
) -> u32 {
    if src_root == SENTINEL {
        return SENTINEL;
    }
    let left = src.get(src_root).left;
    let right = src.get(src_root).right;
    let height_diff = src.get(src_root).height_diff;
    let node = src.dealloc(src_root);
    let new_left = migrate_subtree(src, left, dst);
    let new_right = migrate_subtree(src, right, dst);
    let new_idx = dst.alloc(AvlNode {
        parent: SENTINEL,
        left: new_left,
        right: new_right,
        height_diff,
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

/// Removes `k` by splitting the tree around it and rejoining the halves.
pub fn remove<K, V, M, U, C>(
    arena: &mut Arena<AvlNode<K, V, M>>,
    root: u32,
    h: u32,
    k: &K,
    cmp: &C,
    updater: &U,
) -> (u32, u32, Option<V>)
where
    M: Clone,
    U: MetadataUpdater<K, M>,
    C: Comparator<K>,
{
    let (tl, tl_h, tr, tr_h) = split_by_key(arena, root, h, k, true, cmp, updater);

    let found = tl != SENTINEL && cmp.compare(arena.get(tree_max(arena, tl)).key(), k) == Ordering::Equal;
    if !found {
        let (r, new_h) = join2(arena, (tl, tl_h), (tr, tr_h), updater);
        return (r, new_h, None);
    }

    let (tl2_root, tl2_h, victim) = split_off_max(arena, tl, tl_h, updater);
    let removed = arena.dealloc(victim);
    let (r, new_h) = join2(arena, (tl2_root, tl2_h), (tr, tr_h), updater);
    (r, new_h, Some(removed.value))
}

/// Checks the BST ordering, parent/child agreement, balance, and
/// augmentation invariants (every node's metadata equals `updater.recompute`
/// of its children's) against the cached `h`. Used by tests; not on any
/// mutating path.
pub fn check_invariants<K, V, M, U, C>(
    arena: &Arena<AvlNode<K, V, M>>,
    root: u32,
    h: u32,
    cmp: &C,
    updater: &U,
) -> InvariantResult
where
    M: Clone + PartialEq,
    U: MetadataUpdater<K, M>,
    C: Comparator<K>,
{
    let found_h = check_node(arena, root, cmp, updater, None, None)?;
    if found_h != h {
        return Err(InvariantViolation::BlackHeightMismatch {
            node: root,
            expected: h,
            found: found_h,
        });
    }
    Ok(())
}

fn check_node<K, V, M, U, C>(
    arena: &Arena<AvlNode<K, V, M>>,
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
    if node.height_diff < -1 || node.height_diff > 1 {
        return Err(InvariantViolation::BalanceFactorOutOfRange {
            node: n,
            found: node.height_diff,
        });
    }
    let left_h = check_node(arena, node.left(), cmp, updater, lo, Some(node.key()))?;
    let right_h = check_node(arena, node.right(), cmp, updater, Some(node.key()), hi)?;
    let actual = right_h as i32 - left_h as i32;
    if actual != node.height_diff as i32 {
        return Err(InvariantViolation::HeightDiffMismatch {
            node: n,
            cached: node.height_diff,
            actual: actual as i8,
        });
    }
    let left_meta = (node.left() != SENTINEL).then(|| arena.get(node.left()).metadata().clone());
    let right_meta = (node.right() != SENTINEL).then(|| arena.get(node.right()).metadata().clone());
    let expected = updater.recompute(node.key(), left_meta.as_ref(), right_meta.as_ref());
    if *node.metadata() != expected {
        return Err(InvariantViolation::MetadataDrift(n));
    }
    Ok(left_h.max(right_h) + 1)
}
