//! Height-balanced (AVL) binary search tree.
//!
//! Keys are unique. Sibling subtree heights never differ by more than one,
//! so `insert`, `find` and `delete` are O(log n) and traversal is O(n).
//!
//! The tree owns its payloads; dropping the tree (or calling
//! [`AvlTree::clear`]) releases every node.

use std::cmp::Ordering;
use std::fmt;

type Link<K, V> = Option<Box<Node<K, V>>>;

struct Node<K, V> {
    key: K,
    value: V,
    height: i32,
    left: Link<K, V>,
    right: Link<K, V>,
}

impl<K, V> Node<K, V> {
    fn new(key: K, value: V) -> Box<Self> {
        Box::new(Self {
            key,
            value,
            height: 1,
            left: None,
            right: None,
        })
    }
}

/// Order in which [`AvlTree::traverse`] visits nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Left subtree, node, right subtree. Keys come out ascending.
    InOrder,
    /// Node, left subtree, right subtree.
    PreOrder,
}

pub struct AvlTree<K, V = ()> {
    root: Link<K, V>,
    len: usize,
}

impl<K: Ord, V> Default for AvlTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord + Clone, V: Clone> Clone for AvlTree<K, V> {
    fn clone(&self) -> Self {
        fn clone_link<K: Clone, V: Clone>(link: &Link<K, V>) -> Link<K, V> {
            link.as_ref().map(|n| {
                Box::new(Node {
                    key: n.key.clone(),
                    value: n.value.clone(),
                    height: n.height,
                    left: clone_link(&n.left),
                    right: clone_link(&n.right),
                })
            })
        }
        Self {
            root: clone_link(&self.root),
            len: self.len,
        }
    }
}

impl<K: Ord, V> AvlTree<K, V> {
    pub fn new() -> Self {
        Self { root: None, len: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Height of the tree; 0 when empty.
    #[inline]
    pub fn height(&self) -> i32 {
        height(&self.root)
    }

    /// Inserts `key` with `value`.
    ///
    /// Returns `false` and leaves the stored payload untouched if the key is
    /// already present.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.upsert(key, move || value, |_| {})
    }

    /// Inserts `key` with `make()` if absent, otherwise applies `update` to
    /// the stored payload. Returns `true` when a new node was created.
    pub fn upsert<M, U>(&mut self, key: K, make: M, update: U) -> bool
    where
        M: FnOnce() -> V,
        U: FnOnce(&mut V),
    {
        let (root, inserted) = upsert_node(self.root.take(), key, make, update);
        self.root = Some(root);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    pub fn find(&self, key: &K) -> Option<&V> {
        let mut cur = self.root.as_deref();
        while let Some(node) = cur {
            cur = match key.cmp(&node.key) {
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
                Ordering::Equal => return Some(&node.value),
            };
        }
        None
    }

    /// Removes `key`, returning its payload, or `None` if it was not present.
    pub fn delete(&mut self, key: &K) -> Option<V> {
        let (root, removed) = delete_node(self.root.take(), key);
        self.root = root;
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    pub fn min_key(&self) -> Option<&K> {
        let mut cur = self.root.as_deref()?;
        while let Some(left) = cur.left.as_deref() {
            cur = left;
        }
        Some(&cur.key)
    }

    /// Visits every node exactly once in the requested order.
    pub fn traverse<F: FnMut(&K, &V)>(&self, order: Traversal, mut visit: F) {
        walk(&self.root, order, &mut visit);
    }

    /// Ascending in-order iterator over `(key, payload)` pairs.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut it = Iter { stack: Vec::new() };
        it.push_left(self.root.as_deref());
        it
    }

    /// Releases every node.
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a AvlTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a, K, V> {
    stack: Vec<&'a Node<K, V>>,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn push_left(&mut self, mut node: Option<&'a Node<K, V>>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left.as_deref();
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(node.right.as_deref());
        Some((&node.key, &node.value))
    }
}

// --- Node Helpers ---

#[inline]
fn height<K, V>(link: &Link<K, V>) -> i32 {
    link.as_ref().map_or(0, |n| n.height)
}

#[inline]
fn balance<K, V>(link: &Link<K, V>) -> i32 {
    link.as_ref()
        .map_or(0, |n| height(&n.left) - height(&n.right))
}

#[inline]
fn update_height<K, V>(node: &mut Node<K, V>) {
    node.height = height(&node.left).max(height(&node.right)) + 1;
}

/// Rotates clockwise around `y`. A node without a left child is returned as-is.
fn rotate_right<K, V>(mut y: Box<Node<K, V>>) -> Box<Node<K, V>> {
    match y.left.take() {
        Some(mut x) => {
            y.left = x.right.take();
            update_height(&mut y);
            x.right = Some(y);
            update_height(&mut x);
            x
        }
        None => y,
    }
}

/// Rotates counter-clockwise around `x`. A node without a right child is returned as-is.
fn rotate_left<K, V>(mut x: Box<Node<K, V>>) -> Box<Node<K, V>> {
    match x.right.take() {
        Some(mut y) => {
            x.right = y.left.take();
            update_height(&mut x);
            y.left = Some(x);
            update_height(&mut y);
            y
        }
        None => x,
    }
}

/// Restores the height invariant at `node`, assuming both subtrees satisfy it.
fn rebalance<K, V>(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
    update_height(&mut node);
    let bal = height(&node.left) - height(&node.right);

    if bal > 1 {
        // Left Right case
        if balance(&node.left) < 0 {
            node.left = node.left.take().map(rotate_left);
        }
        return rotate_right(node);
    }
    if bal < -1 {
        // Right Left case
        if balance(&node.right) > 0 {
            node.right = node.right.take().map(rotate_right);
        }
        return rotate_left(node);
    }
    node
}

fn upsert_node<K: Ord, V, M, U>(link: Link<K, V>, key: K, make: M, update: U) -> (Box<Node<K, V>>, bool)
where
    M: FnOnce() -> V,
    U: FnOnce(&mut V),
{
    let mut node = match link {
        None => return (Node::new(key, make()), true),
        Some(n) => n,
    };

    let inserted = match key.cmp(&node.key) {
        Ordering::Less => {
            let (child, inserted) = upsert_node(node.left.take(), key, make, update);
            node.left = Some(child);
            inserted
        }
        Ordering::Greater => {
            let (child, inserted) = upsert_node(node.right.take(), key, make, update);
            node.right = Some(child);
            inserted
        }
        Ordering::Equal => {
            update(&mut node.value);
            return (node, false);
        }
    };

    (rebalance(node), inserted)
}

fn delete_node<K: Ord, V>(link: Link<K, V>, key: &K) -> (Link<K, V>, Option<V>) {
    let mut node = match link {
        None => return (None, None),
        Some(n) => n,
    };

    match key.cmp(&node.key) {
        Ordering::Less => {
            let (child, removed) = delete_node(node.left.take(), key);
            node.left = child;
            (Some(rebalance(node)), removed)
        }
        Ordering::Greater => {
            let (child, removed) = delete_node(node.right.take(), key);
            node.right = child;
            (Some(rebalance(node)), removed)
        }
        Ordering::Equal => {
            let left = node.left.take();
            let right = node.right.take();
            let Node { value, .. } = *node;

            let replacement = match (left, right) {
                (None, None) => None,
                (Some(child), None) | (None, Some(child)) => Some(child),
                (Some(left), Some(right)) => {
                    // In-order successor (minimum of the right subtree) takes the slot
                    let (rest, mut successor) = take_min(right);
                    successor.left = Some(left);
                    successor.right = rest;
                    Some(rebalance(successor))
                }
            };
            (replacement, Some(value))
        }
    }
}

/// Detaches the minimum node of a subtree, rebalancing on the way back up.
fn take_min<K, V>(mut node: Box<Node<K, V>>) -> (Link<K, V>, Box<Node<K, V>>) {
    match node.left.take() {
        None => {
            let rest = node.right.take();
            (rest, node)
        }
        Some(left) => {
            let (rest, min) = take_min(left);
            node.left = rest;
            (Some(rebalance(node)), min)
        }
    }
}

fn walk<K, V, F: FnMut(&K, &V)>(link: &Link<K, V>, order: Traversal, visit: &mut F) {
    if let Some(node) = link {
        match order {
            Traversal::InOrder => {
                walk(&node.left, order, visit);
                visit(&node.key, &node.value);
                walk(&node.right, order, visit);
            }
            Traversal::PreOrder => {
                visit(&node.key, &node.value);
                walk(&node.left, order, visit);
                walk(&node.right, order, visit);
            }
        }
    }
}
