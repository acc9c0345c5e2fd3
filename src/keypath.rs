//! Key-path codec: converts between nested translation trees and flat maps.
//!
//! Nested segments are joined with the reserved [`SEPARATOR`] token, so
//! `{"auth": {"failed": "..."}}` flattens to `{"auth<~>failed": "..."}`.
//! Everything here is pure; no I/O.

use indexmap::IndexMap;
use serde::Serialize;

/// Reserved token joining nested key segments in a flat key.
pub const SEPARATOR: &str = "<~>";

/// Keys longer than this are reported by [`validate_structure`].
const MAX_KEY_LENGTH: usize = 255;

/// Flat translation map: path key -> string value, in insertion order.
pub type FlatMap = IndexMap<String, String>;

/// Nested translation mapping as stored on disk.
pub type Tree = IndexMap<String, Node>;

/// One value in a nested translation tree. Leaves are always strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Leaf(String),
    Branch(Tree),
}

impl Node {
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Node::Leaf(value) => Some(value),
            Node::Branch(_) => None,
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Node::Branch(_))
    }
}

/// A single key/value pair as shown to an editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationEntry {
    pub key: String,
    pub value: String,
}

impl TranslationEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Old and new value of a key present on both sides of a [`diff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueChange {
    pub old: String,
    pub new: String,
}

/// Key-level differences between two trees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyDiff {
    pub added: FlatMap,
    pub removed: FlatMap,
    pub modified: IndexMap<String, ValueChange>,
}

impl KeyDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Join a prefix and a segment with the separator (no separator for an empty prefix).
pub fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}{}{}", prefix, SEPARATOR, segment)
    }
}

fn segments(key: &str) -> Vec<&str> {
    key.split(SEPARATOR).collect()
}

/// Flatten a nested tree depth-first.
///
/// Empty branches produce no entry, so an empty group at a leaf position
/// does not survive a flatten/expand cycle.
pub fn flatten(tree: &Tree) -> FlatMap {
    let mut flat = FlatMap::new();
    flatten_into(tree, "", &mut flat);
    flat
}

fn flatten_into(tree: &Tree, prefix: &str, flat: &mut FlatMap) {
    for (segment, node) in tree {
        let key = join(prefix, segment);
        match node {
            Node::Branch(children) => flatten_into(children, &key, flat),
            Node::Leaf(value) => {
                flat.insert(key, value.clone());
            }
        }
    }
}

/// Expand a flat map back into a nested tree.
///
/// expand is not injective: when one key is a prefix of another
/// (`a` and `a<~>b`), whichever is applied last wins and the other is
/// silently clobbered.
pub fn expand(flat: &FlatMap) -> Tree {
    let mut tree = Tree::new();
    for (key, value) in flat {
        set(&mut tree, key, value.clone());
    }
    tree
}

/// Set a leaf at `key`, creating intermediate branches.
///
/// An intermediate segment that currently holds a leaf is replaced by a branch.
pub fn set(tree: &mut Tree, key: &str, value: impl Into<String>) {
    let parts = segments(key);
    let Some((last, parents)) = parts.split_last() else {
        return;
    };

    let mut current = tree;
    for segment in parents {
        let node = current
            .entry(segment.to_string())
            .or_insert_with(|| Node::Branch(Tree::new()));
        if let Node::Leaf(_) = node {
            *node = Node::Branch(Tree::new());
        }
        let Node::Branch(children) = node else {
            return;
        };
        current = children;
    }

    current.insert(last.to_string(), Node::Leaf(value.into()));
}

/// Look up the node addressed by `key`.
pub fn get<'a>(tree: &'a Tree, key: &str) -> Option<&'a Node> {
    let mut parts = key.split(SEPARATOR);
    let mut node = tree.get(parts.next()?)?;
    for segment in parts {
        match node {
            Node::Branch(children) => node = children.get(segment)?,
            Node::Leaf(_) => return None,
        }
    }
    Some(node)
}

/// Whether `key` addresses any node (leaf or branch).
pub fn has(tree: &Tree, key: &str) -> bool {
    get(tree, key).is_some()
}

/// Whether `key` addresses a string leaf.
pub fn has_leaf(tree: &Tree, key: &str) -> bool {
    matches!(get(tree, key), Some(Node::Leaf(_)))
}

/// Whether setting `key` would replace existing data: the path exists, or
/// one of its ancestors is a leaf that [`set`] would turn into a branch.
pub fn occupied(tree: &Tree, key: &str) -> bool {
    let mut current = tree;
    let parts = segments(key);
    for (index, segment) in parts.iter().enumerate() {
        match current.get(*segment) {
            None => return false,
            Some(Node::Leaf(_)) => return true,
            Some(Node::Branch(children)) => {
                if index == parts.len() - 1 {
                    return true;
                }
                current = children;
            }
        }
    }
    false
}

/// Flat-map counterpart of [`occupied`].
pub fn occupied_flat(flat: &FlatMap, key: &str) -> bool {
    if flat.contains_key(key) {
        return true;
    }

    let group_prefix = format!("{}{}", key, SEPARATOR);
    if flat.keys().any(|existing| existing.starts_with(&group_prefix)) {
        return true;
    }

    let parts = segments(key);
    (1..parts.len()).any(|len| flat.contains_key(&parts[..len].join(SEPARATOR)))
}

/// Remove the node at `key` without touching its ancestors.
///
/// Returns `true` when something was removed. Ancestors left empty stay in
/// the tree; see [`forget_and_prune`] for the pruning variant.
pub fn forget_leaf(tree: &mut Tree, key: &str) -> bool {
    let parts = segments(key);
    let Some((last, parents)) = parts.split_last() else {
        return false;
    };

    let mut current = tree;
    for segment in parents {
        match current.get_mut(*segment) {
            Some(Node::Branch(children)) => current = children,
            _ => return false,
        }
    }
    current.shift_remove(*last).is_some()
}

/// Remove the node at `key`, then remove every ancestor left empty.
pub fn forget_and_prune(tree: &mut Tree, key: &str) -> bool {
    prune_path(tree, &segments(key))
}

fn prune_path(tree: &mut Tree, path: &[&str]) -> bool {
    match path {
        [] => false,
        [last] => tree.shift_remove(*last).is_some(),
        [head, rest @ ..] => {
            let Some(Node::Branch(children)) = tree.get_mut(*head) else {
                return false;
            };
            let removed = prune_path(children, rest);
            if removed && children.is_empty() {
                tree.shift_remove(*head);
            }
            removed
        }
    }
}

/// Every path in the tree, branches included, in depth-first order.
pub fn all_keys(tree: &Tree) -> Vec<String> {
    let mut keys = Vec::new();
    collect_keys(tree, "", &mut keys);
    keys
}

fn collect_keys(tree: &Tree, prefix: &str, keys: &mut Vec<String>) {
    for (segment, node) in tree {
        let key = join(prefix, segment);
        keys.push(key.clone());
        if let Node::Branch(children) = node {
            collect_keys(children, &key, keys);
        }
    }
}

/// Nesting depth: 0 for a tree of leaves only.
pub fn depth(tree: &Tree) -> usize {
    tree.values()
        .filter_map(|node| match node {
            Node::Branch(children) => Some(depth(children) + 1),
            Node::Leaf(_) => None,
        })
        .max()
        .unwrap_or(0)
}

/// Compare two trees key by key.
pub fn diff(old: &Tree, new: &Tree) -> KeyDiff {
    let old_flat = flatten(old);
    let new_flat = flatten(new);
    let mut result = KeyDiff::default();

    for (key, value) in &new_flat {
        match old_flat.get(key) {
            None => {
                result.added.insert(key.clone(), value.clone());
            }
            Some(previous) if previous != value => {
                result.modified.insert(
                    key.clone(),
                    ValueChange {
                        old: previous.clone(),
                        new: value.clone(),
                    },
                );
            }
            Some(_) => {}
        }
    }

    for (key, value) in &old_flat {
        if !new_flat.contains_key(key) {
            result.removed.insert(key.clone(), value.clone());
        }
    }

    result
}

/// Paths whose text contains `needle`.
pub fn search_keys(tree: &Tree, needle: &str, case_sensitive: bool) -> Vec<String> {
    let needle = if case_sensitive {
        needle.to_string()
    } else {
        needle.to_lowercase()
    };

    all_keys(tree)
        .into_iter()
        .filter(|key| {
            if case_sensitive {
                key.contains(&needle)
            } else {
                key.to_lowercase().contains(&needle)
            }
        })
        .collect()
}

/// Paths of literal segments that contain the reserved separator.
///
/// Such segments cannot survive a flatten/expand cycle unchanged.
pub fn reserved_segments(tree: &Tree) -> Vec<String> {
    let mut found = Vec::new();
    collect_reserved(tree, "", &mut found);
    found
}

fn collect_reserved(tree: &Tree, prefix: &str, found: &mut Vec<String>) {
    for (segment, node) in tree {
        let key = join(prefix, segment);
        if segment.contains(SEPARATOR) {
            found.push(key.clone());
        }
        if let Node::Branch(children) = node {
            collect_reserved(children, &key, found);
        }
    }
}

/// Structural problems that make a tree a poor translation file.
pub fn validate_structure(tree: &Tree) -> Vec<String> {
    let mut errors = Vec::new();

    for key in flatten(tree).keys() {
        if key.is_empty() {
            errors.push("Empty key found".to_string());
        }
        if !key.contains(SEPARATOR) && key.parse::<i64>().is_ok() {
            errors.push(format!("Numeric key found at root level: {}", key));
        }
        if key.len() > MAX_KEY_LENGTH {
            errors.push(format!("Key too long (>{} chars): {}", MAX_KEY_LENGTH, key));
        }
    }

    for key in reserved_segments(tree) {
        errors.push(format!("Key segment contains reserved token {}: {}", SEPARATOR, key));
    }

    errors
}
