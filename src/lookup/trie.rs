// src/lookup/trie.rs

//! Prefix trie mapping repository-relative paths to their owner.

use std::collections::{BTreeMap, HashMap};

use crate::lookup::segments::{iterate_segments, SegmentEntry};

/// Default delimiter for serialized paths.
pub const DEFAULT_DELIMITER: char = '/';

/// A node of the trie. Each node reachable from the root stands for exactly
/// one normalized path prefix; child keys are single segments.
#[derive(Debug, Clone)]
pub struct PathTrieNode<T> {
    value: Option<T>,
    children: Option<HashMap<String, PathTrieNode<T>>>,
}

impl<T> PathTrieNode<T> {
    fn empty() -> Self {
        Self {
            value: None,
            children: None,
        }
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn child(&self, segment: &str) -> Option<&PathTrieNode<T>> {
        self.children.as_ref()?.get(segment)
    }
}

/// Result of a longest-prefix lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixMatch<'a, T> {
    /// Value registered at the matched prefix.
    pub value: &'a T,
    /// Byte index in the query just past the matched prefix.
    pub index: usize,
    /// The next shorter prefix that also carried a value.
    pub last_match: Option<Box<PrefixMatch<'a, T>>>,
}

/// Maps paths to the nearest registered ancestor in O(depth) per query,
/// independent of how many paths are registered.
#[derive(Debug, Clone)]
pub struct PathTrie<T> {
    root: PathTrieNode<T>,
    delimiter: char,
    size: usize,
}

impl<T> Default for PathTrie<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl<T> PathTrie<T> {
    pub fn new(delimiter: char) -> Self {
        Self {
            root: PathTrieNode::empty(),
            delimiter,
            size: 0,
        }
    }

    /// Build a trie from `(path, value)` pairs; later duplicates overwrite.
    pub fn from_entries<I, P>(entries: I, delimiter: char) -> Self
    where
        I: IntoIterator<Item = (P, T)>,
        P: AsRef<str>,
    {
        let mut trie = Self::new(delimiter);
        for (path, value) in entries {
            trie.insert(path.as_ref(), value);
        }
        trie
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Number of paths carrying a value.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn root(&self) -> &PathTrieNode<T> {
        &self.root
    }

    pub fn clear(&mut self) {
        self.root = PathTrieNode::empty();
        self.size = 0;
    }

    /// Register `value` as the owner of `path` and everything beneath it.
    ///
    /// Re-registering a path overwrites the previous value.
    pub fn insert(&mut self, path: &str, value: T) -> Option<T> {
        let delimiter = self.delimiter;
        self.insert_segments(iterate_segments(path, delimiter), value)
    }

    /// Register `value` at the node addressed by `segments`.
    pub fn insert_segments<'s, I>(&mut self, segments: I, value: T) -> Option<T>
    where
        I: IntoIterator<Item = &'s str>,
    {
        let mut node = &mut self.root;
        for segment in segments {
            node = node
                .children
                .get_or_insert_with(HashMap::new)
                .entry(segment.to_string())
                .or_insert_with(PathTrieNode::empty);
        }

        let previous = node.value.replace(value);
        if previous.is_none() {
            self.size += 1;
        }
        previous
    }

    /// Value of the deepest registered ancestor of `path` (or `path` itself).
    ///
    /// The walk stops at the first segment without a matching child, so the
    /// full path never needs to exist in the trie.
    pub fn find_nearest_owner(&self, path: &str) -> Option<&T> {
        self.find_nearest_owner_from_segments(iterate_segments(path, self.delimiter))
    }

    pub fn find_nearest_owner_from_segments<'s, I>(&self, segments: I) -> Option<&T>
    where
        I: IntoIterator<Item = &'s str>,
    {
        let mut node = &self.root;
        let mut best = node.value.as_ref();

        for segment in segments {
            let Some(child) = node.child(segment) else {
                break;
            };
            node = child;
            if node.value.is_some() {
                best = node.value.as_ref();
            }
            if node.children.is_none() {
                break;
            }
        }

        best
    }

    /// Like [`find_nearest_owner`](Self::find_nearest_owner), but also reports
    /// where in `path` the matched prefix ends and which shorter prefixes
    /// matched before it.
    pub fn find_longest_prefix_match(&self, path: &str) -> Option<PrefixMatch<'_, T>> {
        let mut node = &self.root;
        let mut best = node.value.as_ref().map(|value| PrefixMatch {
            value,
            index: 0,
            last_match: None,
        });

        for SegmentEntry { segment, end } in
            iterate_segments(path, self.delimiter).with_end_indices()
        {
            let Some(child) = node.child(segment) else {
                break;
            };
            node = child;
            if let Some(value) = node.value.as_ref() {
                best = Some(PrefixMatch {
                    value,
                    index: end,
                    last_match: best.map(Box::new),
                });
            }
            if node.children.is_none() {
                break;
            }
        }

        best
    }

    /// Exact lookup: the value registered at precisely `path`.
    pub fn get(&self, path: &str) -> Option<&T> {
        self.node_at(path)?.value.as_ref()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Clear the value registered at exactly `path`, keeping descendants.
    pub fn remove(&mut self, path: &str) -> Option<T> {
        let removed = self.node_at_mut(path)?.value.take();
        if removed.is_some() {
            self.size -= 1;
        }
        removed
    }

    /// Clear every value at or beneath `path`. Returns how many were removed.
    pub fn remove_subtree(&mut self, path: &str) -> usize {
        let Some(node) = self.node_at_mut(path) else {
            return 0;
        };

        let mut removed = 0;
        let mut stack = vec![&*node];
        while let Some(current) = stack.pop() {
            if current.value.is_some() {
                removed += 1;
            }
            if let Some(children) = current.children.as_ref() {
                stack.extend(children.values());
            }
        }
        node.value = None;
        node.children = None;

        self.size -= removed;
        removed
    }

    /// Every registered `(path, value)` pair, paths joined with the delimiter.
    pub fn entries(&self) -> Entries<'_, T> {
        Entries {
            stack: vec![(String::new(), &self.root)],
            delimiter: self.delimiter,
        }
    }

    fn node_at(&self, path: &str) -> Option<&PathTrieNode<T>> {
        let mut node = &self.root;
        for segment in iterate_segments(path, self.delimiter) {
            node = node.child(segment)?;
        }
        Some(node)
    }

    fn node_at_mut(&mut self, path: &str) -> Option<&mut PathTrieNode<T>> {
        let delimiter = self.delimiter;
        let mut node = &mut self.root;
        for segment in iterate_segments(path, delimiter) {
            node = node.children.as_mut()?.get_mut(segment)?;
        }
        Some(node)
    }
}

impl<T: Clone + Ord> PathTrie<T> {
    /// Bucket `paths` by their nearest owner; paths without an owner are
    /// dropped.
    pub fn group_by_owner<I, P>(&self, paths: I) -> BTreeMap<T, Vec<String>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let mut grouped: BTreeMap<T, Vec<String>> = BTreeMap::new();
        for path in paths {
            let path = path.as_ref();
            if let Some(owner) = self.find_nearest_owner(path) {
                grouped
                    .entry(owner.clone())
                    .or_default()
                    .push(path.to_string());
            }
        }
        grouped
    }
}

/// Iterator returned by [`PathTrie::entries`].
pub struct Entries<'a, T> {
    stack: Vec<(String, &'a PathTrieNode<T>)>,
    delimiter: char,
}

impl<'a, T> Iterator for Entries<'a, T> {
    type Item = (String, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((prefix, node)) = self.stack.pop() {
            if let Some(children) = node.children.as_ref() {
                for (segment, child) in children {
                    let path = if prefix.is_empty() {
                        segment.clone()
                    } else {
                        format!("{prefix}{}{segment}", self.delimiter)
                    };
                    self.stack.push((path, child));
                }
            }
            if let Some(value) = node.value.as_ref() {
                return Some((prefix, value));
            }
        }
        None
    }
}
